//! Core types for squishfile

use serde::{Deserialize, Serialize};

/// Identity of a tracked file
///
/// Starts out as a client-generated provisional token and is replaced by the
/// server-issued identity once the upload succeeds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    /// Create a new FileId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a client-generated provisional identity
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(crate::utils::PROVISIONAL_PREFIX)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad media category, decides which compressor the service uses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Raster or vector image
    #[default]
    Image,
    /// PDF document
    Pdf,
    /// Video container
    Video,
    /// Audio file
    Audio,
}

impl FileCategory {
    /// Category for a MIME type, if it is one the service handles
    pub fn from_mime(mime: &str) -> Option<Self> {
        let (top, sub) = mime.split_once('/')?;
        match (top, sub) {
            ("image", _) => Some(FileCategory::Image),
            ("application", "pdf") => Some(FileCategory::Pdf),
            ("video", _) => Some(FileCategory::Video),
            ("audio", _) => Some(FileCategory::Audio),
            _ => None,
        }
    }
}

/// Record status
///
/// Only the following transitions exist:
///
/// ```text
/// Uploading -> Queued -> Compressing -> Done
///     |                       |
///     +-----> Error <---------+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Upload in flight
    Uploading,
    /// Uploaded, waiting for the orchestrator
    Queued,
    /// Compress request in flight
    Compressing,
    /// Compressed successfully (terminal)
    Done,
    /// Upload or compression failed (terminal)
    Error,
}

impl Status {
    /// Lowercase name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Uploading => "uploading",
            Status::Queued => "queued",
            Status::Compressing => "compressing",
            Status::Done => "done",
            Status::Error => "error",
        }
    }

    /// Whether `self -> next` is an edge of the pipeline graph
    pub fn can_transition_to(&self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Uploading, Status::Queued)
                | (Status::Uploading, Status::Error)
                | (Status::Queued, Status::Compressing)
                | (Status::Compressing, Status::Done)
                | (Status::Compressing, Status::Error)
        )
    }

    /// Done or Error
    pub fn is_terminal(&self) -> bool {
        match self {
            Status::Done | Status::Error => true,
            Status::Uploading | Status::Queued | Status::Compressing => false,
        }
    }

    /// Not yet handed to the orchestrator (Uploading or Queued)
    pub fn is_pending(&self) -> bool {
        match self {
            Status::Uploading | Status::Queued => true,
            Status::Compressing | Status::Done | Status::Error => false,
        }
    }

    /// Whether the user may remove a record in this status
    pub fn is_removable(&self) -> bool {
        self.is_pending()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked file moving through the pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Provisional or server-issued identity
    pub id: FileId,
    /// Name of the file as submitted
    pub original_filename: String,
    /// MIME type (guessed until the upload reports it)
    pub mime: String,
    /// Media category
    pub category: FileCategory,
    /// Original size in bytes
    pub size: u64,
    /// Pixel width (images and video, after upload)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height (images and video, after upload)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Duration in seconds (audio and video, after upload)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Pipeline status
    pub status: Status,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Compressed size in bytes, present iff status is Done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
    /// Error cause or advisory note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileRecord {
    /// New record in the Uploading state for a submitted input
    pub fn uploading(id: FileId, input: &FileInput) -> Self {
        let mime = crate::utils::guess_mime(&input.filename);
        Self {
            id,
            original_filename: input.filename.clone(),
            // placeholder until the upload response reports the real category
            category: FileCategory::from_mime(mime).unwrap_or_default(),
            mime: mime.to_string(),
            size: input.data.len() as u64,
            width: None,
            height: None,
            duration: None,
            status: Status::Uploading,
            progress: 0,
            compressed_size: None,
            message: None,
        }
    }

    /// Whether the original already fits in `target_kb`
    pub fn is_under_target(&self, target_kb: u64) -> bool {
        self.size <= target_kb.saturating_mul(1024)
    }

    /// Size to count towards the compressed total
    pub fn effective_size(&self) -> u64 {
        match (self.status, self.compressed_size) {
            (Status::Done, Some(size)) => size,
            _ => self.size,
        }
    }
}

/// A raw file submitted for processing
#[derive(Clone, Debug)]
pub struct FileInput {
    /// Original filename
    pub filename: String,
    /// File contents
    pub data: Vec<u8>,
}

impl FileInput {
    /// Create an input from a name and bytes
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Read an input from disk, using the file name as the original filename
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self { filename, data })
    }
}

/// Upload collaborator response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Server-issued identity
    pub id: FileId,
    /// Detected MIME type
    pub mime: String,
    /// Detected category
    pub category: FileCategory,
    /// Size in bytes as stored by the service
    pub size: u64,
    /// Pixel width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl UploadedFile {
    /// Size rounded up to whole kilobytes
    pub fn size_kb(&self) -> u64 {
        self.size.div_ceil(1024)
    }
}

/// Compress collaborator response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressOutcome {
    /// The file that was compressed
    pub file_id: FileId,
    /// Size before compression in bytes
    pub original_size: u64,
    /// Size after compression in bytes
    pub compressed_size: u64,
    /// The input was already within target and left unchanged
    #[serde(default)]
    pub skipped: bool,
    /// Advisory note from the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Service health report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "ok" when healthy
    pub status: String,
    /// Service version
    pub version: String,
}

/// Shortcut for choosing a target size
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetPreset {
    /// Fraction of the largest observed file
    Fraction(f64),
    /// Fixed size in kilobytes
    Fixed(u64),
}

impl TargetPreset {
    /// The preset buttons offered next to the target slider
    pub const DEFAULTS: [TargetPreset; 5] = [
        TargetPreset::Fraction(0.5),
        TargetPreset::Fraction(0.25),
        TargetPreset::Fixed(1024),
        TargetPreset::Fixed(500),
        TargetPreset::Fixed(200),
    ];

    /// Short label for display ("50%", "1 MB", "500 KB")
    pub fn label(&self) -> String {
        match self {
            TargetPreset::Fraction(f) => format!("{}%", (f * 100.0).round() as u64),
            TargetPreset::Fixed(kb) if kb % 1024 == 0 => format!("{} MB", kb / 1024),
            TargetPreset::Fixed(kb) => format!("{kb} KB"),
        }
    }

    /// Unclamped target in kilobytes for a given observed maximum
    pub fn resolve(&self, max_kb: u64) -> u64 {
        match self {
            TargetPreset::Fraction(f) => (max_kb as f64 * f).round() as u64,
            TargetPreset::Fixed(kb) => *kb,
        }
    }
}

/// Event emitted during the pipeline lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A file was submitted and is uploading
    Added {
        /// Provisional identity
        id: FileId,
        /// Original filename
        filename: String,
    },

    /// Upload finished and the record was rebound to the server identity
    Uploaded {
        /// Provisional identity the record had while uploading
        provisional_id: FileId,
        /// Server-issued identity
        id: FileId,
        /// Size in bytes as reported by the service
        size: u64,
    },

    /// Upload failed
    UploadFailed {
        /// Provisional identity
        id: FileId,
        /// Error message
        error: String,
    },

    /// Record removed by the user
    Removed {
        /// Identity of the removed record
        id: FileId,
    },

    /// Compression started for a record
    Compressing {
        /// Record identity
        id: FileId,
        /// Target size in kilobytes
        target_kb: u64,
    },

    /// Synthetic progress update
    Progress {
        /// Record identity
        id: FileId,
        /// Progress percentage
        percent: u8,
    },

    /// Compression finished
    Compressed {
        /// Record identity
        id: FileId,
        /// Size before compression
        original_size: u64,
        /// Size after compression
        compressed_size: u64,
        /// Input was already within target
        skipped: bool,
        /// Advisory message
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Compression failed
    CompressFailed {
        /// Record identity
        id: FileId,
        /// Error message
        error: String,
    },

    /// An orchestration run drained the queue
    BatchComplete {
        /// Records that reached Done in this run
        done: usize,
        /// Records that reached Error in this run
        failed: usize,
    },

    /// Target size changed
    TargetChanged {
        /// New target in kilobytes
        target_kb: u64,
    },

    /// The session was cleared
    SessionReset {
        /// Generation number of the new session
        generation: u64,
    },
}
