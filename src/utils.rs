//! Utility functions for identities, sizes, and result paths

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::{Path, PathBuf};

use crate::types::FileId;

/// Prefix of client-generated identities
pub const PROVISIONAL_PREFIX: &str = "temp-";

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Generate a provisional identity for a record whose upload has not finished
///
/// Format: `temp-<unix millis>-<8 random lowercase alphanumerics>`.
pub fn provisional_id() -> FileId {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    FileId(format!(
        "{PROVISIONAL_PREFIX}{}-{suffix}",
        chrono::Utc::now().timestamp_millis()
    ))
}

/// Guess a MIME type from a filename extension
///
/// Only used to give an uploading record something sensible to show; the upload
/// response carries the detected type.
pub fn guess_mime(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Format a byte count for display: `512 B`, `1.5 KB`, `2.0 MB`
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Format a signed byte delta, keeping the sign for growth
pub fn format_signed_size(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_size(bytes.unsigned_abs()))
    } else {
        format_size(bytes as u64)
    }
}

/// Reduce a user-supplied filename to its final component
///
/// Filenames come from the submitted inputs and must not be able to escape the
/// output directory.
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => "file".to_string(),
        other => other.to_string(),
    }
}

/// Get a path that does not exist yet, adding ` (n)` before the extension
///
/// # Examples
///
/// ```
/// use squishfile::utils::unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/squishfile-doc-missing/photo.jpg");
/// assert_eq!(unique_path(path).unwrap(), path);
/// ```
pub fn unique_path(path: &Path) -> crate::Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| crate::Error::Other(format!("invalid file name: {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let name = match extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(crate::Error::Other(format!(
        "could not find a free name for {} after {MAX_RENAME_ATTEMPTS} attempts",
        path.display()
    )))
}
