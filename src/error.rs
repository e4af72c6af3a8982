//! Error types for squishfile
//!
//! This module provides the error handling for the library, including:
//! - Per-record failure types (upload, compression) that end up attached to records
//! - Registry errors raised when a mutation would break a record invariant
//! - Machine-readable error codes for UI integration

use crate::types::{FileId, Status};
use thiserror::Error;

/// Result type alias for squishfile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for squishfile
///
/// Each variant includes the context needed to tell the user (or a log reader)
/// which record or setting was involved.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "progress.ceiling")
        key: Option<String>,
    },

    /// Upload collaborator failed for a single file
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Compress collaborator failed for a single file
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// A registry mutation was rejected
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Download or bundle retrieval failed
    #[error("download error: {0}")]
    Download(String),

    /// Download requested while at least one record is still compressing
    #[error("cannot download while {compressing} file(s) are still compressing")]
    NotSettled {
        /// Number of records still in the compressing state
        compressing: usize,
    },

    /// Operation requires a finished (done) record
    #[error("file {id} is {status}, not done")]
    NotDone {
        /// The record that was targeted
        id: FileId,
        /// Its current status
        status: Status,
    },

    /// The session that issued an operation was reset before it completed
    #[error("session was reset before the operation completed")]
    SessionReset,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid service URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Upload collaborator failures
#[derive(Debug, Error)]
pub enum UploadError {
    /// The service answered with a non-success status
    #[error("{message}")]
    Rejected {
        /// HTTP status returned by the service
        status: u16,
        /// Detail text reported by the service
        message: String,
    },

    /// The response body could not be understood
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Compress collaborator failures
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The service answered with a non-success status
    #[error("{message}")]
    Rejected {
        /// HTTP status returned by the service
        status: u16,
        /// Detail text reported by the service
        message: String,
    },

    /// The service reported a result for a different file
    #[error("compress response was for {actual}, expected {expected}")]
    MismatchedFile {
        /// The file the request was issued for
        expected: FileId,
        /// The file the response names
        actual: FileId,
    },

    /// The target size is unusable (zero)
    #[error("target size must be at least 1 KB")]
    InvalidTarget,
}

/// Entry registry errors
///
/// These indicate the caller tried to mutate a record in a way the state machine
/// forbids. In correct operation only `NotFound` (record removed by the user while
/// its upload was in flight) is expected to occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A record with this identity already exists
    #[error("file {0} is already tracked")]
    DuplicateId(FileId),

    /// No record has this identity
    #[error("file {0} is not tracked")]
    NotFound(FileId),

    /// Status change not on the pipeline graph
    #[error("file {id} cannot move from {from} to {to}")]
    IllegalTransition {
        /// The record being updated
        id: FileId,
        /// Current status
        from: Status,
        /// Requested status
        to: Status,
    },

    /// Progress would move backwards while compressing
    #[error("progress for file {id} cannot go from {current} to {requested}")]
    ProgressRegression {
        /// The record being updated
        id: FileId,
        /// Current progress
        current: u8,
        /// Requested progress
        requested: u8,
    },

    /// Progress outside 0..=100
    #[error("progress {0} is out of range")]
    ProgressOutOfRange(u8),

    /// compressed_size must be set exactly when the record is done
    #[error("file {id}: compressed size must be present iff status is done (status {status})")]
    CompressedSizeMismatch {
        /// The record being updated
        id: FileId,
        /// Status the record would end up in
        status: Status,
    },

    /// Only uploading or queued records may be removed
    #[error("file {id} is {status} and cannot be removed")]
    NotRemovable {
        /// The record that was targeted
        id: FileId,
        /// Its current status
        status: Status,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Upload(e) => match e {
                UploadError::Rejected { .. } => "upload_rejected",
                UploadError::InvalidResponse(_) => "upload_invalid_response",
            },
            Error::Compression(e) => match e {
                CompressionError::Rejected { .. } => "compression_rejected",
                CompressionError::MismatchedFile { .. } => "compression_mismatched_file",
                CompressionError::InvalidTarget => "invalid_target",
            },
            Error::Registry(e) => match e {
                RegistryError::DuplicateId(_) => "duplicate_id",
                RegistryError::NotFound(_) => "file_not_found",
                RegistryError::IllegalTransition { .. } => "illegal_transition",
                RegistryError::ProgressRegression { .. } => "progress_regression",
                RegistryError::ProgressOutOfRange(_) => "progress_out_of_range",
                RegistryError::CompressedSizeMismatch { .. } => "compressed_size_mismatch",
                RegistryError::NotRemovable { .. } => "not_removable",
            },
            Error::Download(_) => "download_error",
            Error::NotSettled { .. } => "not_settled",
            Error::NotDone { .. } => "not_done",
            Error::SessionReset => "session_reset",
            Error::Network(_) => "network_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }

    /// Message shown next to a failed record
    ///
    /// Collaborator rejections carry the service's own detail text, which is shown
    /// verbatim. Everything else uses the full Display output.
    pub fn user_message(&self) -> String {
        match self {
            Error::Upload(UploadError::Rejected { message, .. })
            | Error::Compression(CompressionError::Rejected { message, .. }) => message.clone(),
            Error::Registry(RegistryError::DuplicateId(id)) => {
                format!("Service returned file id {id}, which is already in use")
            }
            other => other.to_string(),
        }
    }

    /// True for registry errors that can only come from a caller bug
    pub(crate) fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::Registry(
                RegistryError::DuplicateId(_)
                    | RegistryError::IllegalTransition { .. }
                    | RegistryError::ProgressRegression { .. }
                    | RegistryError::ProgressOutOfRange(_)
                    | RegistryError::CompressedSizeMismatch { .. }
            )
        )
    }
}
