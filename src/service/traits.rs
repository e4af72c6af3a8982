//! Collaborator trait for the remote compression service

use async_trait::async_trait;
use url::Url;

use crate::types::{CompressOutcome, FileId, FileInput, UploadedFile};

/// The remote side of the pipeline
///
/// Upload, compress, and retrieval are all performed by one service. The pipeline
/// invokes each method at most once per logical request and never retries.
///
/// # Examples
///
/// ```no_run
/// use squishfile::service::{CompressionService, HttpCompressionService};
/// use squishfile::{Config, FileInput};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = HttpCompressionService::new(&Config::default().service)?;
///
/// let uploaded = service.upload(&FileInput::from_path("photo.jpg").await?).await?;
/// let outcome = service.compress(&uploaded.id, 200).await?;
/// println!("{} -> {} bytes", outcome.original_size, outcome.compressed_size);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CompressionService: Send + Sync {
    /// Store a file on the service and report what it detected
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`](crate::error::UploadError) when the service rejects
    /// the file, or a transport error.
    async fn upload(&self, input: &FileInput) -> crate::Result<UploadedFile>;

    /// Compress a stored file toward `target_kb` kilobytes
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError`](crate::error::CompressionError) when the service
    /// rejects the request, or a transport error.
    async fn compress(&self, id: &FileId, target_kb: u64) -> crate::Result<CompressOutcome>;

    /// Fetch the compressed bytes of one file
    async fn download(&self, id: &FileId) -> crate::Result<Vec<u8>>;

    /// Fetch an archive holding the compressed bytes of several files
    async fn download_bundle(&self, ids: &[FileId]) -> crate::Result<Vec<u8>>;

    /// Stable address of a single result
    fn download_url(&self, id: &FileId) -> crate::Result<Url>;

    /// Stable address of a bundle of results
    fn bundle_url(&self, ids: &[FileId]) -> crate::Result<Url>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
