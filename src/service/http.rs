//! HTTP implementation of [`CompressionService`]

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use super::CompressionService;
use crate::config::ServiceConfig;
use crate::error::{CompressionError, Error, Result, UploadError};
use crate::types::{CompressOutcome, FileId, FileInput, HealthStatus, UploadedFile};

/// Compression service reached over HTTP
///
/// Routes, relative to the configured base URL:
///
/// | Operation | Route |
/// |---|---|
/// | upload | `POST api/upload` (multipart field `file`) |
/// | compress | `POST api/compress` (JSON) |
/// | download | `GET api/download/{id}` |
/// | bundle | `GET api/download-all?ids=a,b` |
/// | health | `GET api/health` |
#[derive(Clone, Debug)]
pub struct HttpCompressionService {
    client: Client,
    base: Url,
}

#[derive(Serialize)]
struct CompressRequest<'a> {
    file_id: &'a FileId,
    target_size_kb: u64,
}

/// Error body returned by the service on non-2xx responses
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl HttpCompressionService {
    /// Build a client for the configured service
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client cannot be
    /// constructed.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let base = Url::parse(config.base_url.trim())?;
        if base.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("{} cannot be used as a base URL", config.base_url),
                key: Some("base_url".to_string()),
            });
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, base })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Query the service health endpoint
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoint(&["api", "health"])?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let (status, message) = rejection(response, "Health check failed").await;
            return Err(Error::Other(format!("{message} (status {status})")));
        }
        Ok(response.json().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Other(format!("{} cannot be used as a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_bytes(&self, url: Url) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let (status, message) = rejection(response, "Download failed").await;
            return Err(Error::Download(format!("{message} (status {status})")));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull the status and the `detail` text out of a failed response
async fn rejection(response: Response, fallback: &str) -> (u16, String) {
    let status = response.status().as_u16();
    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .filter(|d| !d.trim().is_empty());
    (status, detail.unwrap_or_else(|| fallback.to_string()))
}

#[async_trait]
impl CompressionService for HttpCompressionService {
    async fn upload(&self, input: &FileInput) -> Result<UploadedFile> {
        let url = self.endpoint(&["api", "upload"])?;
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(input.data.clone()).file_name(input.filename.clone()),
        );

        let response = self.client.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            let (status, message) = rejection(response, "Upload failed").await;
            return Err(UploadError::Rejected { status, message }.into());
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()).into())
    }

    async fn compress(&self, id: &FileId, target_kb: u64) -> Result<CompressOutcome> {
        let url = self.endpoint(&["api", "compress"])?;
        let response = self
            .client
            .post(url)
            .json(&CompressRequest {
                file_id: id,
                target_size_kb: target_kb,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = rejection(response, "Compression failed").await;
            return Err(CompressionError::Rejected { status, message }.into());
        }

        let outcome: CompressOutcome = response.json().await?;
        if &outcome.file_id != id {
            return Err(CompressionError::MismatchedFile {
                expected: id.clone(),
                actual: outcome.file_id,
            }
            .into());
        }
        Ok(outcome)
    }

    async fn download(&self, id: &FileId) -> Result<Vec<u8>> {
        self.fetch_bytes(self.download_url(id)?).await
    }

    async fn download_bundle(&self, ids: &[FileId]) -> Result<Vec<u8>> {
        self.fetch_bytes(self.bundle_url(ids)?).await
    }

    fn download_url(&self, id: &FileId) -> Result<Url> {
        self.endpoint(&["api", "download", id.as_str()])
    }

    fn bundle_url(&self, ids: &[FileId]) -> Result<Url> {
        let mut url = self.endpoint(&["api", "download-all"])?;
        let joined = ids.iter().map(FileId::as_str).collect::<Vec<_>>().join(",");
        url.query_pairs_mut().append_pair("ids", &joined);
        Ok(url)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
