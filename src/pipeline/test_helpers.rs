//! Shared test helpers: an in-memory compression service and pipeline builders.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::Config;
use crate::error::{CompressionError, Error, Result, UploadError};
use crate::pipeline::Pipeline;
use crate::service::CompressionService;
use crate::types::{
    CompressOutcome, FileCategory, FileId, FileInput, FileRecord, Status, UploadedFile,
};
use crate::utils::guess_mime;

pub(crate) const ALREADY_SMALLER: &str = "File is already smaller than target!";

struct Stored {
    filename: String,
    size: u64,
}

/// In-memory stand-in for the remote service
///
/// Compression "succeeds" by reporting `min(size, target)`; files already within
/// target come back skipped with an advisory, like the real service.
#[derive(Default)]
pub(crate) struct MockService {
    fail_uploads: HashSet<String>,
    fail_compress: HashSet<String>,
    upload_delays: HashMap<String, Duration>,
    upload_ids: HashMap<String, FileId>,
    compress_delay: Duration,

    next_id: AtomicUsize,
    stored: Mutex<HashMap<FileId, Stored>>,
    compress_calls: Mutex<Vec<(FileId, u64)>>,
    download_calls: Mutex<Vec<FileId>>,
    bundle_calls: Mutex<Vec<Vec<FileId>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reject the upload of files with this name
    pub(crate) fn fail_upload(mut self, filename: &str) -> Self {
        self.fail_uploads.insert(filename.to_string());
        self
    }

    /// Reject compression of files with this name
    pub(crate) fn fail_compress(mut self, filename: &str) -> Self {
        self.fail_compress.insert(filename.to_string());
        self
    }

    /// Delay the upload of files with this name
    pub(crate) fn upload_delay(mut self, filename: &str, delay: Duration) -> Self {
        self.upload_delays.insert(filename.to_string(), delay);
        self
    }

    /// Answer the upload of files with this name with a fixed identity
    pub(crate) fn upload_id(mut self, filename: &str, id: &str) -> Self {
        self.upload_ids.insert(filename.to_string(), FileId::from(id));
        self
    }

    /// Delay every compress call
    pub(crate) fn compress_delay(mut self, delay: Duration) -> Self {
        self.compress_delay = delay;
        self
    }

    /// Compress calls in the order they were issued
    pub(crate) fn compress_calls(&self) -> Vec<(FileId, u64)> {
        self.compress_calls.lock().unwrap().clone()
    }

    /// Names of the files compress was called for, in order
    pub(crate) fn compressed_filenames(&self) -> Vec<String> {
        let stored = self.stored.lock().unwrap();
        self.compress_calls()
            .iter()
            .map(|(id, _)| stored.get(id).map(|s| s.filename.clone()).unwrap_or_default())
            .collect()
    }

    pub(crate) fn download_calls(&self) -> Vec<FileId> {
        self.download_calls.lock().unwrap().clone()
    }

    pub(crate) fn bundle_calls(&self) -> Vec<Vec<FileId>> {
        self.bundle_calls.lock().unwrap().clone()
    }

    /// Highest number of compress calls observed in flight at once
    pub(crate) fn max_concurrent_compress(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompressionService for MockService {
    async fn upload(&self, input: &FileInput) -> Result<UploadedFile> {
        if let Some(delay) = self.upload_delays.get(&input.filename) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_uploads.contains(&input.filename) {
            return Err(UploadError::Rejected {
                status: 400,
                message: format!("Unsupported file type: {}", guess_mime(&input.filename)),
            }
            .into());
        }

        let id = match self.upload_ids.get(&input.filename) {
            Some(id) => id.clone(),
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                FileId(format!("srv{n:04}"))
            }
        };
        let mime = guess_mime(&input.filename);
        let size = input.data.len() as u64;
        self.stored.lock().unwrap().insert(
            id.clone(),
            Stored {
                filename: input.filename.clone(),
                size,
            },
        );

        Ok(UploadedFile {
            id,
            mime: mime.to_string(),
            category: FileCategory::from_mime(mime).unwrap_or_default(),
            size,
            width: Some(640),
            height: Some(480),
            duration: None,
        })
    }

    async fn compress(&self, id: &FileId, target_kb: u64) -> Result<CompressOutcome> {
        self.compress_calls
            .lock()
            .unwrap()
            .push((id.clone(), target_kb));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.compress_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (filename, size) = match self.stored.lock().unwrap().get(id) {
            Some(s) => (s.filename.clone(), s.size),
            None => {
                return Err(CompressionError::Rejected {
                    status: 404,
                    message: "File not found".into(),
                }
                .into());
            }
        };
        if self.fail_compress.contains(&filename) {
            return Err(CompressionError::Rejected {
                status: 500,
                message: format!("encoder crashed on {filename}"),
            }
            .into());
        }

        let target = target_kb * 1024;
        if size <= target {
            return Ok(CompressOutcome {
                file_id: id.clone(),
                original_size: size,
                compressed_size: size,
                skipped: true,
                message: Some(ALREADY_SMALLER.into()),
            });
        }
        Ok(CompressOutcome {
            file_id: id.clone(),
            original_size: size,
            compressed_size: target,
            skipped: false,
            message: None,
        })
    }

    async fn download(&self, id: &FileId) -> Result<Vec<u8>> {
        self.download_calls.lock().unwrap().push(id.clone());
        if !self.stored.lock().unwrap().contains_key(id) {
            return Err(Error::Download("File not found".into()));
        }
        Ok(format!("compressed:{id}").into_bytes())
    }

    async fn download_bundle(&self, ids: &[FileId]) -> Result<Vec<u8>> {
        self.bundle_calls.lock().unwrap().push(ids.to_vec());
        Ok(b"PK\x03\x04bundle".to_vec())
    }

    fn download_url(&self, id: &FileId) -> Result<Url> {
        Ok(Url::parse("http://mock.local/api/download/")?.join(id.as_str())?)
    }

    fn bundle_url(&self, ids: &[FileId]) -> Result<Url> {
        let joined = ids.iter().map(FileId::as_str).collect::<Vec<_>>().join(",");
        Ok(Url::parse(&format!(
            "http://mock.local/api/download-all?ids={joined}"
        ))?)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Pipeline over a mock service; the mock is returned for call inspection
pub(crate) fn create_test_pipeline(service: MockService) -> (Pipeline, Arc<MockService>) {
    create_test_pipeline_with(Config::default(), service)
}

pub(crate) fn create_test_pipeline_with(
    config: Config,
    service: MockService,
) -> (Pipeline, Arc<MockService>) {
    let service = Arc::new(service);
    let pipeline = Pipeline::new(config, service.clone()).unwrap();
    (pipeline, service)
}

/// Input of `kb` kilobytes
pub(crate) fn input(name: &str, kb: usize) -> FileInput {
    FileInput::new(name, vec![0u8; kb * 1024])
}

/// Add inputs and wait for every upload to settle
pub(crate) async fn ingest(pipeline: &Pipeline, inputs: Vec<FileInput>) {
    pipeline.add_files(inputs).await.unwrap().wait().await;
}

/// The record with this original filename
pub(crate) async fn record_named(pipeline: &Pipeline, name: &str) -> FileRecord {
    pipeline
        .snapshot()
        .await
        .into_iter()
        .find(|r| r.original_filename == name)
        .unwrap_or_else(|| panic!("no record named {name}"))
}

/// Statuses of all records in registry order
pub(crate) async fn statuses(pipeline: &Pipeline) -> Vec<Status> {
    pipeline.snapshot().await.iter().map(|r| r.status).collect()
}
