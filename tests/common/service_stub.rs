//! In-process stand-in for the compression service's HTTP API

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Advisory the service attaches to files already within target
pub const ALREADY_SMALLER: &str = "File is already smaller than target!";

/// One file the stub knows how to accept
#[derive(Clone, Debug)]
pub struct StubFile {
    /// Filename the upload is recognized by
    pub filename: String,
    /// Identity the stub hands out
    pub id: String,
    /// Size in bytes
    pub size: u64,
    /// Reject the upload with this detail
    pub upload_error: Option<String>,
    /// Reject compression with this detail
    pub compress_error: Option<String>,
}

impl StubFile {
    pub fn new(filename: &str, id: &str, kb: u64) -> Self {
        Self {
            filename: filename.to_string(),
            id: id.to_string(),
            size: kb * 1024,
            upload_error: None,
            compress_error: None,
        }
    }

    pub fn failing_upload(mut self, detail: &str) -> Self {
        self.upload_error = Some(detail.to_string());
        self
    }

    pub fn failing_compress(mut self, detail: &str) -> Self {
        self.compress_error = Some(detail.to_string());
        self
    }
}

struct Files {
    by_name: HashMap<String, StubFile>,
    by_id: HashMap<String, StubFile>,
}

struct UploadResponder(Arc<Files>);

impl Respond for UploadResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = String::from_utf8_lossy(&request.body);
        let filename = body
            .split("filename=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap_or_default();

        let Some(file) = self.0.by_name.get(filename) else {
            return ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": format!("Unknown file: {filename}") }));
        };
        if let Some(detail) = &file.upload_error {
            return ResponseTemplate::new(400).set_body_json(json!({ "detail": detail }));
        }

        ResponseTemplate::new(200).set_body_json(json!({
            "id": file.id,
            "mime": "image/jpeg",
            "category": "image",
            "size": file.size,
            "width": 1920,
            "height": 1080,
            "extension": ".jpg",
            "original_filename": file.filename,
        }))
    }
}

struct CompressResponder {
    files: Arc<Files>,
    delay: Duration,
}

impl Respond for CompressResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<serde_json::Value>(&request.body) else {
            return ResponseTemplate::new(422);
        };
        let file_id = body["file_id"].as_str().unwrap_or_default();
        let target = body["target_size_kb"].as_u64().unwrap_or_default() * 1024;

        let Some(file) = self.files.by_id.get(file_id) else {
            return ResponseTemplate::new(404).set_body_json(json!({ "detail": "File not found" }));
        };
        if let Some(detail) = &file.compress_error {
            return ResponseTemplate::new(500)
                .set_body_json(json!({ "detail": detail }))
                .set_delay(self.delay);
        }

        let (compressed, skipped, message) = if file.size <= target {
            (file.size, true, Some(ALREADY_SMALLER))
        } else {
            (target, false, None)
        };
        ResponseTemplate::new(200)
            .set_body_json(json!({
                "file_id": file_id,
                "original_size": file.size,
                "compressed_size": compressed,
                "skipped": skipped,
                "message": message,
            }))
            .set_delay(self.delay)
    }
}

/// Stub service serving upload, compress, download, bundle, and health
pub struct ServiceStub {
    pub server: MockServer,
}

impl ServiceStub {
    /// Start a stub that answers compress requests immediately
    pub async fn start(files: Vec<StubFile>) -> Self {
        Self::start_with_delay(files, Duration::ZERO).await
    }

    /// Start a stub whose compress responses take `delay`
    pub async fn start_with_delay(files: Vec<StubFile>, delay: Duration) -> Self {
        let server = MockServer::start().await;
        let files = Arc::new(Files {
            by_name: files
                .iter()
                .map(|f| (f.filename.clone(), f.clone()))
                .collect(),
            by_id: files.into_iter().map(|f| (f.id.clone(), f)).collect(),
        });

        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(UploadResponder(files.clone()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/compress"))
            .respond_with(CompressResponder { files, delay })
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/api/download/[^/]+$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"compressed".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/download-all"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "ok", "version": "0.1.0" })),
            )
            .mount(&server)
            .await;

        Self { server }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Requests received on `route`, in arrival order
    pub async fn requests_to(&self, route: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .collect()
    }

    /// `file_id` of every compress request, in arrival order
    pub async fn compressed_ids(&self) -> Vec<String> {
        self.requests_to("/api/compress")
            .await
            .iter()
            .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
            .filter_map(|v| v["file_id"].as_str().map(str::to_string))
            .collect()
    }
}
