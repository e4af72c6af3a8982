//! Pipeline coordinator split into focused submodules.
//!
//! The `Pipeline` struct and its methods are organized by stage:
//! - [`ingest`] - Turning inputs into records and driving uploads
//! - [`compress`] - Sequential compression of queued records
//! - [`ticker`] - Synthetic progress while a compress request is in flight
//! - [`download`] - Single vs. bundle retrieval of finished results
//! - [`session`] - Target size, presets, and starting over

mod compress;
mod download;
mod ingest;
mod session;
mod ticker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use compress::CompressReport;
pub use download::{DownloadPlan, Retrieved};
pub use ingest::IngestHandle;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, TargetConfig};
use crate::error::{Error, Result};
use crate::registry::EntryRegistry;
use crate::service::{CompressionService, HttpCompressionService};
use crate::stats::{BatchStats, PipelineColumns};
use crate::types::{Event, FileId, FileRecord};

/// Everything that is thrown away when the user starts over
pub(crate) struct Session {
    /// Incremented on every reset; results tagged with an older value are dropped
    pub(crate) generation: u64,
    /// The records of this session
    pub(crate) registry: EntryRegistry,
    /// Target size for compression, in KB
    pub(crate) target_kb: u64,
    /// Upper bound of the target range, in KB
    pub(crate) max_kb: u64,
    /// Parent token of every upload, compress request, and ticker of this session
    pub(crate) cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(generation: u64, target: &TargetConfig) -> Self {
        Self {
            generation,
            registry: EntryRegistry::new(),
            target_kb: target.default_target_kb,
            max_kb: target.default_max_kb,
            cancel: CancellationToken::new(),
        }
    }
}

/// Client-side pipeline for one batch of files (cloneable - all fields are Arc-wrapped)
///
/// # Examples
///
/// ```no_run
/// use squishfile::{Config, FileInput, Pipeline, Retrieved};
///
/// # #[tokio::main]
/// # async fn main() -> squishfile::Result<()> {
/// let pipeline = Pipeline::with_http(Config::default())?;
///
/// let handle = pipeline
///     .add_files(vec![FileInput::from_path("photo.jpg").await?])
///     .await?;
/// handle.wait().await;
///
/// pipeline.set_target_kb(200).await;
/// let report = pipeline.compress_all().await?;
/// println!("{} compressed, {} failed", report.compressed.len(), report.failed.len());
///
/// if let Some(path) = pipeline.download_results().await?.write_to("out").await? {
///     println!("saved {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Remote compression service (trait object so tests can substitute a mock)
    pub(crate) service: Arc<dyn CompressionService>,
    /// Current session state, replaced wholesale on reset
    pub(crate) session: Arc<RwLock<Session>>,
    /// Active progress tickers, one per compressing record
    pub(crate) tickers: ticker::ProgressTickers,
    /// Held for the duration of an orchestration run so compress calls never overlap
    pub(crate) compress_lock: Arc<Mutex<()>>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline backed by the given service
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration fails validation.
    pub fn new(config: Config, service: Arc<dyn CompressionService>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(config.pipeline.event_buffer);
        let session = Session::new(0, &config.target);

        tracing::debug!(
            service = service.name(),
            auto_compress = config.pipeline.auto_compress,
            "pipeline created"
        );

        Ok(Self {
            config: Arc::new(config),
            service,
            session: Arc::new(RwLock::new(session)),
            tickers: ticker::ProgressTickers::default(),
            compress_lock: Arc::new(Mutex::new(())),
            event_tx,
        })
    }

    /// Create a pipeline that talks to the configured HTTP service
    pub fn with_http(config: Config) -> Result<Self> {
        let service = HttpCompressionService::new(&config.service)?;
        Self::new(config, Arc::new(service))
    }

    /// Subscribe to pipeline events
    ///
    /// Events are delivered to every subscriber. A subscriber that falls more than
    /// `pipeline.event_buffer` events behind receives a `Lagged` error and skips ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this pipeline was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The service the pipeline talks to
    pub fn service(&self) -> &Arc<dyn CompressionService> {
        &self.service
    }

    /// Ordered copy of every record in the current session
    pub async fn snapshot(&self) -> Vec<FileRecord> {
        self.session.read().await.registry.snapshot()
    }

    /// Copy of one record
    pub async fn get(&self, id: &FileId) -> Option<FileRecord> {
        self.session.read().await.registry.get(id).cloned()
    }

    /// Batch totals for the current session
    pub async fn stats(&self) -> BatchStats {
        BatchStats::from_records(self.session.read().await.registry.records())
    }

    /// Record counts per board column
    pub async fn columns(&self) -> PipelineColumns {
        PipelineColumns::from_records(self.session.read().await.registry.records())
    }

    /// Generation number of the current session
    pub async fn generation(&self) -> u64 {
        self.session.read().await.generation
    }

    /// Emit an event to all subscribers
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Generation and cancellation token of the current session
    pub(crate) async fn session_handle(&self) -> (u64, CancellationToken) {
        let session = self.session.read().await;
        (session.generation, session.cancel.clone())
    }

    /// Mutate the session if it is still the one with `generation`
    ///
    /// Fails with [`Error::SessionReset`] once the session has been replaced, so
    /// an operation that outlived its session never touches the new one.
    pub(crate) async fn with_session<T>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut session = self.session.write().await;
        if session.generation != generation {
            return Err(Error::SessionReset);
        }
        f(&mut session)
    }

    /// Log a registry update that did not apply
    pub(crate) fn report_update_error(&self, id: &FileId, error: &Error) {
        if error.is_invariant_violation() {
            tracing::error!(file_id = %id, error = %error, "record update violates pipeline invariants");
        } else {
            tracing::debug!(file_id = %id, error = %error, "record update discarded");
        }
    }
}
