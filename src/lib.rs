//! # squishfile
//!
//! Client-side pipeline for squeezing a batch of files toward a target size with a
//! remote compression service.
//!
//! ## Design Philosophy
//!
//! squishfile is designed to be:
//! - **Failure-isolated** - One bad file never stops the rest of the batch
//! - **Sensible defaults** - Works out of the box against a local service
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Lifecycle
//!
//! Every file moves through `uploading -> queued -> compressing -> done`, or ends in
//! `error` when its upload or compression fails. Uploads run concurrently;
//! compression runs one file at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use squishfile::{Config, FileInput, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::with_http(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let inputs = vec![
//!         FileInput::from_path("holiday.jpg").await?,
//!         FileInput::from_path("scan.pdf").await?,
//!     ];
//!     pipeline.add_files(inputs).await?.wait().await;
//!
//!     pipeline.set_target_kb(300).await;
//!     pipeline.compress_all().await?;
//!
//!     let stats = pipeline.stats().await;
//!     println!("saved {}%", stats.saved_percent);
//!
//!     pipeline.download_results().await?.write_to("compressed").await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Pipeline coordinator (decomposed into focused submodules)
pub mod pipeline;
/// Entry registry
pub mod registry;
/// Remote compression service
pub mod service;
/// Batch aggregation
pub mod stats;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, PipelineConfig, ProgressConfig, ServiceConfig, TargetConfig};
pub use error::{CompressionError, Error, RegistryError, Result, UploadError};
pub use pipeline::{CompressReport, DownloadPlan, IngestHandle, Pipeline, Retrieved};
pub use registry::{EntryRegistry, RecordPatch};
pub use service::{CompressionService, HttpCompressionService};
pub use stats::{BatchStats, PipelineColumns};
pub use types::{
    CompressOutcome, Event, FileCategory, FileId, FileInput, FileRecord, HealthStatus, Status,
    TargetPreset, UploadedFile,
};
