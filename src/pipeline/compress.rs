//! Compression orchestration: queued records are compressed one at a time.

use serde::{Deserialize, Serialize};

use super::Pipeline;
use crate::error::{CompressionError, Error, Result};
use crate::registry::RecordPatch;
use crate::types::{CompressOutcome, Event, FileId};
use crate::utils::{format_signed_size, format_size};

/// What one orchestration run did
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressReport {
    /// Records that reached done, in dispatch order
    pub compressed: Vec<FileId>,
    /// Records that reached error, in dispatch order
    pub failed: Vec<FileId>,
}

impl CompressReport {
    /// Number of records dispatched
    pub fn total(&self) -> usize {
        self.compressed.len() + self.failed.len()
    }

    /// Whether nothing was queued
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Pipeline {
    /// Compress every queued record using the session target size
    pub async fn compress_all(&self) -> Result<CompressReport> {
        let target_kb = self.session.read().await.target_kb;
        self.compress_queued(target_kb).await
    }

    /// Compress every queued record toward `target_kb`
    ///
    /// Records are dispatched strictly one after another in registry order; the next
    /// request is only issued once the previous one settled. Records queued while
    /// the run is in progress are picked up by the same run. A failed record is
    /// marked as such and the run moves on.
    ///
    /// Concurrent calls wait for each other, so at most one compress request is in
    /// flight per pipeline.
    ///
    /// # Errors
    ///
    /// - [`CompressionError::InvalidTarget`] for a target of 0 KB
    /// - [`Error::SessionReset`] if the session was reset during the run
    pub async fn compress_queued(&self, target_kb: u64) -> Result<CompressReport> {
        if target_kb == 0 {
            return Err(CompressionError::InvalidTarget.into());
        }

        let _run = self.compress_lock.lock().await;
        let (generation, cancel) = self.session_handle().await;
        let baseline = self.config.progress.baseline;
        let mut report = CompressReport::default();

        tracing::info!(target_kb, generation, "compression run started");

        loop {
            // re-read the queue each time so removed records are never dispatched
            let next = self
                .with_session(generation, |session| {
                    let Some(id) = session.registry.next_queued().map(|r| r.id.clone()) else {
                        return Ok(None);
                    };
                    session
                        .registry
                        .update_by_id(&id, RecordPatch::compressing(baseline))?;
                    Ok(Some(id))
                })
                .await?;
            let Some(id) = next else { break };

            tracing::debug!(file_id = %id, target_kb, "compressing");
            self.start_ticker(generation, &id, &cancel).await;
            self.emit_event(Event::Compressing {
                id: id.clone(),
                target_kb,
            });

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    self.stop_ticker(&id).await;
                    tracing::debug!(file_id = %id, "compress request abandoned by session reset");
                    return Err(Error::SessionReset);
                }
                result = self.service.compress(&id, target_kb) => result,
            };

            self.stop_ticker(&id).await;

            match result {
                Ok(outcome) => {
                    if self.finish_compress(generation, &id, outcome).await? {
                        report.compressed.push(id);
                    }
                }
                Err(e) => {
                    if self.fail_compress(generation, &id, e).await? {
                        report.failed.push(id);
                    }
                }
            }
        }

        let stats = self.stats().await;
        tracing::info!(
            compressed = report.compressed.len(),
            failed = report.failed.len(),
            batch_saved = %format_signed_size(stats.saved_bytes),
            "compression run complete"
        );
        if !report.is_empty() {
            self.emit_event(Event::BatchComplete {
                done: report.compressed.len(),
                failed: report.failed.len(),
            });
        }

        Ok(report)
    }

    /// Apply a successful outcome; Ok(false) if the update was rejected
    async fn finish_compress(
        &self,
        generation: u64,
        id: &FileId,
        outcome: CompressOutcome,
    ) -> Result<bool> {
        let applied = self
            .with_session(generation, |session| {
                session
                    .registry
                    .update_by_id(id, RecordPatch::done(&outcome))?;
                Ok(())
            })
            .await;

        match applied {
            Ok(()) => {
                tracing::debug!(
                    file_id = %id,
                    original = %format_size(outcome.original_size),
                    compressed = %format_size(outcome.compressed_size),
                    skipped = outcome.skipped,
                    "compression complete"
                );
                self.emit_event(Event::Compressed {
                    id: id.clone(),
                    original_size: outcome.original_size,
                    compressed_size: outcome.compressed_size,
                    skipped: outcome.skipped,
                    message: outcome.message,
                });
                Ok(true)
            }
            Err(Error::SessionReset) => Err(Error::SessionReset),
            Err(e) => {
                self.report_update_error(id, &e);
                Ok(false)
            }
        }
    }

    /// Record a failed compress request; Ok(false) if the update was rejected
    async fn fail_compress(&self, generation: u64, id: &FileId, error: Error) -> Result<bool> {
        tracing::warn!(file_id = %id, error = %error, "compression failed");
        let message = error.user_message();

        let applied = self
            .with_session(generation, |session| {
                session
                    .registry
                    .update_by_id(id, RecordPatch::failed(message.clone()))?;
                Ok(())
            })
            .await;

        match applied {
            Ok(()) => {
                self.emit_event(Event::CompressFailed {
                    id: id.clone(),
                    error: message,
                });
                Ok(true)
            }
            Err(Error::SessionReset) => Err(Error::SessionReset),
            Err(e) => {
                self.report_update_error(id, &e);
                Ok(false)
            }
        }
    }
}
