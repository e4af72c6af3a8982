//! Synthetic progress for records whose compress request is in flight.
//!
//! The service only answers once compression is finished, so each compressing
//! record gets a ticker that nudges its progress toward the configured ceiling.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::Pipeline;
use crate::types::{Event, FileId};

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of running tickers, at most one per record
#[derive(Clone, Default)]
pub(crate) struct ProgressTickers {
    active: Arc<Mutex<HashMap<FileId, Ticker>>>,
}

#[cfg(test)]
impl ProgressTickers {
    /// Number of running tickers
    pub(crate) async fn len(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Whether a ticker is running for this record
    pub(crate) async fn is_active(&self, id: &FileId) -> bool {
        self.active.lock().await.contains_key(id)
    }
}

impl Pipeline {
    /// Start the progress ticker for a record that just entered compressing
    ///
    /// Returns false (and starts nothing) if the record already has a ticker.
    pub(crate) async fn start_ticker(
        &self,
        generation: u64,
        id: &FileId,
        session_cancel: &CancellationToken,
    ) -> bool {
        let mut active = self.tickers.active.lock().await;
        if active.contains_key(id) {
            tracing::warn!(file_id = %id, "progress ticker already running");
            return false;
        }

        let cancel = session_cancel.child_token();
        let handle = tokio::spawn(self.clone().run_ticker(generation, id.clone(), cancel.clone()));
        active.insert(id.clone(), Ticker { cancel, handle });
        true
    }

    /// Stop the ticker of a record and wait for it to exit
    ///
    /// After this returns no further progress update from the ticker can land.
    /// Returns false if no ticker was running.
    pub(crate) async fn stop_ticker(&self, id: &FileId) -> bool {
        let ticker = self.tickers.active.lock().await.remove(id);
        match ticker {
            Some(ticker) => {
                ticker.cancel.cancel();
                if let Err(e) = ticker.handle.await {
                    tracing::error!(file_id = %id, error = %e, "progress ticker panicked");
                }
                true
            }
            None => false,
        }
    }

    /// Stop every ticker, returning how many were running
    pub(crate) async fn stop_all_tickers(&self) -> usize {
        let tickers: Vec<(FileId, Ticker)> = self.tickers.active.lock().await.drain().collect();
        let count = tickers.len();
        for (id, ticker) in tickers {
            ticker.cancel.cancel();
            if let Err(e) = ticker.handle.await {
                tracing::error!(file_id = %id, error = %e, "progress ticker panicked");
            }
        }
        count
    }

    async fn run_ticker(self, generation: u64, id: FileId, cancel: CancellationToken) {
        let progress = &self.config.progress;
        let (step, ceiling) = (progress.step, progress.ceiling);

        let mut interval = tokio::time::interval(progress.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately; the baseline is already set
        interval.tick().await;

        let mut last = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = interval.tick() => {}
            }

            let advanced = self
                .with_session(generation, |session| {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    Ok(session.registry.advance_progress(&id, step, ceiling)?)
                })
                .await;

            match advanced {
                Ok(Some(percent)) => {
                    if last != Some(percent) {
                        last = Some(percent);
                        self.emit_event(Event::Progress {
                            id: id.clone(),
                            percent,
                        });
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    self.report_update_error(&id, &e);
                    return;
                }
            }
        }
    }
}
