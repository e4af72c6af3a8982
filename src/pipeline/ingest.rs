//! Ingestion: inputs become records, records are uploaded independently.

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Pipeline;
use crate::error::{Error, RegistryError, Result};
use crate::registry::RecordPatch;
use crate::types::{Event, FileId, FileInput, FileRecord, UploadedFile};
use crate::utils::provisional_id;

/// Uploads started by one [`Pipeline::add_files`] call
#[must_use = "dropping the handle does not cancel the uploads; call wait() to observe completion"]
#[derive(Debug)]
pub struct IngestHandle {
    provisional_ids: Vec<FileId>,
    tasks: Vec<JoinHandle<()>>,
}

impl IngestHandle {
    /// Provisional identities of the new records, in submission order
    ///
    /// Each is replaced by the server identity once its upload succeeds.
    pub fn provisional_ids(&self) -> &[FileId] {
        &self.provisional_ids
    }

    /// Wait until every upload of this call has settled
    pub async fn wait(self) {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "upload task panicked");
            }
        }
    }
}

impl Pipeline {
    /// Add files to the session and start uploading each one
    ///
    /// Records appear in the registry (status uploading) before this returns. Uploads
    /// run concurrently and complete in any order; a failure only affects its own
    /// record.
    pub async fn add_files(&self, inputs: Vec<FileInput>) -> Result<IngestHandle> {
        let records: Vec<FileRecord> = inputs
            .iter()
            .map(|input| FileRecord::uploading(provisional_id(), input))
            .collect();
        let provisional_ids: Vec<FileId> = records.iter().map(|r| r.id.clone()).collect();

        let (generation, cancel) = {
            let mut session = self.session.write().await;
            session.registry.append_all(records)?;
            (session.generation, session.cancel.clone())
        };

        for (id, input) in provisional_ids.iter().zip(&inputs) {
            self.emit_event(Event::Added {
                id: id.clone(),
                filename: input.filename.clone(),
            });
        }
        tracing::info!(count = inputs.len(), generation, "upload batch started");

        let tasks = provisional_ids
            .iter()
            .cloned()
            .zip(inputs)
            .map(|(id, input)| {
                let pipeline = self.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { pipeline.upload_one(generation, cancel, id, input).await })
            })
            .collect();

        Ok(IngestHandle {
            provisional_ids,
            tasks,
        })
    }

    /// Remove an uploading or queued record
    ///
    /// An upload still in flight for the record is left to finish; its result is
    /// dropped.
    pub async fn remove(&self, id: &FileId) -> Result<FileRecord> {
        let removed = self.session.write().await.registry.remove(id)?;
        tracing::debug!(file_id = %id, status = %removed.status, "record removed");
        self.emit_event(Event::Removed { id: id.clone() });
        Ok(removed)
    }

    async fn upload_one(
        &self,
        generation: u64,
        cancel: CancellationToken,
        id: FileId,
        input: FileInput,
    ) {
        tracing::debug!(file_id = %id, filename = %input.filename, size = input.data.len(), "uploading");

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(file_id = %id, "upload abandoned by session reset");
                return;
            }
            result = self.service.upload(&input) => result,
        };

        match result {
            Ok(uploaded) => self.finish_upload(generation, &id, uploaded).await,
            Err(e) => self.fail_upload(generation, &id, e).await,
        }
    }

    async fn finish_upload(&self, generation: u64, id: &FileId, uploaded: UploadedFile) {
        let server_id = uploaded.id.clone();
        let applied = self
            .with_session(generation, |session| {
                session
                    .registry
                    .rebind_id(id, server_id.clone(), RecordPatch::uploaded(&uploaded))?;
                session.max_kb = session.max_kb.max(uploaded.size_kb());
                Ok(())
            })
            .await;

        match applied {
            Ok(()) => {
                tracing::debug!(file_id = %server_id, provisional_id = %id, size = uploaded.size, "upload complete, queued");
                self.emit_event(Event::Uploaded {
                    provisional_id: id.clone(),
                    id: server_id,
                    size: uploaded.size,
                });
                if self.config.pipeline.auto_compress {
                    self.spawn_auto_compress();
                }
            }
            Err(Error::Registry(RegistryError::NotFound(_))) => {
                tracing::debug!(file_id = %id, "record removed while uploading, result dropped");
            }
            Err(e @ Error::Registry(RegistryError::DuplicateId(_))) => {
                // the service handed out an identity another record already holds
                self.fail_upload(generation, id, e).await;
            }
            Err(e) => self.report_update_error(id, &e),
        }
    }

    async fn fail_upload(&self, generation: u64, id: &FileId, error: Error) {
        tracing::warn!(file_id = %id, error = %error, "upload failed");
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
            Ok(()) => self.emit_event(Event::UploadFailed {
                id: id.clone(),
                error: message,
            }),
            Err(Error::Registry(RegistryError::NotFound(_))) => {
                tracing::debug!(file_id = %id, "record removed while uploading, failure dropped");
            }
            Err(e) => self.report_update_error(id, &e),
        }
    }

    fn spawn_auto_compress(&self) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            match pipeline.compress_all().await {
                Ok(_) => {}
                Err(Error::SessionReset) => {
                    tracing::debug!("automatic compression abandoned by session reset");
                }
                Err(e) => tracing::warn!(error = %e, "automatic compression run failed"),
            }
        });
    }
}
