//! Retrieval of finished results: one file directly, several as a bundle.

use std::path::{Path, PathBuf};

use url::Url;

use super::Pipeline;
use crate::error::{Error, RegistryError, Result};
use crate::types::{FileId, FileRecord, Status};
use crate::utils::{format_size, sanitize_filename, unique_path};

/// Which download collaborator a retrieval would use
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadPlan {
    /// No record is done
    Nothing,
    /// Exactly one record is done
    Single(FileId),
    /// Several records are done, in registry order
    Bundle(Vec<FileId>),
}

impl DownloadPlan {
    /// Decide the plan for a snapshot
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSettled`] while any record is compressing.
    pub fn from_records(records: &[FileRecord]) -> Result<Self> {
        let compressing = records
            .iter()
            .filter(|r| r.status == Status::Compressing)
            .count();
        if compressing > 0 {
            return Err(Error::NotSettled { compressing });
        }

        let mut done: Vec<FileId> = records
            .iter()
            .filter(|r| r.status == Status::Done)
            .map(|r| r.id.clone())
            .collect();

        Ok(match done.len() {
            0 => DownloadPlan::Nothing,
            1 => DownloadPlan::Single(done.remove(0)),
            _ => DownloadPlan::Bundle(done),
        })
    }
}

/// Bytes fetched from the service
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Retrieved {
    /// There was nothing to fetch
    Nothing,
    /// One compressed file
    Single {
        /// Record identity
        id: FileId,
        /// Original filename of the record
        filename: String,
        /// Compressed bytes
        data: Vec<u8>,
    },
    /// Archive of several compressed files
    Bundle {
        /// Records in the archive, in registry order
        ids: Vec<FileId>,
        /// File name to save the archive under
        filename: String,
        /// Archive bytes
        data: Vec<u8>,
    },
}

impl Retrieved {
    /// Write the result into `dir`, never overwriting an existing file
    ///
    /// Returns the path written, or `None` for [`Retrieved::Nothing`].
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let (filename, data) = match self {
            Retrieved::Nothing => return Ok(None),
            Retrieved::Single { filename, data, .. } | Retrieved::Bundle { filename, data, .. } => {
                (filename, data)
            }
        };

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = unique_path(&dir.join(sanitize_filename(filename)))?;
        tokio::fs::write(&path, data).await?;

        tracing::debug!(
            path = %path.display(),
            size = %format_size(data.len() as u64),
            "result saved"
        );
        Ok(Some(path))
    }
}

impl Pipeline {
    /// Decide how the current results would be retrieved
    pub async fn download_plan(&self) -> Result<DownloadPlan> {
        DownloadPlan::from_records(self.session.read().await.registry.records())
    }

    /// Stable address of the current results, if there are any
    pub async fn download_link(&self) -> Result<Option<Url>> {
        match self.download_plan().await? {
            DownloadPlan::Nothing => Ok(None),
            DownloadPlan::Single(id) => self.service.download_url(&id).map(Some),
            DownloadPlan::Bundle(ids) => self.service.bundle_url(&ids).map(Some),
        }
    }

    /// Fetch every finished result
    ///
    /// No done record is a no-op, one is fetched directly, several are fetched as
    /// one bundle. Nothing is requested while a record is still compressing.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSettled`] while any record is compressing
    /// - the collaborator's error if the fetch fails
    pub async fn download_results(&self) -> Result<Retrieved> {
        let plan = match self.download_plan().await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "download refused");
                return Err(e);
            }
        };

        match plan {
            DownloadPlan::Nothing => {
                tracing::debug!("no finished results to download");
                Ok(Retrieved::Nothing)
            }
            DownloadPlan::Single(id) => self.fetch_single(id).await,
            DownloadPlan::Bundle(ids) => {
                tracing::info!(count = ids.len(), "downloading result bundle");
                let data = self.service.download_bundle(&ids).await?;
                Ok(Retrieved::Bundle {
                    ids,
                    filename: self.config.service.bundle_filename.clone(),
                    data,
                })
            }
        }
    }

    /// Fetch the result of one finished record
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if the record is not tracked
    /// - [`Error::NotDone`] if the record is not done
    pub async fn download_one(&self, id: &FileId) -> Result<Retrieved> {
        let status = self
            .session
            .read()
            .await
            .registry
            .get(id)
            .map(|r| r.status)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if status != Status::Done {
            return Err(Error::NotDone {
                id: id.clone(),
                status,
            });
        }
        self.fetch_single(id.clone()).await
    }

    async fn fetch_single(&self, id: FileId) -> Result<Retrieved> {
        let filename = self
            .get(&id)
            .await
            .map(|r| r.original_filename)
            .unwrap_or_else(|| id.to_string());

        tracing::debug!(file_id = %id, "downloading result");
        let data = self.service.download(&id).await?;
        Ok(Retrieved::Single { id, filename, data })
    }
}
