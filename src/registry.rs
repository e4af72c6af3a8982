//! Entry registry: the ordered collection of file records.
//!
//! The registry is the only shared mutable state of a session. Every mutation is
//! addressed by identity and validated against the pipeline state machine before
//! any field is written, so a rejected patch leaves the record untouched.

use crate::error::RegistryError;
use crate::types::{CompressOutcome, FileCategory, FileId, FileRecord, Status, UploadedFile};

/// Partial mutation of a single record
///
/// Unset fields are left as they are. Use the constructors for the transitions the
/// pipeline performs; they produce patches that pass validation from the matching
/// source state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPatch {
    /// New status
    pub status: Option<Status>,
    /// New progress
    pub progress: Option<u8>,
    /// Compressed size (only valid together with Done)
    pub compressed_size: Option<u64>,
    /// Error cause or advisory
    pub message: Option<String>,
    /// Detected MIME type
    pub mime: Option<String>,
    /// Detected category
    pub category: Option<FileCategory>,
    /// Size as stored by the service
    pub size: Option<u64>,
    /// Pixel width
    pub width: Option<u32>,
    /// Pixel height
    pub height: Option<u32>,
    /// Duration in seconds
    pub duration: Option<f64>,
}

impl RecordPatch {
    /// Upload succeeded: fill metadata and queue the record
    pub fn uploaded(uploaded: &UploadedFile) -> Self {
        Self {
            status: Some(Status::Queued),
            mime: Some(uploaded.mime.clone()),
            category: Some(uploaded.category),
            size: Some(uploaded.size),
            width: uploaded.width,
            height: uploaded.height,
            duration: uploaded.duration,
            ..Default::default()
        }
    }

    /// Upload or compression failed
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Error),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Orchestrator picked the record up
    pub fn compressing(baseline: u8) -> Self {
        Self {
            status: Some(Status::Compressing),
            progress: Some(baseline),
            ..Default::default()
        }
    }

    /// Compression succeeded
    pub fn done(outcome: &CompressOutcome) -> Self {
        Self {
            status: Some(Status::Done),
            progress: Some(100),
            compressed_size: Some(outcome.compressed_size),
            message: outcome.message.clone(),
            ..Default::default()
        }
    }

    /// Progress-only update
    pub fn progress(percent: u8) -> Self {
        Self {
            progress: Some(percent),
            ..Default::default()
        }
    }

    fn apply(self, record: &mut FileRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress;
        }
        if record.status == Status::Done {
            record.progress = 100;
        }
        if let Some(size) = self.compressed_size {
            record.compressed_size = Some(size);
        }
        if let Some(message) = self.message {
            record.message = Some(message);
        }
        if let Some(mime) = self.mime {
            record.mime = mime;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(size) = self.size {
            record.size = size;
        }
        if self.width.is_some() {
            record.width = self.width;
        }
        if self.height.is_some() {
            record.height = self.height;
        }
        if self.duration.is_some() {
            record.duration = self.duration;
        }
    }
}

/// Check a patch against a record without touching it
fn validate(record: &FileRecord, patch: &RecordPatch) -> Result<(), RegistryError> {
    let next = patch.status.unwrap_or(record.status);

    if record.status.is_terminal() {
        return Err(RegistryError::IllegalTransition {
            id: record.id.clone(),
            from: record.status,
            to: next,
        });
    }
    if next != record.status && !record.status.can_transition_to(next) {
        return Err(RegistryError::IllegalTransition {
            id: record.id.clone(),
            from: record.status,
            to: next,
        });
    }

    if let Some(progress) = patch.progress {
        if progress > 100 {
            return Err(RegistryError::ProgressOutOfRange(progress));
        }
        if record.status == Status::Compressing
            && next == Status::Compressing
            && progress < record.progress
        {
            return Err(RegistryError::ProgressRegression {
                id: record.id.clone(),
                current: record.progress,
                requested: progress,
            });
        }
    }

    let compressed = patch.compressed_size.or(record.compressed_size);
    if (next == Status::Done) != compressed.is_some() {
        return Err(RegistryError::CompressedSizeMismatch {
            id: record.id.clone(),
            status: next,
        });
    }

    Ok(())
}

/// Ordered, identity-keyed collection of [`FileRecord`]s
///
/// Insertion order is preserved and is the enumeration order of every read.
#[derive(Clone, Debug, Default)]
pub struct EntryRegistry {
    records: Vec<FileRecord>,
}

impl EntryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by identity
    pub fn get(&self, id: &FileId) -> Option<&FileRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Whether a record with this identity exists
    pub fn contains(&self, id: &FileId) -> bool {
        self.get(id).is_some()
    }

    /// Records in insertion order
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Owned copy of the records in insertion order
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.records.clone()
    }

    /// First queued record in insertion order
    pub fn next_queued(&self) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.status == Status::Queued)
    }

    /// Identities of records whose status satisfies `predicate`, in order
    pub fn ids_where(&self, predicate: impl Fn(Status) -> bool) -> Vec<FileId> {
        self.records
            .iter()
            .filter(|r| predicate(r.status))
            .map(|r| r.id.clone())
            .collect()
    }

    fn position(&self, id: &FileId) -> Result<usize, RegistryError> {
        self.records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Add a record at the end
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the identity is already tracked.
    pub fn append(&mut self, record: FileRecord) -> Result<(), RegistryError> {
        if self.contains(&record.id) {
            return Err(RegistryError::DuplicateId(record.id));
        }
        self.records.push(record);
        Ok(())
    }

    /// Add several records at the end, or none of them
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] for the first identity that is already
    /// tracked or repeated within `records`; the registry is left unchanged.
    pub fn append_all(&mut self, records: Vec<FileRecord>) -> Result<(), RegistryError> {
        for (i, record) in records.iter().enumerate() {
            if self.contains(&record.id) || records[..i].iter().any(|r| r.id == record.id) {
                return Err(RegistryError::DuplicateId(record.id.clone()));
            }
        }
        self.records.extend(records);
        Ok(())
    }

    /// Apply a patch to the record with this identity
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if no record has the identity
    /// - a validation error if the patch would break a record invariant; the record
    ///   is left unchanged
    pub fn update_by_id(
        &mut self,
        id: &FileId,
        patch: RecordPatch,
    ) -> Result<&FileRecord, RegistryError> {
        let idx = self.position(id)?;
        let record = &mut self.records[idx];
        validate(record, &patch)?;
        patch.apply(record);
        Ok(record)
    }

    /// Replace a record's identity and apply a patch in one step
    ///
    /// The record keeps its position. There is no moment at which neither identity,
    /// or both, resolve to the record.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if `old` is not tracked
    /// - [`RegistryError::DuplicateId`] if `new` already belongs to another record
    /// - a validation error for the patch
    pub fn rebind_id(
        &mut self,
        old: &FileId,
        new: FileId,
        patch: RecordPatch,
    ) -> Result<&FileRecord, RegistryError> {
        let idx = self.position(old)?;
        if &new != old && self.contains(&new) {
            return Err(RegistryError::DuplicateId(new));
        }
        let record = &mut self.records[idx];
        validate(record, &patch)?;
        record.id = new;
        patch.apply(record);
        Ok(record)
    }

    /// Remove an uploading or queued record
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if no record has the identity
    /// - [`RegistryError::NotRemovable`] if the record is compressing or finished
    pub fn remove(&mut self, id: &FileId) -> Result<FileRecord, RegistryError> {
        let idx = self.position(id)?;
        let status = self.records[idx].status;
        if !status.is_removable() {
            return Err(RegistryError::NotRemovable {
                id: id.clone(),
                status,
            });
        }
        Ok(self.records.remove(idx))
    }

    /// Advance fabricated progress by `step`, clamped to `ceiling`
    ///
    /// Returns `Ok(None)` when the record is no longer compressing; the caller
    /// should stop ticking.
    pub fn advance_progress(
        &mut self,
        id: &FileId,
        step: u8,
        ceiling: u8,
    ) -> Result<Option<u8>, RegistryError> {
        let idx = self.position(id)?;
        let record = &self.records[idx];
        if record.status != Status::Compressing {
            return Ok(None);
        }
        let next = record.progress.saturating_add(step).min(ceiling).max(record.progress);
        let record = self.update_by_id(id, RecordPatch::progress(next))?;
        Ok(Some(record.progress))
    }
}
