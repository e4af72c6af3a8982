//! Batch aggregation over a registry snapshot
//!
//! Everything here is a pure function of the records passed in. Callers take a
//! snapshot under the session lock and compute outside it.

use serde::{Deserialize, Serialize};

use crate::types::{FileRecord, Status};

/// Batch-level totals for the summary bar and the download decision
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Records in the done state
    pub done_count: usize,
    /// Records in the error state
    pub failed_count: usize,
    /// All records
    pub total_count: usize,
    /// Sum of original sizes in bytes
    pub total_original_bytes: u64,
    /// Sum of compressed size for done records, original size otherwise
    pub total_compressed_bytes: u64,
    /// Original minus compressed total; negative when compression grew the batch
    pub saved_bytes: i64,
    /// Saved bytes as a rounded percentage of the original total, 0 for an empty batch
    pub saved_percent: i64,
    /// No record is compressing
    pub all_settled: bool,
}

impl BatchStats {
    /// Compute the totals for a snapshot
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut stats = BatchStats {
            all_settled: true,
            ..Default::default()
        };

        for record in records {
            stats.total_count += 1;
            stats.total_original_bytes += record.size;
            stats.total_compressed_bytes += record.effective_size();
            match record.status {
                Status::Done => stats.done_count += 1,
                Status::Error => stats.failed_count += 1,
                Status::Compressing => stats.all_settled = false,
                Status::Uploading | Status::Queued => {}
            }
        }

        stats.saved_bytes = stats.total_original_bytes as i64 - stats.total_compressed_bytes as i64;
        stats.saved_percent = if stats.total_original_bytes == 0 {
            0
        } else {
            // halves round toward positive infinity, so -2.5% reads as -2
            let percent = stats.saved_bytes as f64 / stats.total_original_bytes as f64 * 100.0;
            (percent + 0.5).floor() as i64
        };

        stats
    }

    /// Whether there is at least one result to retrieve
    pub fn has_results(&self) -> bool {
        self.done_count > 0
    }
}

/// Record counts per board column
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineColumns {
    /// Uploading or queued
    pub pending: usize,
    /// Compress request in flight
    pub compressing: usize,
    /// Done or error
    pub finished: usize,
}

impl PipelineColumns {
    /// Count the records of a snapshot per column
    pub fn from_records(records: &[FileRecord]) -> Self {
        records.iter().fold(Self::default(), |mut columns, record| {
            if record.status.is_pending() {
                columns.pending += 1;
            } else if record.status.is_terminal() {
                columns.finished += 1;
            } else {
                columns.compressing += 1;
            }
            columns
        })
    }
}
