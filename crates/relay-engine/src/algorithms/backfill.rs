//! # Backfill Planning
//!
//! Pure helpers for the historical replay pass: range capping below the
//! confirmation horizon and order-preserving batch planning.

use crate::domain::{BlockNumber, ExecutionOutcome, LogEntry};
use serde::{Deserialize, Serialize};

/// Cap the backfill upper bound at `head - depth`; blocks younger than the
/// confirmation horizon are left to the live reconciliation stream.
pub fn capped_to_block(head: BlockNumber, depth: u64) -> BlockNumber {
    head.saturating_sub(depth)
}

/// Split entries into fixed-size batches, preserving log order.
pub fn batch_entries(entries: Vec<LogEntry>, size: usize) -> Vec<Vec<LogEntry>> {
    assert!(size > 0, "batch size must be positive");
    entries
        .chunks(size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Summary of one backfill pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// First block of the replayed range.
    pub from_block: BlockNumber,
    /// Last block of the replayed range.
    pub to_block: BlockNumber,
    /// Total log entries seen.
    pub entries: u64,
    /// Commands applied and confirmed.
    pub executed: u64,
    /// Commands rejected.
    pub rejected: u64,
    /// Commands skipped by the idempotence check.
    pub skipped: u64,
    /// Commands abandoned after a phase failure.
    pub abandoned: u64,
}

impl BackfillReport {
    /// Start a report for a block range.
    pub fn new(from_block: BlockNumber, to_block: BlockNumber) -> Self {
        Self {
            from_block,
            to_block,
            ..Default::default()
        }
    }

    /// Account one executed command.
    pub fn tally(&mut self, outcome: &ExecutionOutcome) {
        self.entries += 1;
        match outcome {
            ExecutionOutcome::Confirmed(_) => self.executed += 1,
            ExecutionOutcome::Rejected => self.rejected += 1,
            ExecutionOutcome::Skipped => self.skipped += 1,
            ExecutionOutcome::Abandoned => self.abandoned += 1,
        }
    }
}
