//! # Canonical-Chain Reconciliation
//!
//! Retained-window tracking of the source ledger's recent blocks. Each
//! observed canonical suffix is diffed against the window: blocks that fall
//! out of the canonical chain yield removal deltas (in reverse of their add
//! order), previously-unseen canonical blocks yield add deltas.

use crate::domain::{
    invariant_window_bounded, BlockHash, BlockRef, LogEntry, RelayError,
};
use std::collections::VecDeque;

/// One reconciliation notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainDelta {
    /// A command-bearing log entry became canonical.
    Added(LogEntry),
    /// A previously-added log entry was reorged away.
    Removed(LogEntry),
}

/// A retained block and the log entries attributed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedBlock {
    /// The block header.
    pub block: BlockRef,
    /// Command Log entries mined in this block.
    pub entries: Vec<LogEntry>,
}

/// Sliding window over the source ledger's recent canonical blocks.
#[derive(Debug)]
pub struct ChainTracker {
    window: VecDeque<TrackedBlock>,
    capacity: usize,
}

impl ChainTracker {
    /// Create a tracker retaining up to `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Newest retained block header, if any.
    pub fn latest(&self) -> Option<&BlockRef> {
        self.window.back().map(|t| &t.block)
    }

    /// Oldest retained block header, if any.
    pub fn oldest(&self) -> Option<&BlockRef> {
        self.window.front().map(|t| &t.block)
    }

    /// Whether a block hash is retained.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.window.iter().any(|t| t.block.hash == *hash)
    }

    /// Number of retained blocks.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window is empty (not yet primed).
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Diff a freshly fetched canonical suffix against the retained window.
    ///
    /// `suffix` is ordered oldest-first and must attach to a retained block
    /// via its first parent hash (unless the window is still empty, which
    /// primes it). Returns removals first, in reverse of their add order,
    /// then additions in ascending order.
    pub fn observe(&mut self, suffix: Vec<TrackedBlock>) -> Result<Vec<ChainDelta>, RelayError> {
        let Some(first) = suffix.first() else {
            return Ok(Vec::new());
        };

        let mut deltas = Vec::new();

        if let Some(oldest) = self.window.front().map(|t| t.block.number) {
            let attach = self
                .window
                .iter()
                .position(|t| t.block.hash == first.block.parent_hash);
            let keep = match attach {
                Some(index) => index + 1,
                // The suffix starts at or below the oldest retained height:
                // the whole window was reorged away.
                None if first.block.number <= oldest => 0,
                None => {
                    return Err(RelayError::ReorgTooDeep(format!(
                        "No retained ancestor for block {} ({:?})",
                        first.block.number, first.block.parent_hash
                    )));
                }
            };

            // Everything above the attach point fell out of the canon.
            while self.window.len() > keep {
                let dropped = self.window.pop_back().expect("window non-empty");
                for entry in dropped.entries.into_iter().rev() {
                    deltas.push(ChainDelta::Removed(entry));
                }
            }
        }

        let mut prev_hash = self.latest().map(|b| b.hash);
        for tracked in suffix {
            if let Some(prev) = prev_hash {
                if tracked.block.parent_hash != prev {
                    return Err(RelayError::Ledger(format!(
                        "Discontinuous suffix at block {}",
                        tracked.block.number
                    )));
                }
            }
            prev_hash = Some(tracked.block.hash);
            for entry in &tracked.entries {
                deltas.push(ChainDelta::Added(entry.clone()));
            }
            self.window.push_back(tracked);
        }

        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        invariant_window_bounded(self.window.len(), self.capacity)?;

        Ok(deltas)
    }
}
