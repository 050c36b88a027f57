//! # Domain Entities
//!
//! Core entities for the relay synchronization engine.

use super::errors::RelayError;
use super::invariants::REJECTED_SENTINEL;
use super::value_objects::{Address, BlockRef, LedgerTransaction, SnapshotId, Timestamp, TxId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One command recorded on the source ledger, fully decoded.
///
/// A command is determined by the originating transaction's call data
/// (`target`, `payload`) plus the block it was mined in (`timestamp`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Identifier of the originating source-ledger transaction.
    pub source_tx: TxId,
    /// Destination on the target environment; `None` deploys a contract.
    pub target: Option<Address>,
    /// Opaque byte string to execute.
    pub payload: Vec<u8>,
    /// Source-ledger account that authored the command.
    pub origin: Address,
    /// Source-ledger block time the command was recorded at.
    pub timestamp: Timestamp,
}

impl Command {
    /// Assemble a command from its originating transaction, decoded call
    /// data, and the block it was mined in.
    pub fn assemble(
        tx: &LedgerTransaction,
        target: Option<Address>,
        payload: Vec<u8>,
        block: &BlockRef,
    ) -> Self {
        Self {
            source_tx: tx.id,
            target,
            payload,
            origin: tx.from,
            timestamp: block.timestamp,
        }
    }
}

/// Outcome recorded in the Confirmation Registry for one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationOutcome {
    /// No entry exists for this command yet.
    Unset,
    /// Command was applied; the value is the target transaction id.
    Confirmed(TxId),
    /// Command could not be applied (call data sent to a non-contract
    /// address); the reserved sentinel is stored instead.
    Rejected,
}

impl ConfirmationOutcome {
    /// Whether an entry has been written for this command.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Raw 32-byte registry value for a set outcome.
    pub fn to_raw(self) -> Option<TxId> {
        match self {
            Self::Unset => None,
            Self::Confirmed(tx) => Some(tx),
            Self::Rejected => Some(REJECTED_SENTINEL),
        }
    }

    /// Decode a raw registry value back into an outcome.
    pub fn from_raw(raw: Option<TxId>) -> Self {
        match raw {
            None => Self::Unset,
            Some(v) if v == REJECTED_SENTINEL => Self::Rejected,
            Some(v) => Self::Confirmed(v),
        }
    }
}

/// Result of running one command through the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Already confirmed; nothing was done.
    Skipped,
    /// Applied; the target transaction id was recorded.
    Confirmed(TxId),
    /// Rejected; the sentinel was recorded and nothing was submitted.
    Rejected,
    /// A phase failed; nothing was recorded and the command may be
    /// reprocessed later.
    Abandoned,
}

/// Process-local table of pre-execution sandbox snapshots.
///
/// One entry per executed command, created before any mutation and consumed
/// only when a removal notification arrives for that command. Entries for
/// commands that are never removed accumulate for the lifetime of the
/// operator session.
#[derive(Debug, Default)]
pub struct SnapshotTable {
    entries: HashMap<TxId, SnapshotId>,
}

impl SnapshotTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the snapshot taken immediately before `source_tx` executes.
    pub fn record(&mut self, source_tx: TxId, snapshot: SnapshotId) {
        self.entries.insert(source_tx, snapshot);
    }

    /// Remove and return the snapshot for a command, failing loudly if
    /// none was ever recorded (the command was never seen as added).
    pub fn take(&mut self, source_tx: TxId) -> Result<SnapshotId, RelayError> {
        self.entries
            .remove(&source_tx)
            .ok_or(RelayError::MissingSnapshot(source_tx))
    }

    /// Whether a snapshot is recorded for this command.
    pub fn contains(&self, source_tx: &TxId) -> bool {
        self.entries.contains_key(source_tx)
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
