//! # Domain Errors
//!
//! Error types for the relay synchronization engine.

use super::value_objects::{BlockNumber, TxId};
use thiserror::Error;

/// Relay error types.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Source ledger read failed (network or RPC error).
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Call data could not be decoded into a relay command.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Execution sandbox call failed.
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Confirmation registry call failed.
    #[error("Registry error: {0}")]
    Registry(String),

    /// A confirmation entry already exists for this command (write-once).
    #[error("Already confirmed: {0:?}")]
    AlreadyConfirmed(TxId),

    /// A removal notification referenced a command with no recorded
    /// snapshot. This is a consistency violation and is fatal.
    #[error("No snapshot recorded for removed command {0:?}")]
    MissingSnapshot(TxId),

    /// Transaction not found on the source ledger.
    #[error("Transaction not found: {0:?}")]
    TransactionNotFound(TxId),

    /// Block not found on the source ledger.
    #[error("Block not found: {0}")]
    BlockNotFound(BlockNumber),

    /// A reorg reached deeper than the retained reconciliation window.
    #[error("Reorg beyond retained window: {0}")]
    ReorgTooDeep(String),

    /// Fatal bootstrap failure (ledger unreachable, Command Log missing
    /// its creation block, registry deployment failure).
    #[error("Startup failed: {0}")]
    Startup(String),
}
