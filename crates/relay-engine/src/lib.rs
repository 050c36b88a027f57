//! # Relay Synchronization Engine
//!
//! Replays commands recorded on a source ledger's Command Log onto a
//! locally executed target environment.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Keep a local target environment consistent with the command history a
//! source ledger has finalized, and keep tracking it as the ledger grows:
//! - Historical backfill up to a confirmation horizon
//! - Live reconciliation tolerant of chain reorganizations
//! - Four-phase execution with pre-apply snapshots and rollback
//! - An idempotent on-target confirmation registry for safe resume
//!
//! ## Execution Guarantees
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | Each command applied at most once | Registry skip-check before apply |
//! | Source order preserved | Strictly sequential execution |
//! | Reorg recovery | Snapshot per command, revert on removal |
//! | Crash resume | Cursor derived from last confirmed command |
//!
//! ## Module Structure
//!
//! ```text
//! relay-engine/
//! ├── domain/          # Command, outcomes, snapshot table, errors
//! ├── algorithms/      # Payload decoding, backfill math, chain tracking
//! ├── ports/           # RelayApi, LedgerClient, ExecutionSandbox, registry
//! ├── adapters/        # JSON-RPC ledger, local sandbox, in-memory registry
//! └── application/     # Four-phase executor, relay coordinator
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    InMemoryRegistry, JsonRpcLedger, LocalSandbox, SimulatedLedger, REGISTRY_ADDRESS,
};
pub use algorithms::{
    batch_entries, capped_to_block, command_from_log, decode_batch, decode_relay_call,
    encode_relay_call, BackfillReport, ChainDelta, ChainTracker, TrackedBlock,
};
pub use application::{CommandExecutor, RelayService};
pub use config::RelayConfig;
pub use domain::{
    invariant_ascending_order, invariant_window_bounded, Address,
    BlockHash, BlockNumber, BlockRef, CallData, Command, ConfirmationOutcome, ExecutionOutcome,
    LedgerTransaction, LogEntry, RelayError, SnapshotId, SnapshotTable, Timestamp, TxId,
    TxRequest, CONFIRMATION_DEPTH, DECODE_BATCH_SIZE, DEFAULT_GAS_LIMIT, POLL_INTERVAL_SECS,
    REJECTED_SENTINEL, RETAINED_WINDOW,
};
pub use ports::{
    CommandLog, ConfirmationRegistry, ExecutionSandbox, LedgerClient, MockLedger, MockRegistry,
    MockSandbox, RelayApi, RelayStatus,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
