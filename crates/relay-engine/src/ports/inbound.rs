//! # Inbound Ports
//!
//! The API surface the relay coordinator exposes to its operator.

use crate::algorithms::BackfillReport;
use crate::domain::{BlockNumber, RelayError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Observable relay state, for status lines and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    /// Block historical backfill resumes from.
    pub cursor: BlockNumber,
    /// Highest source head observed so far.
    pub head_seen: BlockNumber,
    /// Commands applied and confirmed.
    pub executed: u64,
    /// Commands rejected (call data to a non-contract address).
    pub rejected: u64,
    /// Commands skipped by the idempotence check.
    pub skipped: u64,
    /// Commands abandoned after a phase failure.
    pub abandoned: u64,
    /// Commands rolled back after a reorg removal.
    pub rolled_back: u64,
    /// Whether the live reconciliation loop is running.
    pub live: bool,
}

/// Relay coordinator API - inbound port.
#[async_trait]
pub trait RelayApi {
    /// Ensure the registry exists, anchor sandbox time, and derive the
    /// resume cursor. Fatal on failure.
    async fn bootstrap(&mut self) -> Result<BlockNumber, RelayError>;

    /// Replay historical commands over `[cursor, head - depth]`.
    async fn backfill(&mut self) -> Result<BackfillReport, RelayError>;

    /// Poll the source head and reconcile until `shutdown` flips to true.
    async fn run_live(&mut self, shutdown: watch::Receiver<bool>) -> Result<(), RelayError>;

    /// Current relay status.
    fn status(&self) -> RelayStatus;
}
