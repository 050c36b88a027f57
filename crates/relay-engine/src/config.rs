//! # Relay Configuration
//!
//! Configuration for the relay synchronization engine.

use crate::domain::{
    CONFIRMATION_DEPTH, DECODE_BATCH_SIZE, DEFAULT_GAS_LIMIT, POLL_INTERVAL_SECS, RETAINED_WINDOW,
};
use serde::{Deserialize, Serialize};

/// Relay configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Backfill stops this many blocks short of the source head; younger
    /// blocks are handled by the live reconciliation stream.
    pub confirmation_depth: u64,

    /// Commands decoded concurrently within one backfill batch. Execution
    /// within a batch stays strictly sequential.
    pub decode_batch_size: usize,

    /// Recent source blocks retained for reorg detection.
    pub retained_window: usize,

    /// Live head poll interval in seconds.
    pub poll_interval_secs: u64,

    /// Fixed gas limit for every replayed transaction.
    pub tx_gas_limit: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            confirmation_depth: CONFIRMATION_DEPTH,
            decode_batch_size: DECODE_BATCH_SIZE,
            retained_window: RETAINED_WINDOW,
            poll_interval_secs: POLL_INTERVAL_SECS,
            tx_gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

impl RelayConfig {
    /// Create a config for testing (small depths, fast polls).
    pub fn for_testing() -> Self {
        Self {
            confirmation_depth: 2,
            decode_batch_size: 3,
            retained_window: 8,
            poll_interval_secs: 1,
            tx_gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}
