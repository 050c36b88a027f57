//! # Domain Invariants
//!
//! Constants and rules the relay must always uphold.

use super::errors::RelayError;
use super::value_objects::LogEntry;
use primitive_types::H256;

/// Blocks below `head - CONFIRMATION_DEPTH` are considered safe to backfill;
/// anything younger is left to the live reconciliation stream.
pub const CONFIRMATION_DEPTH: u64 = 10;

/// Number of commands decoded concurrently within one backfill batch.
pub const DECODE_BATCH_SIZE: usize = 10;

/// Number of recent source blocks retained by the reconciliation window.
pub const RETAINED_WINDOW: usize = 100;

/// Live head poll interval in seconds.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Generous fixed gas limit for every replayed transaction.
pub const DEFAULT_GAS_LIMIT: u64 = 8_000_000;

/// Reserved registry value marking a rejected command.
pub const REJECTED_SENTINEL: H256 = H256([0xFF; 32]);

/// Invariant: log entries within a batch execute in ascending source-block
/// order. A later command may depend on an earlier one's side effects.
pub fn invariant_ascending_order(entries: &[LogEntry]) -> Result<(), RelayError> {
    for pair in entries.windows(2) {
        if pair[1].block_number < pair[0].block_number {
            return Err(RelayError::Decode(format!(
                "Batch out of order: block {} follows {}",
                pair[1].block_number, pair[0].block_number
            )));
        }
    }
    Ok(())
}

/// Invariant: the reconciliation window never grows beyond its capacity.
pub fn invariant_window_bounded(len: usize, capacity: usize) -> Result<(), RelayError> {
    if len > capacity {
        return Err(RelayError::ReorgTooDeep(format!(
            "Window holds {} blocks, capacity {}",
            len, capacity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_sentinel_is_all_ff() {
        assert_eq!(REJECTED_SENTINEL, H256::repeat_byte(0xFF));
    }

    fn entry(block: u64) -> LogEntry {
        LogEntry {
            source_tx: H256::from_low_u64_be(block),
            block_number: block,
            block_hash: H256::from_low_u64_be(block + 1000),
        }
    }

    #[test]
    fn test_invariant_ascending_order_ok() {
        assert!(invariant_ascending_order(&[]).is_ok());
        assert!(invariant_ascending_order(&[entry(3), entry(3), entry(5)]).is_ok());
    }

    #[test]
    fn test_invariant_ascending_order_rejects_descents() {
        let err = invariant_ascending_order(&[entry(5), entry(4)]);
        assert!(matches!(err, Err(RelayError::Decode(_))));
    }

    #[test]
    fn test_invariant_window_bounded() {
        assert!(invariant_window_bounded(100, 100).is_ok());
        assert!(invariant_window_bounded(101, 100).is_err());
    }
}
