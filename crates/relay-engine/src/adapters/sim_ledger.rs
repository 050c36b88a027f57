//! # Simulated Source Ledger
//!
//! Programmable in-memory source chain: blocks can be appended, command
//! transactions attached, and a suffix reorged away. Drives the test suite
//! and the node's demo mode.

use crate::algorithms::encode_relay_call;
use crate::domain::{
    Address, BlockHash, BlockNumber, BlockRef, LedgerTransaction, LogEntry, RelayError, Timestamp,
    TxId,
};
use crate::ports::{CommandLog, LedgerClient};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One simulated block with its command-bearing transactions.
#[derive(Clone, Debug)]
struct SimBlock {
    block: BlockRef,
    txs: Vec<LedgerTransaction>,
}

#[derive(Debug, Default)]
struct SimState {
    chain: Vec<SimBlock>,
    /// All transactions ever mined, including reorged-away ones; the
    /// ledger keeps serving them by hash.
    txs: HashMap<TxId, LedgerTransaction>,
    /// All block headers ever seen, by hash.
    headers: HashMap<BlockHash, BlockRef>,
    /// Bumped on every reorg so replacement blocks get fresh hashes.
    fork_seq: u64,
    next_tx: u64,
}

/// Shared-handle simulated ledger; clones observe the same chain.
#[derive(Clone, Debug)]
pub struct SimulatedLedger {
    log_address: Address,
    created: BlockNumber,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedLedger {
    /// Create a ledger whose Command Log contract was created in block 0,
    /// with `genesis_timestamp` on the genesis block.
    pub fn new(log_address: Address, genesis_timestamp: Timestamp) -> Self {
        let ledger = Self {
            log_address,
            created: 0,
            state: Arc::new(Mutex::new(SimState::default())),
        };
        ledger.push_block_at(genesis_timestamp);
        ledger
    }

    fn hash_for(number: BlockNumber, fork_seq: u64) -> BlockHash {
        let mut raw = [0u8; 32];
        raw[..8].copy_from_slice(&number.to_be_bytes());
        raw[8..16].copy_from_slice(&fork_seq.to_be_bytes());
        raw[31] = 0x51;
        BlockHash::from(raw)
    }

    /// Append an empty block with an explicit timestamp.
    pub fn push_block_at(&self, timestamp: Timestamp) -> BlockNumber {
        let mut state = self.state.lock().unwrap();
        let number = state.chain.len() as BlockNumber;
        let parent_hash = state
            .chain
            .last()
            .map(|b| b.block.hash)
            .unwrap_or_default();
        let block = BlockRef {
            number,
            hash: Self::hash_for(number, state.fork_seq),
            parent_hash,
            timestamp,
        };
        state.headers.insert(block.hash, block.clone());
        state.chain.push(SimBlock {
            block,
            txs: Vec::new(),
        });
        number
    }

    /// Append an empty block 15 seconds after the current tip.
    pub fn push_block(&self) -> BlockNumber {
        let timestamp = {
            let state = self.state.lock().unwrap();
            state.chain.last().map(|b| b.block.timestamp + 15).unwrap_or(0)
        };
        self.push_block_at(timestamp)
    }

    /// Append a block carrying one relay command and return the id of the
    /// originating transaction.
    pub fn push_command(&self, origin: Address, to: Option<Address>, data: &[u8]) -> TxId {
        let number = self.push_block();
        let mut state = self.state.lock().unwrap();
        state.next_tx += 1;
        let id = TxId::from_low_u64_be(0x7A00_0000 + state.next_tx);
        let tx = LedgerTransaction {
            id,
            from: origin,
            input: encode_relay_call(to, data),
            block_number: number,
        };
        state.txs.insert(id, tx.clone());
        state.chain[number as usize].txs.push(tx);
        id
    }

    /// Reorg: drop every block from `from` upward and replace the range
    /// with empty blocks of the same height (fresh hashes), plus one extra
    /// block so the new fork is the longer chain.
    pub fn reorg_from(&self, from: BlockNumber) {
        let (old_len, mut ts) = {
            let mut state = self.state.lock().unwrap();
            let old_len = state.chain.len() as BlockNumber;
            let ts = state
                .chain
                .last()
                .map(|b| b.block.timestamp + 1)
                .unwrap_or(0);
            state.fork_seq += 1;
            state.chain.truncate(from as usize);
            (old_len, ts)
        };
        // Rebuild the dropped heights plus one extra so the fork wins.
        while self.block_count() <= old_len {
            self.push_block_at(ts);
            ts += 15;
        }
    }

    /// Current chain length (tip number + 1).
    pub fn block_count(&self) -> BlockNumber {
        self.state.lock().unwrap().chain.len() as BlockNumber
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn block_number(&self) -> Result<BlockNumber, RelayError> {
        let state = self.state.lock().unwrap();
        Ok(state.chain.len().saturating_sub(1) as BlockNumber)
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<BlockRef, RelayError> {
        let state = self.state.lock().unwrap();
        state
            .chain
            .get(number as usize)
            .map(|b| b.block.clone())
            .ok_or(RelayError::BlockNotFound(number))
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockRef, RelayError> {
        let state = self.state.lock().unwrap();
        state
            .headers
            .get(&hash)
            .cloned()
            .ok_or_else(|| RelayError::Ledger(format!("Unknown block {hash:?}")))
    }

    async fn transaction(&self, id: TxId) -> Result<LedgerTransaction, RelayError> {
        let state = self.state.lock().unwrap();
        state
            .txs
            .get(&id)
            .cloned()
            .ok_or(RelayError::TransactionNotFound(id))
    }

    async fn logs(
        &self,
        address: Address,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogEntry>, RelayError> {
        if address != self.log_address {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        let mut entries = Vec::new();
        for sim in &state.chain {
            if sim.block.number < from || sim.block.number > to {
                continue;
            }
            for tx in &sim.txs {
                entries.push(LogEntry {
                    source_tx: tx.id,
                    block_number: sim.block.number,
                    block_hash: sim.block.hash,
                });
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl CommandLog for SimulatedLedger {
    fn log_address(&self) -> Address {
        self.log_address
    }

    async fn created_block(&self) -> Result<BlockNumber, RelayError> {
        Ok(self.created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> SimulatedLedger {
        SimulatedLedger::new(Address::repeat_byte(0x10), 1_700_000_000)
    }

    #[tokio::test]
    async fn test_genesis_block_exists() {
        let ledger = ledger();
        assert_eq!(ledger.block_number().await.unwrap(), 0);
        let genesis = ledger.block_by_number(0).await.unwrap();
        assert_eq!(genesis.timestamp, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_push_command_emits_log_entry() {
        let ledger = ledger();
        let tx = ledger.push_command(Address::repeat_byte(0xEE), None, &[0x01]);
        let entries = ledger
            .logs(ledger.log_address(), 0, 10)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_tx, tx);
        assert_eq!(entries[0].block_number, 1);
    }

    #[tokio::test]
    async fn test_logs_for_other_address_are_empty() {
        let ledger = ledger();
        ledger.push_command(Address::repeat_byte(0xEE), None, &[0x01]);
        let entries = ledger
            .logs(Address::repeat_byte(0x99), 0, 10)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_reorg_replaces_suffix_with_fresh_hashes() {
        let ledger = ledger();
        let tx = ledger.push_command(Address::repeat_byte(0xEE), None, &[0x01]);
        let old_tip = ledger.block_by_number(1).await.unwrap();

        ledger.reorg_from(1);

        let new_tip = ledger.block_by_number(1).await.unwrap();
        assert_ne!(old_tip.hash, new_tip.hash);
        assert_eq!(new_tip.parent_hash, old_tip.parent_hash);
        // The command's log entry is gone from the canonical chain.
        let entries = ledger.logs(ledger.log_address(), 0, 10).await.unwrap();
        assert!(entries.is_empty());
        // But the transaction is still served by hash.
        assert!(ledger.transaction(tx).await.is_ok());
        // And the chain grew past the old tip.
        assert!(ledger.block_number().await.unwrap() > 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let ledger = ledger();
        let clone = ledger.clone();
        ledger.push_block();
        assert_eq!(clone.block_number().await.unwrap(), 1);
    }
}
