//! # Outbound Ports
//!
//! Traits for the relay's external collaborators: the source ledger, the
//! command log contract, the execution sandbox, and the confirmation
//! registry.

use crate::domain::{
    Address, BlockHash, BlockNumber, BlockRef, ConfirmationOutcome, LedgerTransaction, LogEntry,
    RelayError, SnapshotId, Timestamp, TxId, TxRequest,
};
use async_trait::async_trait;

/// Read-only source ledger client - outbound port.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current head block number.
    async fn block_number(&self) -> Result<BlockNumber, RelayError>;

    /// Fetch a block header by number (canonical chain).
    async fn block_by_number(&self, number: BlockNumber) -> Result<BlockRef, RelayError>;

    /// Fetch a block header by hash (works for reorged-away blocks too,
    /// as long as the ledger still serves them).
    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockRef, RelayError>;

    /// Fetch a transaction by id.
    async fn transaction(&self, id: TxId) -> Result<LedgerTransaction, RelayError>;

    /// Fetch Command Log events emitted by `address` in a closed block
    /// range, in log order.
    async fn logs(
        &self,
        address: Address,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogEntry>, RelayError>;
}

/// Command Log contract - outbound port.
///
/// The events carry no payload; payload is recovered from the originating
/// transaction's call data.
#[async_trait]
pub trait CommandLog: Send + Sync {
    /// Address of the Command Log contract on the source ledger.
    fn log_address(&self) -> Address;

    /// Block the contract was created in. Missing on chain is a fatal
    /// startup error.
    async fn created_block(&self) -> Result<BlockNumber, RelayError>;
}

/// Local execution sandbox - outbound port.
///
/// The sandbox trusts the relay operator: whitelisted origins may be
/// impersonated without a private key.
#[async_trait]
pub trait ExecutionSandbox: Send + Sync {
    /// Submit a transaction; resolves once a receipt hash is available.
    async fn submit(&self, tx: TxRequest) -> Result<TxId, RelayError>;

    /// Mine a new block stamped with `timestamp`.
    async fn mine(&self, timestamp: Timestamp) -> Result<(), RelayError>;

    /// Capture the current state.
    async fn snapshot(&self) -> Result<SnapshotId, RelayError>;

    /// Revert to a snapshot, discarding all later state.
    async fn revert(&self, snapshot: SnapshotId) -> Result<(), RelayError>;

    /// Deployed bytecode at an address (empty if none).
    async fn code_at(&self, address: Address) -> Result<Vec<u8>, RelayError>;

    /// Accept impersonated transactions from this origin.
    async fn whitelist(&self, address: Address) -> Result<(), RelayError>;

    /// The sandbox's controlling account.
    async fn controller(&self) -> Result<Address, RelayError>;
}

/// Confirmation Registry contract - outbound port.
#[async_trait]
pub trait ConfirmationRegistry: Send + Sync {
    /// Deploy the registry at its deterministic address if absent;
    /// idempotent. Returns the registry address.
    async fn ensure_deployed(&self) -> Result<Address, RelayError>;

    /// Outcome recorded for a source command, if any.
    async fn outcome(&self, source_tx: TxId) -> Result<ConfirmationOutcome, RelayError>;

    /// The most recently written key, used as the resume checkpoint.
    async fn last_confirmed(&self) -> Result<Option<TxId>, RelayError>;

    /// Record an outcome. Write-once per key; recording `Unset` or
    /// overwriting an existing entry is an error.
    async fn record(&self, source_tx: TxId, outcome: ConfirmationOutcome)
        -> Result<(), RelayError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted ledger for unit tests.
#[derive(Default)]
pub struct MockLedger {
    /// Canonical chain, index = block number.
    pub blocks: Vec<BlockRef>,
    /// Transactions by id.
    pub txs: HashMap<TxId, LedgerTransaction>,
    /// Command Log entries across the whole chain.
    pub entries: Vec<LogEntry>,
    /// Command Log contract address.
    pub address: Address,
    /// Command Log creation block.
    pub created: BlockNumber,
    /// Should fail?
    pub should_fail: bool,
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn block_number(&self) -> Result<BlockNumber, RelayError> {
        if self.should_fail {
            return Err(RelayError::Ledger("Mock failure".to_string()));
        }
        Ok(self.blocks.len().saturating_sub(1) as BlockNumber)
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<BlockRef, RelayError> {
        if self.should_fail {
            return Err(RelayError::Ledger("Mock failure".to_string()));
        }
        self.blocks
            .get(number as usize)
            .cloned()
            .ok_or(RelayError::BlockNotFound(number))
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockRef, RelayError> {
        self.blocks
            .iter()
            .find(|b| b.hash == hash)
            .cloned()
            .ok_or_else(|| RelayError::Ledger(format!("Unknown block {hash:?}")))
    }

    async fn transaction(&self, id: TxId) -> Result<LedgerTransaction, RelayError> {
        if self.should_fail {
            return Err(RelayError::Ledger("Mock failure".to_string()));
        }
        self.txs
            .get(&id)
            .cloned()
            .ok_or(RelayError::TransactionNotFound(id))
    }

    async fn logs(
        &self,
        _address: Address,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogEntry>, RelayError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.block_number >= from && e.block_number <= to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommandLog for MockLedger {
    fn log_address(&self) -> Address {
        self.address
    }

    async fn created_block(&self) -> Result<BlockNumber, RelayError> {
        if self.should_fail {
            return Err(RelayError::Startup("Mock failure".to_string()));
        }
        Ok(self.created)
    }
}

/// Recording sandbox for unit tests.
#[derive(Default)]
pub struct MockSandbox {
    /// Deployed code by address.
    pub code: Mutex<HashMap<Address, Vec<u8>>>,
    /// Submitted transactions, in order.
    pub submitted: Mutex<Vec<TxRequest>>,
    /// Mined block timestamps, in order.
    pub mined: Mutex<Vec<Timestamp>>,
    /// Snapshots handed out so far.
    pub snapshots: Mutex<Vec<SnapshotId>>,
    /// Reverts performed, in order.
    pub reverted: Mutex<Vec<SnapshotId>>,
    /// Whitelisted origins.
    pub whitelisted: Mutex<Vec<Address>>,
    /// Should fail?
    pub should_fail: bool,
}

impl MockSandbox {
    /// Deploy code at an address for rejection-check tests.
    pub fn set_code(&self, address: Address, code: Vec<u8>) {
        self.code.lock().unwrap().insert(address, code);
    }
}

#[async_trait]
impl ExecutionSandbox for MockSandbox {
    async fn submit(&self, tx: TxRequest) -> Result<TxId, RelayError> {
        if self.should_fail {
            return Err(RelayError::Sandbox("Mock failure".to_string()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(tx);
        Ok(TxId::from_low_u64_be(0xBEEF_0000 + submitted.len() as u64))
    }

    async fn mine(&self, timestamp: Timestamp) -> Result<(), RelayError> {
        if self.should_fail {
            return Err(RelayError::Sandbox("Mock failure".to_string()));
        }
        self.mined.lock().unwrap().push(timestamp);
        Ok(())
    }

    async fn snapshot(&self) -> Result<SnapshotId, RelayError> {
        if self.should_fail {
            return Err(RelayError::Sandbox("Mock failure".to_string()));
        }
        let mut snapshots = self.snapshots.lock().unwrap();
        let id = snapshots.len() as SnapshotId + 1;
        snapshots.push(id);
        Ok(id)
    }

    async fn revert(&self, snapshot: SnapshotId) -> Result<(), RelayError> {
        self.reverted.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, RelayError> {
        Ok(self
            .code
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn whitelist(&self, address: Address) -> Result<(), RelayError> {
        self.whitelisted.lock().unwrap().push(address);
        Ok(())
    }

    async fn controller(&self) -> Result<Address, RelayError> {
        Ok(Address::repeat_byte(0xC0))
    }
}

/// In-memory registry double for unit tests.
#[derive(Default)]
pub struct MockRegistry {
    /// Raw outcome values by command id.
    pub entries: Mutex<HashMap<TxId, TxId>>,
    /// Resume checkpoint.
    pub last: Mutex<Option<TxId>>,
    /// Should fail?
    pub should_fail: bool,
}

#[async_trait]
impl ConfirmationRegistry for MockRegistry {
    async fn ensure_deployed(&self) -> Result<Address, RelayError> {
        if self.should_fail {
            return Err(RelayError::Startup("Mock failure".to_string()));
        }
        Ok(Address::repeat_byte(0x52))
    }

    async fn outcome(&self, source_tx: TxId) -> Result<ConfirmationOutcome, RelayError> {
        let raw = self.entries.lock().unwrap().get(&source_tx).copied();
        Ok(ConfirmationOutcome::from_raw(raw))
    }

    async fn last_confirmed(&self) -> Result<Option<TxId>, RelayError> {
        Ok(*self.last.lock().unwrap())
    }

    async fn record(
        &self,
        source_tx: TxId,
        outcome: ConfirmationOutcome,
    ) -> Result<(), RelayError> {
        if self.should_fail {
            return Err(RelayError::Registry("Mock failure".to_string()));
        }
        let raw = outcome
            .to_raw()
            .ok_or_else(|| RelayError::Registry("Cannot record Unset".to_string()))?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&source_tx) {
            return Err(RelayError::AlreadyConfirmed(source_tx));
        }
        entries.insert(source_tx, raw);
        *self.last.lock().unwrap() = Some(source_tx);
        Ok(())
    }
}
