//! # Local Execution Sandbox
//!
//! In-memory target environment: an account/code map, an executed-tx
//! journal, mined blocks with monotone timestamps, a whitelist of
//! impersonable origins, and a snapshot stack with full-state revert.
//! State (minus snapshots) persists to disk as JSON between sessions.

use crate::domain::{
    Address, RelayError, SnapshotId, Timestamp, TxId, TxRequest,
};
use crate::ports::ExecutionSandbox;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One transaction applied to the sandbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedTx {
    /// Target transaction id.
    pub id: TxId,
    /// Impersonated sender.
    pub from: Address,
    /// Destination, or `None` for a deployment.
    pub to: Option<Address>,
    /// Call data.
    pub data: Vec<u8>,
    /// Gas limit it was submitted with.
    pub gas: u64,
}

/// One mined target block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedBlock {
    /// Block height.
    pub number: u64,
    /// Block timestamp (clamped monotone).
    pub timestamp: Timestamp,
}

/// Snapshottable sandbox state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxState {
    /// Deployed bytecode by address.
    pub code: HashMap<Address, Vec<u8>>,
    /// Applied transactions, in order.
    pub journal: Vec<ExecutedTx>,
    /// Mined blocks, in order.
    pub blocks: Vec<MinedBlock>,
    /// Origins accepted for impersonation.
    pub whitelist: HashSet<Address>,
    /// Monotone counter for transaction ids and deployment addresses.
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct Inner {
    state: SandboxState,
    /// Snapshot stack; revert consumes the snapshot and everything above it.
    snapshots: Vec<(SnapshotId, SandboxState)>,
    next_snapshot: SnapshotId,
}

/// Shared-handle local sandbox; clones observe the same environment.
#[derive(Clone, Debug)]
pub struct LocalSandbox {
    controller: Address,
    inner: Arc<Mutex<Inner>>,
}

impl LocalSandbox {
    /// Create an empty sandbox controlled by `controller`.
    pub fn new(controller: Address) -> Self {
        Self {
            controller,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Load persisted state from `path`, or start empty if absent.
    pub fn load_or_new(controller: Address, path: &Path) -> Result<Self, RelayError> {
        if !path.exists() {
            return Ok(Self::new(controller));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Sandbox(format!("Read {}: {e}", path.display())))?;
        let state: SandboxState = serde_json::from_str(&raw)
            .map_err(|e| RelayError::Sandbox(format!("Parse {}: {e}", path.display())))?;
        let sandbox = Self::new(controller);
        sandbox.inner.lock().unwrap().state = state;
        Ok(sandbox)
    }

    /// Persist the current state (snapshots excluded) to `path`.
    pub fn save(&self, path: &Path) -> Result<(), RelayError> {
        let raw = serde_json::to_string_pretty(&self.inner.lock().unwrap().state)
            .map_err(|e| RelayError::Sandbox(format!("Serialize sandbox state: {e}")))?;
        std::fs::write(path, raw)
            .map_err(|e| RelayError::Sandbox(format!("Write {}: {e}", path.display())))
    }

    /// Deploy bytecode directly; test and bootstrap helper.
    pub fn set_code(&self, address: Address, code: Vec<u8>) {
        self.inner.lock().unwrap().state.code.insert(address, code);
    }

    /// Snapshot of the whole state for assertions.
    pub fn state(&self) -> SandboxState {
        self.inner.lock().unwrap().state.clone()
    }

    /// Applied transactions, in order.
    pub fn journal(&self) -> Vec<ExecutedTx> {
        self.inner.lock().unwrap().state.journal.clone()
    }

    /// Mined blocks, in order.
    pub fn mined_blocks(&self) -> Vec<MinedBlock> {
        self.inner.lock().unwrap().state.blocks.clone()
    }

    fn deployment_address(sequence: u64) -> Address {
        let mut raw = [0u8; 20];
        raw[..4].copy_from_slice(&[0xC0, 0xDE, 0x00, 0x00]);
        raw[12..].copy_from_slice(&sequence.to_be_bytes());
        Address::from(raw)
    }
}

#[async_trait]
impl ExecutionSandbox for LocalSandbox {
    async fn submit(&self, tx: TxRequest) -> Result<TxId, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.whitelist.contains(&tx.from) {
            return Err(RelayError::Sandbox(format!(
                "Origin {:?} is not whitelisted",
                tx.from
            )));
        }
        inner.state.sequence += 1;
        let sequence = inner.state.sequence;
        let id = TxId::from_low_u64_be(0xBEEF_0000_0000 + sequence);
        if tx.to.is_none() {
            // Deployment: the payload stands in for the deployed code.
            let address = Self::deployment_address(sequence);
            inner.state.code.insert(address, tx.data.clone());
            debug!(?address, "Deployed contract");
        }
        inner.state.journal.push(ExecutedTx {
            id,
            from: tx.from,
            to: tx.to,
            data: tx.data,
            gas: tx.gas,
        });
        Ok(id)
    }

    async fn mine(&self, timestamp: Timestamp) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        let last = inner.state.blocks.last().map(|b| b.timestamp).unwrap_or(0);
        let number = inner.state.blocks.len() as u64;
        inner.state.blocks.push(MinedBlock {
            number,
            // Target time never moves backwards.
            timestamp: timestamp.max(last),
        });
        Ok(())
    }

    async fn snapshot(&self) -> Result<SnapshotId, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_snapshot += 1;
        let id = inner.next_snapshot;
        let state = inner.state.clone();
        inner.snapshots.push((id, state));
        Ok(id)
    }

    async fn revert(&self, snapshot: SnapshotId) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner
            .snapshots
            .iter()
            .position(|(id, _)| *id == snapshot)
            .ok_or_else(|| RelayError::Sandbox(format!("Unknown snapshot {snapshot}")))?;
        let (_, state) = inner.snapshots.drain(position..).next().expect("position valid");
        inner.state = state;
        Ok(())
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, RelayError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .state
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn whitelist(&self, address: Address) -> Result<(), RelayError> {
        self.inner.lock().unwrap().state.whitelist.insert(address);
        Ok(())
    }

    async fn controller(&self) -> Result<Address, RelayError> {
        Ok(self.controller)
    }
}
