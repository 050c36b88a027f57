//! # In-Memory Confirmation Registry
//!
//! Write-once source→target outcome mapping plus the `last` resume
//! checkpoint, deployed at a fixed deterministic address. Durable across
//! sessions via a JSON file; deliberately NOT rolled back by sandbox
//! reverts, so a confirmation written before a reorg survives the rollback.

use crate::domain::{Address, ConfirmationOutcome, RelayError, TxId};
use crate::ports::ConfirmationRegistry;
use async_trait::async_trait;
use primitive_types::H160;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Deterministic registry deployment address.
pub const REGISTRY_ADDRESS: Address = H160([0x52; 20]);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RegistryState {
    deployed: bool,
    /// Raw 32-byte outcome values by source command id.
    entries: HashMap<TxId, TxId>,
    /// Most recently written key.
    last: Option<TxId>,
}

/// Shared-handle registry; clones observe the same mapping.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl InMemoryRegistry {
    /// Create an undeployed registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted state from `path`, or start empty if absent.
    pub fn load_or_new(path: &Path) -> Result<Self, RelayError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Registry(format!("Read {}: {e}", path.display())))?;
        let state: RegistryState = serde_json::from_str(&raw)
            .map_err(|e| RelayError::Registry(format!("Parse {}: {e}", path.display())))?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Persist the mapping to `path`.
    pub fn save(&self, path: &Path) -> Result<(), RelayError> {
        let raw = serde_json::to_string_pretty(&*self.state.lock().unwrap())
            .map_err(|e| RelayError::Registry(format!("Serialize registry: {e}")))?;
        std::fs::write(path, raw)
            .map_err(|e| RelayError::Registry(format!("Write {}: {e}", path.display())))
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Whether no entry has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConfirmationRegistry for InMemoryRegistry {
    async fn ensure_deployed(&self) -> Result<Address, RelayError> {
        // Idempotent: deploying twice is a no-op at the same address.
        self.state.lock().unwrap().deployed = true;
        Ok(REGISTRY_ADDRESS)
    }

    async fn outcome(&self, source_tx: TxId) -> Result<ConfirmationOutcome, RelayError> {
        let state = self.state.lock().unwrap();
        if !state.deployed {
            return Err(RelayError::Registry("Registry not deployed".to_string()));
        }
        Ok(ConfirmationOutcome::from_raw(
            state.entries.get(&source_tx).copied(),
        ))
    }

    async fn last_confirmed(&self) -> Result<Option<TxId>, RelayError> {
        let state = self.state.lock().unwrap();
        if !state.deployed {
            return Err(RelayError::Registry("Registry not deployed".to_string()));
        }
        Ok(state.last)
    }

    async fn record(
        &self,
        source_tx: TxId,
        outcome: ConfirmationOutcome,
    ) -> Result<(), RelayError> {
        let raw = outcome
            .to_raw()
            .ok_or_else(|| RelayError::Registry("Cannot record Unset".to_string()))?;
        let mut state = self.state.lock().unwrap();
        if !state.deployed {
            return Err(RelayError::Registry("Registry not deployed".to_string()));
        }
        if state.entries.contains_key(&source_tx) {
            return Err(RelayError::AlreadyConfirmed(source_tx));
        }
        state.entries.insert(source_tx, raw);
        state.last = Some(source_tx);
        Ok(())
    }
}
