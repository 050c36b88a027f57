//! # Domain Value Objects
//!
//! Immutable values exchanged between the relay and its ports.

use primitive_types::{H160, H256};
use serde::{Deserialize, Serialize};

/// Account address on either chain (20 bytes).
pub type Address = H160;

/// Transaction identifier (32-byte hash).
pub type TxId = H256;

/// Block hash (32 bytes).
pub type BlockHash = H256;

/// Block height on the source ledger.
pub type BlockNumber = u64;

/// Sandbox-issued snapshot identifier.
pub type SnapshotId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Header of a source-ledger block, as retained by the reconciliation window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block height.
    pub number: BlockNumber,
    /// Block hash.
    pub hash: BlockHash,
    /// Parent block hash.
    pub parent_hash: BlockHash,
    /// Block timestamp.
    pub timestamp: Timestamp,
}

/// One Command Log event occurrence.
///
/// The event carries no payload; the payload is recovered from the
/// originating transaction's call data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Transaction that emitted the event.
    pub source_tx: TxId,
    /// Block the transaction was mined in.
    pub block_number: BlockNumber,
    /// Hash of that block (disambiguates reorged duplicates).
    pub block_hash: BlockHash,
}

/// A source-ledger transaction, as read back from the ledger client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction hash.
    pub id: TxId,
    /// Sender account.
    pub from: Address,
    /// Raw call data.
    pub input: Vec<u8>,
    /// Block the transaction was mined in.
    pub block_number: BlockNumber,
}

/// ABI-decoded relay call extracted from a transaction's call data.
///
/// `to == None` is the contract-creation sentinel (the ABI zero address).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallData {
    /// Destination address on the target environment.
    pub to: Option<Address>,
    /// Opaque byte string to execute.
    pub data: Vec<u8>,
}

/// Transaction submitted to the execution sandbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    /// Impersonated sender (must be whitelisted first).
    pub from: Address,
    /// Destination, or `None` to deploy a new contract.
    pub to: Option<Address>,
    /// Call data.
    pub data: Vec<u8>,
    /// Gas limit.
    pub gas: u64,
}
