//! # JSON-RPC Ledger Client
//!
//! `LedgerClient` + `CommandLog` over an Ethereum-style JSON-RPC endpoint.

use crate::domain::{
    Address, BlockHash, BlockNumber, BlockRef, LedgerTransaction, LogEntry, RelayError, TxId,
};
use crate::ports::{CommandLog, LedgerClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::sync::atomic::{AtomicU64, Ordering};

/// JSON-RPC 2.0 client for the source ledger.
pub struct JsonRpcLedger {
    client: reqwest::Client,
    url: String,
    log_address: Address,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: String,
    hash: String,
    parent_hash: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: String,
    from: String,
    input: String,
    block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    transaction_hash: String,
    block_number: String,
    block_hash: String,
}

impl JsonRpcLedger {
    /// Connect to a source ledger endpoint watching one Command Log.
    pub fn new(url: impl Into<String>, log_address: Address) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            log_address,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RelayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Ledger(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| RelayError::Ledger(format!("{method}: {e}")))?;
        if let Some(err) = response.error {
            return Err(RelayError::Ledger(format!(
                "{method}: RPC error {}: {}",
                err.code, err.message
            )));
        }
        response
            .result
            .ok_or_else(|| RelayError::Ledger(format!("{method}: empty result")))
    }

    fn block_ref(block: RpcBlock) -> Result<BlockRef, RelayError> {
        Ok(BlockRef {
            number: parse_quantity(&block.number)?,
            hash: parse_h256(&block.hash)?,
            parent_hash: parse_h256(&block.parent_hash)?,
            timestamp: parse_quantity(&block.timestamp)?,
        })
    }
}

/// Hex-encode a block number the way the RPC expects it.
pub fn to_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Parse a 0x-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, RelayError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| RelayError::Ledger(format!("Quantity without 0x prefix: {raw}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| RelayError::Ledger(format!("Bad quantity {raw}: {e}")))
}

/// Parse 0x-prefixed hex bytes.
pub fn parse_bytes(raw: &str) -> Result<Vec<u8>, RelayError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| RelayError::Ledger(format!("Bytes without 0x prefix: {raw}")))?;
    hex::decode(digits).map_err(|e| RelayError::Ledger(format!("Bad hex {raw}: {e}")))
}

/// Parse a 0x-prefixed 32-byte hash.
pub fn parse_h256(raw: &str) -> Result<TxId, RelayError> {
    let bytes = parse_bytes(raw)?;
    if bytes.len() != 32 {
        return Err(RelayError::Ledger(format!("Expected 32 bytes, got {}", bytes.len())));
    }
    Ok(TxId::from_slice(&bytes))
}

/// Parse a 0x-prefixed 20-byte address.
pub fn parse_h160(raw: &str) -> Result<Address, RelayError> {
    let bytes = parse_bytes(raw)?;
    if bytes.len() != 20 {
        return Err(RelayError::Ledger(format!("Expected 20 bytes, got {}", bytes.len())));
    }
    Ok(Address::from_slice(&bytes))
}

/// 4-byte ABI selector for a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn block_number(&self) -> Result<BlockNumber, RelayError> {
        let raw: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<BlockRef, RelayError> {
        let block: Option<RpcBlock> = self
            .call("eth_getBlockByNumber", json!([to_quantity(number), false]))
            .await?;
        Self::block_ref(block.ok_or(RelayError::BlockNotFound(number))?)
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockRef, RelayError> {
        let block: Option<RpcBlock> = self
            .call(
                "eth_getBlockByHash",
                json!([format!("{hash:#x}"), false]),
            )
            .await?;
        Self::block_ref(block.ok_or_else(|| RelayError::Ledger(format!("Unknown block {hash:?}")))?)
    }

    async fn transaction(&self, id: TxId) -> Result<LedgerTransaction, RelayError> {
        let tx: Option<RpcTransaction> = self
            .call("eth_getTransactionByHash", json!([format!("{id:#x}")]))
            .await?;
        let tx = tx.ok_or(RelayError::TransactionNotFound(id))?;
        let block_number = tx
            .block_number
            .as_deref()
            .ok_or_else(|| RelayError::Ledger(format!("Transaction {} is pending", tx.hash)))?;
        Ok(LedgerTransaction {
            id: parse_h256(&tx.hash)?,
            from: parse_h160(&tx.from)?,
            input: parse_bytes(&tx.input)?,
            block_number: parse_quantity(block_number)?,
        })
    }

    async fn logs(
        &self,
        address: Address,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogEntry>, RelayError> {
        let logs: Vec<RpcLog> = self
            .call(
                "eth_getLogs",
                json!([{
                    "address": format!("{address:#x}"),
                    "fromBlock": to_quantity(from),
                    "toBlock": to_quantity(to),
                }]),
            )
            .await?;
        logs.into_iter()
            .map(|log| {
                Ok(LogEntry {
                    source_tx: parse_h256(&log.transaction_hash)?,
                    block_number: parse_quantity(&log.block_number)?,
                    block_hash: parse_h256(&log.block_hash)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CommandLog for JsonRpcLedger {
    fn log_address(&self) -> Address {
        self.log_address
    }

    async fn created_block(&self) -> Result<BlockNumber, RelayError> {
        let data = format!("0x{}", hex::encode(selector("created()")));
        let raw: String = self
            .call(
                "eth_call",
                json!([{
                    "to": format!("{:#x}", self.log_address),
                    "data": data,
                }, "latest"]),
            )
            .await
            .map_err(|e| RelayError::Startup(format!("Command Log has no created(): {e}")))?;
        let word = parse_h256(&raw).map_err(|e| {
            RelayError::Startup(format!("Command Log created() returned junk: {e}"))
        })?;
        Ok(word.to_low_u64_be())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_roundtrip() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(100), "0x64");
        assert_eq!(parse_quantity("0x64").unwrap(), 100);
        assert!(parse_quantity("64").is_err());
    }

    #[test]
    fn test_parse_h256_rejects_short_input() {
        assert!(parse_h256("0x1234").is_err());
        let raw = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_h256(&raw).unwrap(), TxId::repeat_byte(0xAB));
    }

    #[test]
    fn test_parse_h160() {
        let raw = format!("0x{}", "cd".repeat(20));
        assert_eq!(parse_h160(&raw).unwrap(), Address::repeat_byte(0xCD));
    }

    #[test]
    fn test_parse_bytes_empty() {
        assert!(parse_bytes("0x").unwrap().is_empty());
    }

    #[test]
    fn test_selector_is_four_bytes_and_stable() {
        let a = selector("created()");
        let b = selector("created()");
        assert_eq!(a, b);
        assert_ne!(a, selector("destroyed()"));
    }
}
