//! # Call Data Decoding
//!
//! Recovers relay commands from source transactions. The Command Log event
//! itself carries no payload; the relay call's ABI shape is
//! `(address to, bytes data)` behind a 4-byte selector, and the zero
//! address stands for "deploy a new contract".

use crate::domain::{Address, CallData, Command, LogEntry, RelayError};
use crate::ports::LedgerClient;
use futures::future::try_join_all;

/// ABI word size in bytes.
const WORD: usize = 32;

/// Selector prefix length in bytes.
const SELECTOR: usize = 4;

/// Decode the relay call `(address to, bytes data)` from raw call data.
pub fn decode_relay_call(input: &[u8]) -> Result<CallData, RelayError> {
    let params = input
        .get(SELECTOR..)
        .ok_or_else(|| RelayError::Decode("Call data shorter than selector".to_string()))?;
    if params.len() < 2 * WORD {
        return Err(RelayError::Decode(format!(
            "Call data too short for two head words: {} bytes",
            params.len()
        )));
    }

    // Head word 0: address, right-aligned in its word.
    let to_word = &params[..WORD];
    if to_word[..WORD - 20].iter().any(|b| *b != 0) {
        return Err(RelayError::Decode("Address word has dirty upper bytes".to_string()));
    }
    let to = Address::from_slice(&to_word[WORD - 20..]);
    let to = if to.is_zero() { None } else { Some(to) };

    // Head word 1: byte offset of the bytes tail, relative to params start.
    let offset = read_usize_word(&params[WORD..2 * WORD])?;
    let len_start = offset;
    let len_end = offset
        .checked_add(WORD)
        .ok_or_else(|| RelayError::Decode("Bytes offset overflow".to_string()))?;
    let len_word = params
        .get(len_start..len_end)
        .ok_or_else(|| RelayError::Decode("Bytes offset out of range".to_string()))?;
    let data_len = read_usize_word(len_word)?;
    let data_end = len_end
        .checked_add(data_len)
        .ok_or_else(|| RelayError::Decode("Bytes length overflow".to_string()))?;
    let data = params
        .get(len_end..data_end)
        .ok_or_else(|| RelayError::Decode("Bytes tail out of range".to_string()))?
        .to_vec();

    Ok(CallData { to, data })
}

/// Read a 32-byte big-endian word that must fit in usize.
fn read_usize_word(word: &[u8]) -> Result<usize, RelayError> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(RelayError::Decode("ABI word exceeds usize".to_string()));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(raw) as usize)
}

/// ABI-encode a relay call; test and simulation helper, the inverse of
/// [`decode_relay_call`].
pub fn encode_relay_call(to: Option<Address>, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; SELECTOR];
    let mut word = [0u8; WORD];
    if let Some(addr) = to {
        word[WORD - 20..].copy_from_slice(addr.as_bytes());
    }
    out.extend_from_slice(&word);
    // Offset of the bytes tail: two head words.
    out.extend_from_slice(&usize_word(2 * WORD));
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(data);
    // Pad the tail to a word boundary as the ABI does.
    let pad = (WORD - data.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(pad));
    out
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Assemble the full command for one log entry.
///
/// Requires two extra ledger reads per entry: the originating transaction
/// (origin, call data) and its block (timestamp).
pub async fn command_from_log<L: LedgerClient>(
    ledger: &L,
    entry: &LogEntry,
) -> Result<Command, RelayError> {
    let tx = ledger.transaction(entry.source_tx).await?;
    let block = ledger.block_by_number(entry.block_number).await?;
    let call = decode_relay_call(&tx.input)?;
    Ok(Command::assemble(&tx, call.to, call.data, &block))
}

/// Decode a batch of log entries concurrently, preserving order.
///
/// Any failed read or malformed call data fails the whole batch; backfill
/// treats that as fatal.
pub async fn decode_batch<L: LedgerClient>(
    ledger: &L,
    entries: &[LogEntry],
) -> Result<Vec<Command>, RelayError> {
    try_join_all(entries.iter().map(|entry| command_from_log(ledger, entry))).await
}
