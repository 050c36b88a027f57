//! # Integration Scenarios
//!
//! End-to-end relay flows driven through the simulated ledger, the local
//! sandbox, and the in-memory registry. Each scenario owns clones of the
//! shared adapters so it can mutate the chain while the service runs.

pub mod backfill_flow;
pub mod live_flow;
pub mod resume_flow;
