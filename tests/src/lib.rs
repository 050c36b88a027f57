//! # Chain-Relay Test Suite
//!
//! Unified test crate covering cross-module scenarios end to end:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Full relay flows over the simulated ledger
//!     ├── backfill_flow.rs   # Historical sync up to the horizon
//!     ├── live_flow.rs       # Live reconciliation and reorg rollback
//!     └── resume_flow.rs     # Restart, persistence, and idempotence
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p relay-tests
//!
//! # By category
//! cargo test -p relay-tests integration::
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
