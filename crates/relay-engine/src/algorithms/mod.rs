//! # Algorithms Module
//!
//! Call-data decoding, backfill planning, and canonical-chain
//! reconciliation.

pub mod backfill;
pub mod decode;
pub mod reconcile;

pub use backfill::*;
pub use decode::*;
pub use reconcile::*;
