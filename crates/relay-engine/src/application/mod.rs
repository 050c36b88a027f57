//! Application layer: the four-phase command executor and the relay
//! coordinator that drives it.

pub mod executor;
pub mod service;

pub use executor::CommandExecutor;
pub use service::RelayService;
