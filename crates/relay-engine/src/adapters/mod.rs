//! # Adapters Layer (Hexagonal Architecture)
//!
//! Concrete implementations of the outbound ports: a programmable
//! simulated ledger, the local execution sandbox, the in-memory
//! confirmation registry, and a JSON-RPC ledger client.

mod local_sandbox;
mod registry;
mod rpc_ledger;
mod sim_ledger;

pub use local_sandbox::{ExecutedTx, LocalSandbox, MinedBlock, SandboxState};
pub use registry::{InMemoryRegistry, REGISTRY_ADDRESS};
pub use rpc_ledger::JsonRpcLedger;
pub use sim_ledger::SimulatedLedger;
