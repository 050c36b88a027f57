//! # Command Executor
//!
//! Per-command state machine: skip check, snapshot, whitelist + apply (or
//! reject), advance time. Phases run strictly in order and none is skipped.

use crate::domain::{
    Command, ConfirmationOutcome, ExecutionOutcome, RelayError, SnapshotTable, TxRequest,
};
use crate::ports::{ConfirmationRegistry, ExecutionSandbox};
use tracing::{debug, info};

/// Executes one decoded command against the sandbox and registry.
pub struct CommandExecutor<'a, S, R> {
    sandbox: &'a S,
    registry: &'a R,
    gas_limit: u64,
}

impl<'a, S: ExecutionSandbox, R: ConfirmationRegistry> CommandExecutor<'a, S, R> {
    /// Create an executor over the given sandbox and registry.
    pub fn new(sandbox: &'a S, registry: &'a R, gas_limit: u64) -> Self {
        Self {
            sandbox,
            registry,
            gas_limit,
        }
    }

    /// Run the four-phase machine for one command.
    ///
    /// Phase 1 makes duplicate delivery and restarts no-ops. A snapshot is
    /// always captured before any mutation so a later removal notification
    /// can roll the command back. Errors from phases 2-4 propagate to the
    /// caller, which logs them and abandons the command; no confirmation is
    /// written in that case, so a retry stays safe.
    pub async fn execute(
        &self,
        cmd: &Command,
        snapshots: &mut SnapshotTable,
    ) -> Result<ExecutionOutcome, RelayError> {
        // Phase 1: skip check.
        if self.registry.outcome(cmd.source_tx).await?.is_set() {
            debug!(source_tx = ?cmd.source_tx, "Command already confirmed, skipping");
            return Ok(ExecutionOutcome::Skipped);
        }

        // Phase 2: snapshot before any mutation.
        let snapshot = self.sandbox.snapshot().await?;
        snapshots.record(cmd.source_tx, snapshot);

        // Phase 3: whitelist the origin, then apply or reject.
        self.sandbox.whitelist(cmd.origin).await?;

        let outcome = if let Some(target) = cmd.target {
            if self.sandbox.code_at(target).await?.is_empty() {
                // Call data sent to a non-contract address is invalid.
                info!(source_tx = ?cmd.source_tx, ?target, "Rejecting command: no code at target");
                self.registry
                    .record(cmd.source_tx, ConfirmationOutcome::Rejected)
                    .await?;
                ExecutionOutcome::Rejected
            } else {
                self.apply(cmd, Some(target)).await?
            }
        } else {
            // Contract creation: the no-code check does not apply.
            self.apply(cmd, None).await?
        };

        // Phase 4: advance target time, also for rejected commands.
        self.sandbox.mine(cmd.timestamp).await?;

        Ok(outcome)
    }

    async fn apply(
        &self,
        cmd: &Command,
        to: Option<crate::domain::Address>,
    ) -> Result<ExecutionOutcome, RelayError> {
        let target_tx = self
            .sandbox
            .submit(TxRequest {
                from: cmd.origin,
                to,
                data: cmd.payload.clone(),
                gas: self.gas_limit,
            })
            .await?;
        self.registry
            .record(cmd.source_tx, ConfirmationOutcome::Confirmed(target_tx))
            .await?;
        debug!(source_tx = ?cmd.source_tx, ?target_tx, "Command confirmed");
        Ok(ExecutionOutcome::Confirmed(target_tx))
    }
}
