//! # Relay Service
//!
//! The coordinator: owns the snapshot table and the reconciliation window,
//! derives the resume cursor, drives historical backfill, and runs the live
//! poll loop. All sandbox mutation flows through this service's single call
//! chain; one head's deltas are fully applied before the next tick is
//! looked at.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::algorithms::{
    batch_entries, capped_to_block, command_from_log, decode_batch, BackfillReport, ChainDelta,
    ChainTracker, TrackedBlock,
};
use crate::application::executor::CommandExecutor;
use crate::config::RelayConfig;
use crate::domain::{
    invariant_ascending_order, BlockNumber, BlockRef, Command, ExecutionOutcome, LogEntry,
    RelayError, SnapshotTable,
};
use crate::ports::{
    CommandLog, ConfirmationRegistry, ExecutionSandbox, LedgerClient, RelayApi, RelayStatus,
};

/// Relay coordinator over a ledger, a sandbox, and a registry.
pub struct RelayService<L, S, R> {
    ledger: L,
    sandbox: S,
    registry: R,
    config: RelayConfig,
    snapshots: SnapshotTable,
    tracker: ChainTracker,
    status: RelayStatus,
    /// Last block covered by backfill; the live walk stops above it.
    live_floor: BlockNumber,
    bootstrapped: bool,
}

impl<L, S, R> RelayService<L, S, R>
where
    L: LedgerClient + CommandLog,
    S: ExecutionSandbox,
    R: ConfirmationRegistry,
{
    /// Wire a service; call [`RelayApi::bootstrap`] before anything else.
    pub fn new(ledger: L, sandbox: S, registry: R, config: RelayConfig) -> Self {
        let tracker = ChainTracker::new(config.retained_window);
        Self {
            ledger,
            sandbox,
            registry,
            config,
            snapshots: SnapshotTable::new(),
            tracker,
            status: RelayStatus::default(),
            live_floor: 0,
            bootstrapped: false,
        }
    }

    /// Number of retained pre-execution snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Run one reconciliation step: fetch the head, diff it against the
    /// retained window, and apply the resulting deltas in order. Returns
    /// the number of deltas applied. `run_live` drives this on a timer.
    pub async fn poll_once(&mut self) -> Result<usize, RelayError> {
        let head = self.ledger.block_number().await?;
        self.status.head_seen = self.status.head_seen.max(head);

        if self.tracker.is_empty() && head <= self.live_floor {
            return Ok(0);
        }
        let head_block = self.ledger.block_by_number(head).await?;
        if self.tracker.contains(&head_block.hash) {
            return Ok(0);
        }

        let suffix = self.canonical_suffix(head_block).await?;
        let deltas = self.tracker.observe(suffix)?;
        let applied = deltas.len();

        for delta in deltas {
            match delta {
                ChainDelta::Removed(entry) => self.rollback(&entry).await?,
                ChainDelta::Added(entry) => {
                    // The window already retains this head and never re-emits
                    // an entry, so a failed read is contained per command
                    // rather than aborting the remaining deltas.
                    let outcome = match command_from_log(&self.ledger, &entry).await {
                        Ok(command) => self.execute_logged(&command).await,
                        Err(e) => {
                            error!(
                                source_tx = ?entry.source_tx,
                                error = %e,
                                "Command abandoned"
                            );
                            ExecutionOutcome::Abandoned
                        }
                    };
                    self.tally(&outcome);
                }
            }
        }
        Ok(applied)
    }

    /// Walk the canonical chain backwards from the head until it attaches
    /// to the retained window (or reaches the live floor), collecting each
    /// block's Command Log entries on the way.
    ///
    /// The walk may cover more blocks than the window retains: quiet gaps
    /// between polls still attach at the window's tip, and the window
    /// evicts down to capacity after the deltas are emitted. Descending to
    /// the oldest retained height without attaching means the fork point
    /// lies below the window, which `observe` resolves or rejects.
    async fn canonical_suffix(
        &self,
        head_block: BlockRef,
    ) -> Result<Vec<TrackedBlock>, RelayError> {
        let log_address = self.ledger.log_address();
        let oldest_retained = self.tracker.oldest().map(|b| b.number);
        let mut suffix = VecDeque::new();
        let mut block = head_block;
        loop {
            let entries: Vec<LogEntry> = self
                .ledger
                .logs(log_address, block.number, block.number)
                .await?
                .into_iter()
                .filter(|e| e.block_hash == block.hash)
                .collect();
            let number = block.number;
            let parent = block.parent_hash;
            suffix.push_front(TrackedBlock { block, entries });

            if number <= self.live_floor + 1 || self.tracker.contains(&parent) {
                break;
            }
            if oldest_retained.is_some_and(|oldest| number <= oldest) {
                break;
            }
            block = self.ledger.block_by_hash(parent).await?;
        }
        Ok(suffix.into())
    }

    /// Revert the sandbox to the state captured immediately before the
    /// removed command was applied. A missing snapshot means the command
    /// was never seen as added this session and is a fatal consistency
    /// violation.
    async fn rollback(&mut self, entry: &LogEntry) -> Result<(), RelayError> {
        let snapshot = self.snapshots.take(entry.source_tx)?;
        if self.registry.outcome(entry.source_tx).await?.is_set() {
            // Registry writes are durable; the reorg leaves this entry
            // stale. Surfaced for the operator rather than silently undone.
            warn!(
                source_tx = ?entry.source_tx,
                "Confirmation predates the reorg and is left in place"
            );
        }
        self.sandbox.revert(snapshot).await?;
        self.status.rolled_back += 1;
        info!(
            source_tx = ?entry.source_tx,
            block = entry.block_number,
            "Rolled back removed command"
        );
        Ok(())
    }

    /// Execute one command, mapping phase failures to an abandonment.
    async fn execute_logged(&mut self, command: &Command) -> ExecutionOutcome {
        let executor =
            CommandExecutor::new(&self.sandbox, &self.registry, self.config.tx_gas_limit);
        match executor.execute(command, &mut self.snapshots).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(source_tx = ?command.source_tx, error = %e, "Command abandoned");
                ExecutionOutcome::Abandoned
            }
        }
    }

    fn tally(&mut self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Confirmed(_) => self.status.executed += 1,
            ExecutionOutcome::Rejected => self.status.rejected += 1,
            ExecutionOutcome::Skipped => self.status.skipped += 1,
            ExecutionOutcome::Abandoned => self.status.abandoned += 1,
        }
    }
}

#[async_trait]
impl<L, S, R> RelayApi for RelayService<L, S, R>
where
    L: LedgerClient + CommandLog,
    S: ExecutionSandbox,
    R: ConfirmationRegistry,
{
    async fn bootstrap(&mut self) -> Result<BlockNumber, RelayError> {
        let registry_address = self.registry.ensure_deployed().await?;
        let created = self.ledger.created_block().await?;
        let creation_block = self.ledger.block_by_number(created).await?;

        // Anchor target-environment time to the Command Log's creation
        // time before any command lands.
        self.sandbox.mine(creation_block.timestamp).await?;

        // The registry is the durable checkpoint: resume from the block of
        // the last confirmed command, else from the log's creation block.
        let cursor = match self.registry.last_confirmed().await? {
            Some(last) => self.ledger.transaction(last).await?.block_number,
            None => created,
        };

        self.status.cursor = cursor;
        self.bootstrapped = true;
        info!(
            ?registry_address,
            created, cursor, "Relay bootstrapped"
        );
        Ok(cursor)
    }

    async fn backfill(&mut self) -> Result<BackfillReport, RelayError> {
        debug_assert!(self.bootstrapped, "bootstrap before backfill");
        let cursor = self.status.cursor;
        let head = self.ledger.block_number().await?;
        self.status.head_seen = self.status.head_seen.max(head);

        let to = capped_to_block(head, self.config.confirmation_depth);
        self.live_floor = to.max(cursor.saturating_sub(1));
        if to < cursor {
            info!(cursor, head, "Nothing to backfill below the confirmation horizon");
            return Ok(BackfillReport::new(cursor, to));
        }

        let entries = self
            .ledger
            .logs(self.ledger.log_address(), cursor, to)
            .await?;
        invariant_ascending_order(&entries)?;

        let mut report = BackfillReport::new(cursor, to);
        let batches = batch_entries(entries, self.config.decode_batch_size);
        let total = batches.len();
        info!(cursor, to, batches = total, "Starting backfill");

        for (index, batch) in batches.into_iter().enumerate() {
            // Decode fan-out is concurrent; a failed read aborts the sync.
            let commands = decode_batch(&self.ledger, &batch).await?;
            // Execution stays strictly sequential to preserve ordering.
            for command in &commands {
                let outcome = self.execute_logged(command).await;
                self.tally(&outcome);
                report.tally(&outcome);
            }
            info!(
                batch = index + 1,
                batches = total,
                executed = report.executed,
                rejected = report.rejected,
                skipped = report.skipped,
                "Backfill progress"
            );
        }

        info!(
            from = report.from_block,
            to = report.to_block,
            entries = report.entries,
            "Backfill complete"
        );
        Ok(report)
    }

    async fn run_live(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), RelayError> {
        self.status.live = true;
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        info!(
            interval_secs = self.config.poll_interval_secs,
            floor = self.live_floor,
            "Entering live reconciliation"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Live loop shutting down");
                        break;
                    }
                }
                _ = interval.tick() => {
                    match self.poll_once().await {
                        Ok(applied) if applied > 0 => {
                            debug!(applied, "Applied reconciliation deltas");
                        }
                        Ok(_) => {}
                        Err(e @ RelayError::MissingSnapshot(_)) => {
                            self.status.live = false;
                            return Err(e);
                        }
                        Err(e) => {
                            warn!(error = %e, "Live poll failed, retrying next tick");
                        }
                    }
                }
            }
        }

        self.status.live = false;
        Ok(())
    }

    fn status(&self) -> RelayStatus {
        self.status.clone()
    }
}
