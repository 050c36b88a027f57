//! # Live Reconciliation Flows
//!
//! The relay following a growing chain: applying freshly mined commands,
//! rolling back reorged ones, and re-executing their replacements on the
//! winning fork.

#[cfg(test)]
mod tests {
    use relay_engine::{
        Address, ConfirmationOutcome, ConfirmationRegistry, InMemoryRegistry, LocalSandbox,
        RelayApi, RelayConfig, RelayService, SimulatedLedger,
    };

    const GENESIS_TS: u64 = 1_700_000_000;

    fn origin() -> Address {
        Address::repeat_byte(0xEE)
    }

    fn target() -> Address {
        Address::repeat_byte(0xAA)
    }

    /// A bootstrapped, backfilled service over an otherwise empty chain,
    /// ready to observe live blocks.
    async fn live_harness() -> (
        RelayService<SimulatedLedger, LocalSandbox, InMemoryRegistry>,
        SimulatedLedger,
        LocalSandbox,
        InMemoryRegistry,
    ) {
        let ledger = SimulatedLedger::new(Address::repeat_byte(0x10), GENESIS_TS);
        let sandbox = LocalSandbox::new(Address::repeat_byte(0xC0));
        let registry = InMemoryRegistry::new();
        sandbox.set_code(target(), vec![0x60]);

        let mut service = RelayService::new(
            ledger.clone(),
            sandbox.clone(),
            registry.clone(),
            RelayConfig::for_testing(),
        );
        service.bootstrap().await.unwrap();
        service.backfill().await.unwrap();
        (service, ledger, sandbox, registry)
    }

    #[tokio::test]
    async fn test_live_commands_applied_across_polls() {
        let (mut service, ledger, sandbox, _registry) = live_harness().await;

        ledger.push_command(origin(), Some(target()), &[0x01]);
        assert_eq!(service.poll_once().await.unwrap(), 1);

        ledger.push_block();
        ledger.push_command(origin(), Some(target()), &[0x02]);
        // One empty block and one command: two deltas, one execution.
        assert_eq!(service.poll_once().await.unwrap(), 1);

        let payloads: Vec<u8> = sandbox.journal().iter().map(|tx| tx.data[0]).collect();
        assert_eq!(payloads, vec![0x01, 0x02]);
        assert_eq!(service.status().executed, 2);
    }

    #[tokio::test]
    async fn test_reorg_rolls_back_then_reexecutes_replacement() {
        let (mut service, ledger, sandbox, _registry) = live_harness().await;

        ledger.push_command(origin(), Some(target()), &[0x01]);
        service.poll_once().await.unwrap();
        assert_eq!(sandbox.journal().len(), 1);

        // The fork drops the command's block; the next poll reverts it.
        ledger.reorg_from(1);
        service.poll_once().await.unwrap();
        assert_eq!(service.status().rolled_back, 1);
        assert!(sandbox.journal().is_empty());

        // The sender re-submits on the winning fork.
        ledger.push_command(origin(), Some(target()), &[0x01]);
        service.poll_once().await.unwrap();
        assert_eq!(sandbox.journal().len(), 1);
        assert_eq!(service.status().executed, 2);
    }

    #[tokio::test]
    async fn test_deep_reorg_rolls_back_in_reverse_order() {
        let (mut service, ledger, sandbox, _registry) = live_harness().await;
        let baseline = sandbox.state();

        ledger.push_command(origin(), Some(target()), &[0x01]);
        ledger.push_command(origin(), None, &[0x02]);
        service.poll_once().await.unwrap();
        assert_eq!(sandbox.journal().len(), 2);

        // Both command blocks fall out of the canon at once.
        ledger.reorg_from(1);
        service.poll_once().await.unwrap();

        assert_eq!(service.status().rolled_back, 2);
        // Unwinding newest-first lands exactly on the pre-command state.
        assert_eq!(sandbox.state(), baseline);
    }

    #[tokio::test]
    async fn test_rejected_command_rolls_back_its_mined_block() {
        let (mut service, ledger, sandbox, registry) = live_harness().await;
        let blocks_before = sandbox.mined_blocks().len();

        // No code at this target: rejected, but time still advances.
        let tx = ledger.push_command(origin(), Some(Address::repeat_byte(0xBB)), &[0x01]);
        service.poll_once().await.unwrap();
        assert_eq!(service.status().rejected, 1);
        assert_eq!(sandbox.mined_blocks().len(), blocks_before + 1);

        ledger.reorg_from(1);
        service.poll_once().await.unwrap();
        assert_eq!(sandbox.mined_blocks().len(), blocks_before);

        // The rejection verdict outlives the rollback.
        assert_eq!(
            registry.outcome(tx).await.unwrap(),
            ConfirmationOutcome::Rejected
        );
    }

    #[tokio::test]
    async fn test_confirmation_outlives_rollback_as_stale() {
        let (mut service, ledger, _sandbox, registry) = live_harness().await;

        let tx = ledger.push_command(origin(), Some(target()), &[0x01]);
        service.poll_once().await.unwrap();

        ledger.reorg_from(1);
        service.poll_once().await.unwrap();

        // Registry writes are durable; the rollback leaves this one stale.
        assert!(registry.outcome(tx).await.unwrap().is_set());
        assert_eq!(registry.last_confirmed().await.unwrap(), Some(tx));
    }
}
