//! # Historical Backfill Flows
//!
//! Full sync of a pre-existing command history: ordering across decode
//! batches, the confirmation horizon, rejection of calls to non-contract
//! targets, and contract creation inside the sandbox.

#[cfg(test)]
mod tests {
    use relay_engine::{
        Address, ConfirmationOutcome, ConfirmationRegistry, InMemoryRegistry, LocalSandbox,
        RelayApi, RelayConfig, RelayService, SimulatedLedger,
    };

    const GENESIS_TS: u64 = 1_700_000_000;

    fn log_address() -> Address {
        Address::repeat_byte(0x10)
    }

    fn origin() -> Address {
        Address::repeat_byte(0xEE)
    }

    fn target() -> Address {
        Address::repeat_byte(0xAA)
    }

    /// Fresh shared adapters plus a service owning clones of them.
    fn harness() -> (
        RelayService<SimulatedLedger, LocalSandbox, InMemoryRegistry>,
        SimulatedLedger,
        LocalSandbox,
        InMemoryRegistry,
    ) {
        let ledger = SimulatedLedger::new(log_address(), GENESIS_TS);
        let sandbox = LocalSandbox::new(Address::repeat_byte(0xC0));
        let registry = InMemoryRegistry::new();
        let service = RelayService::new(
            ledger.clone(),
            sandbox.clone(),
            registry.clone(),
            RelayConfig::for_testing(),
        );
        (service, ledger, sandbox, registry)
    }

    /// Push empty blocks past the test config's confirmation depth (2).
    fn confirm(ledger: &SimulatedLedger) {
        ledger.push_block();
        ledger.push_block();
    }

    #[tokio::test]
    async fn test_backfill_mixed_command_history() {
        let (mut service, ledger, sandbox, registry) = harness();
        sandbox.set_code(target(), vec![0x60, 0x00]);

        let call = ledger.push_command(origin(), Some(target()), &[0x11, 0x22]);
        let create = ledger.push_command(origin(), None, &[0x60, 0x60, 0x52]);
        let bad_call = ledger.push_command(origin(), Some(Address::repeat_byte(0xBB)), &[0x33]);
        confirm(&ledger);

        service.bootstrap().await.unwrap();
        let report = service.backfill().await.unwrap();

        assert_eq!(report.entries, 3);
        assert_eq!(report.executed, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.abandoned, 0);

        // Only the two valid commands reached the journal, in source order.
        let journal = sandbox.journal();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].to, Some(target()));
        assert_eq!(journal[0].data, vec![0x11, 0x22]);
        assert_eq!(journal[1].to, None);

        // Every command got a registry verdict, good or bad.
        assert!(matches!(
            registry.outcome(call).await.unwrap(),
            ConfirmationOutcome::Confirmed(_)
        ));
        assert!(matches!(
            registry.outcome(create).await.unwrap(),
            ConfirmationOutcome::Confirmed(_)
        ));
        assert_eq!(
            registry.outcome(bad_call).await.unwrap(),
            ConfirmationOutcome::Rejected
        );

        // Sandbox time advanced once per command (plus the bootstrap anchor),
        // rejection included.
        assert_eq!(sandbox.mined_blocks().len(), 4);
    }

    #[tokio::test]
    async fn test_backfill_batching_preserves_source_order() {
        let (mut service, ledger, sandbox, _registry) = harness();
        sandbox.set_code(target(), vec![0x60]);

        // Seven commands across three decode batches (test batch size 3).
        for i in 0u8..7 {
            ledger.push_command(origin(), Some(target()), &[i]);
        }
        confirm(&ledger);

        service.bootstrap().await.unwrap();
        let report = service.backfill().await.unwrap();
        assert_eq!(report.executed, 7);

        let payloads: Vec<u8> = sandbox.journal().iter().map(|tx| tx.data[0]).collect();
        assert_eq!(payloads, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_commands_above_horizon_wait_for_confirmation() {
        let (mut service, ledger, sandbox, _registry) = harness();
        sandbox.set_code(target(), vec![0x60]);

        ledger.push_command(origin(), Some(target()), &[0x01]);
        confirm(&ledger);
        // This one sits inside the confirmation depth.
        ledger.push_command(origin(), Some(target()), &[0x02]);

        service.bootstrap().await.unwrap();
        let report = service.backfill().await.unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(sandbox.journal().len(), 1);

        // Once buried deep enough, a second pass picks it up and skips
        // what was already confirmed.
        confirm(&ledger);
        let second = service.backfill().await.unwrap();
        assert_eq!(second.executed, 1);
        assert_eq!(second.skipped, 1);

        let payloads: Vec<u8> = sandbox.journal().iter().map(|tx| tx.data[0]).collect();
        assert_eq!(payloads, vec![0x01, 0x02]);
    }

    #[tokio::test]
    async fn test_creation_deploys_callable_code() {
        let (mut service, ledger, sandbox, _registry) = harness();

        let payload = vec![0xFE, 0xED, 0xC0, 0xDE];
        ledger.push_command(origin(), None, &payload);
        confirm(&ledger);

        service.bootstrap().await.unwrap();
        service.backfill().await.unwrap();

        // The creation landed as code at a fresh sandbox address.
        let deployed: Vec<Address> = sandbox
            .state()
            .code
            .into_iter()
            .filter(|(_, code)| *code == payload)
            .map(|(address, _)| address)
            .collect();
        assert_eq!(deployed.len(), 1);

        // A later call against that address is accepted, not rejected.
        ledger.push_command(origin(), Some(deployed[0]), &[0x99]);
        confirm(&ledger);
        let report = service.backfill().await.unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(report.rejected, 0);
    }

    #[tokio::test]
    async fn test_origin_is_whitelisted_before_apply() {
        let (mut service, ledger, sandbox, _registry) = harness();
        let other = Address::repeat_byte(0xDD);

        ledger.push_command(origin(), None, &[0x01]);
        ledger.push_command(other, None, &[0x02]);
        confirm(&ledger);

        service.bootstrap().await.unwrap();
        service.backfill().await.unwrap();

        let state = sandbox.state();
        assert!(state.whitelist.contains(&origin()));
        assert!(state.whitelist.contains(&other));
        assert_eq!(sandbox.journal()[0].from, origin());
        assert_eq!(sandbox.journal()[1].from, other);
    }
}
