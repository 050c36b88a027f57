//! # Restart and Resume Flows
//!
//! A relay process stopping and starting again: cursor derivation from
//! the confirmation registry, JSON persistence of sandbox and registry
//! state, and idempotence across sessions.

#[cfg(test)]
mod tests {
    use relay_engine::{
        Address, InMemoryRegistry, LocalSandbox, RelayApi, RelayConfig, RelayService,
        SimulatedLedger,
    };

    const GENESIS_TS: u64 = 1_700_000_000;

    fn origin() -> Address {
        Address::repeat_byte(0xEE)
    }

    fn target() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn seeded_ledger() -> SimulatedLedger {
        let ledger = SimulatedLedger::new(Address::repeat_byte(0x10), GENESIS_TS);
        ledger.push_command(origin(), Some(target()), &[0x01]);
        ledger.push_command(origin(), None, &[0x02]);
        ledger.push_block();
        ledger.push_block();
        ledger
    }

    fn service_over(
        ledger: &SimulatedLedger,
        sandbox: &LocalSandbox,
        registry: &InMemoryRegistry,
    ) -> RelayService<SimulatedLedger, LocalSandbox, InMemoryRegistry> {
        RelayService::new(
            ledger.clone(),
            sandbox.clone(),
            registry.clone(),
            RelayConfig::for_testing(),
        )
    }

    #[tokio::test]
    async fn test_restart_resumes_from_last_confirmed() {
        let ledger = seeded_ledger();
        let sandbox = LocalSandbox::new(Address::repeat_byte(0xC0));
        let registry = InMemoryRegistry::new();
        sandbox.set_code(target(), vec![0x60]);

        let mut first = service_over(&ledger, &sandbox, &registry);
        first.bootstrap().await.unwrap();
        let report = first.backfill().await.unwrap();
        assert_eq!(report.executed, 2);
        drop(first);

        // The second session starts at the last confirmed command's block,
        // not back at the log's creation block.
        let mut second = service_over(&ledger, &sandbox, &registry);
        let cursor = second.bootstrap().await.unwrap();
        assert_eq!(cursor, 2);

        let rerun = second.backfill().await.unwrap();
        assert_eq!(rerun.executed, 0);
        assert_eq!(rerun.skipped, 1);
        assert_eq!(sandbox.journal().len(), 2);
    }

    #[tokio::test]
    async fn test_state_persists_across_process_restart() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox_path = dir.path().join("sandbox.json");
        let registry_path = dir.path().join("registry.json");
        let controller = Address::repeat_byte(0xC0);

        let ledger = seeded_ledger();
        {
            let sandbox = LocalSandbox::load_or_new(controller, &sandbox_path).unwrap();
            let registry = InMemoryRegistry::load_or_new(&registry_path).unwrap();
            sandbox.set_code(target(), vec![0x60]);

            let mut service = service_over(&ledger, &sandbox, &registry);
            service.bootstrap().await.unwrap();
            service.backfill().await.unwrap();

            sandbox.save(&sandbox_path).unwrap();
            registry.save(&registry_path).unwrap();
        }

        // Reload from disk as a fresh process would.
        let sandbox = LocalSandbox::load_or_new(controller, &sandbox_path).unwrap();
        let registry = InMemoryRegistry::load_or_new(&registry_path).unwrap();
        assert_eq!(sandbox.journal().len(), 2);
        assert_eq!(registry.len(), 2);

        let mut service = service_over(&ledger, &sandbox, &registry);
        service.bootstrap().await.unwrap();
        let rerun = service.backfill().await.unwrap();
        assert_eq!(rerun.executed, 0);
        assert_eq!(sandbox.journal().len(), 2);
    }

    #[tokio::test]
    async fn test_lost_local_state_replays_full_history() {
        let ledger = seeded_ledger();
        let sandbox = LocalSandbox::new(Address::repeat_byte(0xC0));
        let registry = InMemoryRegistry::new();
        sandbox.set_code(target(), vec![0x60]);

        let mut first = service_over(&ledger, &sandbox, &registry);
        first.bootstrap().await.unwrap();
        first.backfill().await.unwrap();
        drop(first);

        // A wiped target environment and registry gets a full replay; the
        // registry is the only idempotence source.
        let fresh_sandbox = LocalSandbox::new(Address::repeat_byte(0xC0));
        let fresh_registry = InMemoryRegistry::new();
        fresh_sandbox.set_code(target(), vec![0x60]);

        let mut second = service_over(&ledger, &fresh_sandbox, &fresh_registry);
        let cursor = second.bootstrap().await.unwrap();
        assert_eq!(cursor, 0);

        let rerun = second.backfill().await.unwrap();
        assert_eq!(rerun.executed, 2);
        assert_eq!(fresh_sandbox.journal().len(), 2);
    }
}
