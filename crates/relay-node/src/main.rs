//! # Relay Node
//!
//! Operator binary for the relay synchronization engine. Wires a source
//! ledger client, the local execution sandbox, and the confirmation
//! registry into the relay service, backfills confirmed history, then
//! follows the ledger live until Ctrl+C.
//!
//! Sandbox and registry state persist as JSON under the data directory,
//! so a restarted node resumes from its last confirmed command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_engine::{
    Address, CommandLog, InMemoryRegistry, JsonRpcLedger, LedgerClient, LocalSandbox, RelayApi,
    RelayConfig, RelayService, SimulatedLedger,
};

/// Identity the sandbox attributes administrative actions to.
const CONTROLLER: Address = primitive_types::H160(*b"relay-node-contro001");

/// Replays source-ledger commands onto a local target environment.
#[derive(Parser, Debug)]
#[command(name = "relay-node")]
#[command(about = "Replays source-ledger commands onto a local target environment")]
struct Args {
    /// Source ledger JSON-RPC endpoint
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    endpoint: String,

    /// Command Log contract address on the source ledger (hex)
    #[arg(short, long)]
    log_address: Option<String>,

    /// Directory for persisted sandbox and registry state
    #[arg(short, long, default_value = "relay-data")]
    data_dir: PathBuf,

    /// Seconds between live reconciliation polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Confirmation depth bounding the backfill horizon
    #[arg(long)]
    confirmation_depth: Option<u64>,

    /// Run against a built-in simulated ledger (no endpoint required)
    #[arg(long)]
    simulate: bool,
}

fn parse_address(raw: &str) -> Result<Address> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(stripped).context("Address is not valid hex")?;
    if bytes.len() != 20 {
        bail!("Address must be 20 bytes, got {}", bytes.len());
    }
    Ok(Address::from_slice(&bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut config = RelayConfig::default();
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
    }
    if let Some(depth) = args.confirmation_depth {
        config.confirmation_depth = depth;
    }

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Creating data directory {}", args.data_dir.display()))?;
    let sandbox_path = args.data_dir.join("sandbox.json");
    let registry_path = args.data_dir.join("registry.json");

    let sandbox =
        LocalSandbox::load_or_new(CONTROLLER, &sandbox_path).context("Loading sandbox state")?;
    let registry =
        InMemoryRegistry::load_or_new(&registry_path).context("Loading confirmation registry")?;

    if args.simulate {
        let ledger = seeded_simulation(&sandbox, config.confirmation_depth);
        spawn_block_producer(ledger.clone(), config.poll_interval_secs);
        run(ledger, sandbox, registry, config, &sandbox_path, &registry_path).await
    } else {
        let Some(raw) = args.log_address.as_deref() else {
            bail!("--log-address is required unless --simulate is set");
        };
        let log_address = parse_address(raw)?;
        let ledger = JsonRpcLedger::new(args.endpoint, log_address);
        run(ledger, sandbox, registry, config, &sandbox_path, &registry_path).await
    }
}

/// Bootstrap, backfill, and follow the ledger live; persist state on exit.
async fn run<L>(
    ledger: L,
    sandbox: LocalSandbox,
    registry: InMemoryRegistry,
    config: RelayConfig,
    sandbox_path: &Path,
    registry_path: &Path,
) -> Result<()>
where
    L: LedgerClient + CommandLog,
{
    let mut service = RelayService::new(ledger, sandbox.clone(), registry.clone(), config);

    let cursor = service.bootstrap().await.context("Bootstrap failed")?;
    info!(cursor, "Relay node starting");

    let report = service.backfill().await.context("Backfill failed")?;
    info!(
        from = report.from_block,
        to = report.to_block,
        entries = report.entries,
        executed = report.executed,
        rejected = report.rejected,
        skipped = report.skipped,
        abandoned = report.abandoned,
        "Backfill finished"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    info!("Following the ledger live. Press Ctrl+C to stop.");
    let outcome = service.run_live(shutdown_rx).await;

    // Persist before surfacing any live-loop error so a restart resumes
    // from everything confirmed so far.
    sandbox.save(sandbox_path).context("Persisting sandbox state")?;
    registry
        .save(registry_path)
        .context("Persisting confirmation registry")?;

    let status = service.status();
    info!(
        executed = status.executed,
        rejected = status.rejected,
        skipped = status.skipped,
        abandoned = status.abandoned,
        rolled_back = status.rolled_back,
        "Relay node stopped"
    );

    outcome.context("Live reconciliation failed")?;
    Ok(())
}

/// A small scripted chain for demo runs: two calls against a deployed
/// target, one contract creation, padded past the confirmation horizon.
fn seeded_simulation(sandbox: &LocalSandbox, depth: u64) -> SimulatedLedger {
    let log_address = Address::repeat_byte(0x10);
    let origin = Address::repeat_byte(0xEE);
    let target = Address::repeat_byte(0xAA);
    sandbox.set_code(target, vec![0x60, 0x00]);

    let ledger = SimulatedLedger::new(log_address, 1_700_000_000);
    ledger.push_command(origin, Some(target), &[0x01, 0x02]);
    ledger.push_command(origin, None, &[0x60, 0x60, 0x52]);
    ledger.push_command(origin, Some(target), &[0x03]);
    for _ in 0..depth {
        ledger.push_block();
    }
    ledger
}

/// Keep the simulated chain growing so the live loop has work: one block
/// per poll interval, with a command every third block.
fn spawn_block_producer(ledger: SimulatedLedger, interval_secs: u64) {
    let origin = Address::repeat_byte(0xEE);
    let target = Address::repeat_byte(0xAA);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        let mut height = 0u64;
        loop {
            interval.tick().await;
            height += 1;
            if height % 3 == 0 {
                ledger.push_command(origin, Some(target), &height.to_be_bytes());
            } else {
                ledger.push_block();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_with_prefix() {
        let parsed = parse_address("0x1010101010101010101010101010101010101010").unwrap();
        assert_eq!(parsed, Address::repeat_byte(0x10));
    }

    #[test]
    fn test_parse_address_rejects_short_input() {
        assert!(parse_address("0x1234").is_err());
    }
}
