//! Tally Simulator
//!
//! Drives one ledger engine with scripted scenarios or random concurrent load
//! and audits the ledger invariants afterwards.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_ledger::{LedgerConfig, LedgerEngine};

mod controller;
mod metrics;
mod scenario;

use controller::{SimulationConfig, SimulationController};
use scenario::Scenario;

/// Tally Simulator CLI
///
/// Load flags only apply to random load runs and are rejected alongside
/// `--scenario`.
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Tally ledger scenario and load simulator")]
struct Args {
    /// Number of accounts to create for load runs
    #[arg(short, long, default_value = "4", conflicts_with = "scenario")]
    accounts: usize,

    /// Amount deposited into each account before load starts
    #[arg(long, default_value = "1000", conflicts_with = "scenario")]
    initial_deposit: i64,

    /// Concurrent workers
    #[arg(short, long, default_value = "4", conflicts_with = "scenario")]
    workers: usize,

    /// Operations per worker
    #[arg(short, long, default_value = "1000", conflicts_with = "scenario")]
    operations: usize,

    /// Largest amount magnitude generated
    #[arg(long, default_value = "500", conflicts_with = "scenario")]
    max_amount: i64,

    /// Share of operations that are deposits rather than transfers
    #[arg(long, default_value = "0.2", conflicts_with = "scenario")]
    deposit_ratio: f64,

    /// Built-in scenario name or path to a JSON scenario file
    #[arg(short, long)]
    scenario: Option<String>,

    /// Random seed for reproducibility
    #[arg(long, conflicts_with = "scenario")]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            accounts: self.accounts,
            initial_deposit: self.initial_deposit,
            workers: self.workers,
            operations: self.operations,
            max_amount: self.max_amount,
            deposit_ratio: self.deposit_ratio,
            seed: self.seed,
        }
    }
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    ));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    info!("Starting Tally Simulator");

    let ledger_config = LedgerConfig::from_env();
    if let Err(e) = ledger_config.validate() {
        error!(error = %e, "Invalid ledger configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let engine = Arc::new(LedgerEngine::with_config(ledger_config));
    let controller = SimulationController::new(args.simulation_config(), engine);

    let metrics = if let Some(scenario_name) = &args.scenario {
        let scenario = Scenario::load(scenario_name)?;
        controller.run_scenario(&scenario)?
    } else {
        let config = args.simulation_config();
        if let Err(e) = config.validate() {
            error!(error = %e, "Invalid simulation configuration");
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }

        controller.initialize()?;
        controller.run_load().await?
    };

    let report = controller.audit()?;

    info!("Simulation complete");
    info!("Attempted: {}", metrics.attempted);
    info!(
        "Committed: {} ({} deposits, {} transfers)",
        metrics.committed, metrics.deposits, metrics.transfers
    );
    for (code, count) in &metrics.rejected {
        info!("Rejected {}: {}", code, count);
    }
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    info!(
        accounts = report.accounts,
        transactions = report.transactions,
        total_balance = %report.total_balance,
        "Ledger consistent"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&controller.engine().account_views())?
    );

    Ok(())
}
