//! Simulation controller.

use std::sync::Arc;

use anyhow::bail;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use tally_ledger::{IntegrityReport, LedgerEngine};

use crate::metrics::SimulationMetrics;
use crate::scenario::Scenario;

/// Load generation settings.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of accounts to create.
    pub accounts: usize,
    /// Amount deposited into every account before load starts.
    pub initial_deposit: i64,
    /// Concurrent workers.
    pub workers: usize,
    /// Operations issued by each worker.
    pub operations: usize,
    /// Upper bound on the magnitude of generated amounts.
    pub max_amount: i64,
    /// Share of operations that are deposits/withdrawals rather than transfers.
    pub deposit_ratio: f64,
    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accounts: 4,
            initial_deposit: 1_000,
            workers: 4,
            operations: 1_000,
            max_amount: 500,
            deposit_ratio: 0.2,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.accounts < 2 {
            return Err("At least 2 accounts are needed for transfers".to_string());
        }

        if self.workers == 0 {
            return Err("Worker count cannot be 0".to_string());
        }

        if self.initial_deposit < 0 {
            return Err("Initial deposit cannot be negative".to_string());
        }

        if self.max_amount <= 0 {
            return Err("Maximum amount must be positive".to_string());
        }

        if !(0.0..=1.0).contains(&self.deposit_ratio) {
            return Err("Deposit ratio must be between 0 and 1".to_string());
        }

        Ok(())
    }
}

/// Controls the simulation.
pub struct SimulationController {
    /// Load settings.
    config: SimulationConfig,
    /// Ledger under test.
    engine: Arc<LedgerEngine>,
    /// Names of the simulated accounts.
    accounts: Arc<Vec<String>>,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(config: SimulationConfig, engine: Arc<LedgerEngine>) -> Self {
        let accounts = (1..=config.accounts).map(|i| format!("ACC_{}", i)).collect();

        Self {
            config,
            engine,
            accounts: Arc::new(accounts),
        }
    }

    /// Create and fund the simulated accounts.
    pub fn initialize(&self) -> anyhow::Result<()> {
        info!(
            accounts = self.accounts.len(),
            initial_deposit = self.config.initial_deposit,
            "Initializing simulation"
        );

        for name in self.accounts.iter() {
            self.engine.create_account(name)?;
            if self.config.initial_deposit > 0 {
                self.engine.add_funds(name, self.config.initial_deposit)?;
            }
        }

        Ok(())
    }

    /// Run a scenario.
    pub fn run_scenario(&self, scenario: &Scenario) -> anyhow::Result<SimulationMetrics> {
        info!(scenario = %scenario.name, description = %scenario.description, "Running scenario");

        let mut metrics = SimulationMetrics::new();
        scenario.run(&self.engine, &mut metrics)?;
        Ok(metrics)
    }

    /// Run random deposits and transfers from concurrent workers.
    pub async fn run_load(&self) -> anyhow::Result<SimulationMetrics> {
        let mut seeder = match self.config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        info!(
            workers = self.config.workers,
            operations = self.config.operations,
            "Running load"
        );

        let mut handles = Vec::with_capacity(self.config.workers);
        for worker in 0..self.config.workers {
            let rng = StdRng::seed_from_u64(seeder.gen());
            let engine = self.engine.clone();
            let accounts = self.accounts.clone();
            let config = self.config.clone();

            handles.push(tokio::spawn(async move {
                run_worker(worker, rng, engine, accounts, config).await
            }));
        }

        let mut metrics = SimulationMetrics::new();
        for handle in handles {
            metrics.merge(&handle.await?);
        }

        info!(
            attempted = metrics.attempted,
            committed = metrics.committed,
            rejected = metrics.rejected_total(),
            "Load complete"
        );

        Ok(metrics)
    }

    /// Audit the ledger; fails if any invariant is violated.
    pub fn audit(&self) -> anyhow::Result<IntegrityReport> {
        let report = self.engine.verify_integrity();

        if !report.is_consistent() {
            bail!(
                "Ledger integrity violated: {} negative balances, {} unknown accounts, transfer residual {}",
                report.negative_balances.len(),
                report.unknown_accounts.len(),
                report.transfer_residual
            );
        }

        Ok(report)
    }

    /// Ledger under simulation.
    pub fn engine(&self) -> &Arc<LedgerEngine> {
        &self.engine
    }
}

async fn run_worker(
    worker: usize,
    mut rng: StdRng,
    engine: Arc<LedgerEngine>,
    accounts: Arc<Vec<String>>,
    config: SimulationConfig,
) -> SimulationMetrics {
    let mut metrics = SimulationMetrics::new();

    for _ in 0..config.operations {
        let from = &accounts[rng.gen_range(0..accounts.len())];
        let amount = rng.gen_range(-config.max_amount..=config.max_amount);

        if rng.gen_bool(config.deposit_ratio) {
            match engine.add_funds(from, amount) {
                Ok(_) => metrics.record_deposit(),
                Err(e) => {
                    debug!(worker, account = %from, amount, error = %e, "Deposit rejected");
                    metrics.record_rejection(&e);
                }
            }
        } else {
            let to = &accounts[rng.gen_range(0..accounts.len())];
            match engine.move_funds(from, to, amount) {
                Ok(_) => metrics.record_transfer(),
                Err(e) => {
                    debug!(worker, from = %from, to = %to, amount, error = %e, "Transfer rejected");
                    metrics.record_rejection(&e);
                }
            }
        }

        tokio::task::yield_now().await;
    }

    if metrics.committed == 0 && metrics.attempted > 0 {
        warn!(worker, "Worker committed no operations");
    }

    metrics
}
