//! Simulation metrics.

use std::collections::BTreeMap;

use tally_common::LedgerError;

/// Simulation metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationMetrics {
    /// Operations attempted.
    pub attempted: u64,
    /// Operations committed to the ledger.
    pub committed: u64,
    /// Deposits committed.
    pub deposits: u64,
    /// Transfers committed.
    pub transfers: u64,
    /// Rejections by error code.
    pub rejected: BTreeMap<&'static str, u64>,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed deposit.
    pub fn record_deposit(&mut self) {
        self.attempted += 1;
        self.committed += 1;
        self.deposits += 1;
    }

    /// Record a committed transfer.
    pub fn record_transfer(&mut self) {
        self.attempted += 1;
        self.committed += 1;
        self.transfers += 1;
    }

    /// Record a rejected operation.
    pub fn record_rejection(&mut self, error: &LedgerError) {
        self.attempted += 1;
        *self.rejected.entry(error.error_code()).or_insert(0) += 1;
    }

    /// Total rejected operations.
    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Fraction of attempts that committed.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }

        self.committed as f64 / self.attempted as f64
    }

    /// Fold another worker's metrics into this one.
    pub fn merge(&mut self, other: &SimulationMetrics) {
        self.attempted += other.attempted;
        self.committed += other.committed;
        self.deposits += other.deposits;
        self.transfers += other.transfers;
        for (code, count) in &other.rejected {
            *self.rejected.entry(*code).or_insert(0) += count;
        }
    }
}
