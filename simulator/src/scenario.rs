//! Simulation scenarios.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use tally_common::LedgerResult;
use tally_ledger::LedgerEngine;

use crate::metrics::SimulationMetrics;

/// A scripted sequence of ledger operations and expectations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
///
/// Amounts are raw JSON values so scenario files can exercise the integer
/// contract with floats or strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Create an account.
    CreateAccount { name: String },
    /// Deposit or withdraw.
    AddFunds {
        account: String,
        amount: Value,
        #[serde(default)]
        expect_error: Option<String>,
    },
    /// Transfer between accounts.
    MoveFunds {
        from: String,
        to: String,
        amount: Value,
        #[serde(default)]
        expect_error: Option<String>,
    },
    /// Assert an account balance.
    ExpectBalance { account: String, balance: i64 },
    /// Assert the number of log entries.
    ExpectLogLength { length: usize },
}

const BUILTIN: [&str; 4] = [
    "basic-deposits",
    "transfer-atomicity",
    "overdraft-rejection",
    "invalid-amounts",
];

impl Scenario {
    /// Load a built-in scenario by name, or a JSON scenario file by path.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "basic-deposits" => Ok(Self::basic_deposits()),
            "transfer-atomicity" => Ok(Self::transfer_atomicity()),
            "overdraft-rejection" => Ok(Self::overdraft_rejection()),
            "invalid-amounts" => Ok(Self::invalid_amounts()),
            path if Path::new(path).is_file() => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read scenario file {}", path))?;
                Self::from_json(&raw)
            }
            _ => Err(anyhow!(
                "Unknown scenario: {} (built-in: {})",
                name,
                Self::builtin_names().join(", ")
            )),
        }
    }

    /// Parse a scenario from JSON.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("Invalid scenario JSON")
    }

    /// Names of the built-in scenarios.
    pub fn builtin_names() -> &'static [&'static str] {
        &BUILTIN
    }

    /// Execute every step against the engine, stopping at the first failed
    /// expectation.
    pub fn run(&self, engine: &LedgerEngine, metrics: &mut SimulationMetrics) -> anyhow::Result<()> {
        info!(scenario = %self.name, steps = self.steps.len(), "Running scenario");

        for (index, step) in self.steps.iter().enumerate() {
            Self::execute_step(engine, metrics, step)
                .with_context(|| format!("Scenario {} failed at step {}", self.name, index + 1))?;
        }

        Ok(())
    }

    fn execute_step(
        engine: &LedgerEngine,
        metrics: &mut SimulationMetrics,
        step: &ScenarioStep,
    ) -> anyhow::Result<()> {
        match step {
            ScenarioStep::CreateAccount { name } => {
                engine.create_account(name)?;
            }
            ScenarioStep::AddFunds {
                account,
                amount,
                expect_error,
            } => {
                let result = engine.add_funds(account, amount);
                check_outcome(
                    result,
                    expect_error.as_deref(),
                    metrics,
                    SimulationMetrics::record_deposit,
                )?;
            }
            ScenarioStep::MoveFunds {
                from,
                to,
                amount,
                expect_error,
            } => {
                let result = engine.move_funds(from, to, amount);
                check_outcome(
                    result,
                    expect_error.as_deref(),
                    metrics,
                    SimulationMetrics::record_transfer,
                )?;
            }
            ScenarioStep::ExpectBalance { account, balance } => {
                let actual = engine.balance_of(account)?;
                if actual != *balance {
                    bail!(
                        "Balance of {} is {}, expected {}",
                        account,
                        actual,
                        balance
                    );
                }
            }
            ScenarioStep::ExpectLogLength { length } => {
                let actual = engine.transaction_count();
                if actual != *length {
                    bail!("Log holds {} entries, expected {}", actual, length);
                }
            }
        }

        Ok(())
    }

    /// Sequential deposits accumulate.
    fn basic_deposits() -> Self {
        Self {
            name: "basic-deposits".to_string(),
            description: "Deposits accumulate into a derived balance".to_string(),
            steps: vec![
                create("X"),
                ScenarioStep::ExpectBalance {
                    account: "X".to_string(),
                    balance: 0,
                },
                add_funds("X", json!(50), None),
                add_funds("X", json!(25), None),
                ScenarioStep::ExpectBalance {
                    account: "X".to_string(),
                    balance: 75,
                },
                ScenarioStep::ExpectLogLength { length: 2 },
            ],
        }
    }

    /// Transfers commit both legs.
    fn transfer_atomicity() -> Self {
        Self {
            name: "transfer-atomicity".to_string(),
            description: "A transfer appends a debit and a credit together".to_string(),
            steps: vec![
                create("A"),
                create("B"),
                add_funds("A", json!(100), None),
                move_funds("A", "B", json!(40), None),
                ScenarioStep::ExpectBalance {
                    account: "A".to_string(),
                    balance: 60,
                },
                ScenarioStep::ExpectBalance {
                    account: "B".to_string(),
                    balance: 40,
                },
                ScenarioStep::ExpectLogLength { length: 3 },
            ],
        }
    }

    /// Overdrafts are rejected without touching the log.
    fn overdraft_rejection() -> Self {
        Self {
            name: "overdraft-rejection".to_string(),
            description: "Deposits and transfers that overdraw are rejected".to_string(),
            steps: vec![
                create("A"),
                create("B"),
                add_funds("A", json!(-1), Some("OVERDRAWN")),
                ScenarioStep::ExpectLogLength { length: 0 },
                add_funds("A", json!(10), None),
                move_funds("A", "B", json!(50), Some("OVERDRAWN")),
                move_funds("A", "B", json!(-1), Some("OVERDRAWN")),
                move_funds("A", "C", json!(1), Some("ACCOUNT_NOT_FOUND")),
                ScenarioStep::ExpectBalance {
                    account: "A".to_string(),
                    balance: 10,
                },
                ScenarioStep::ExpectBalance {
                    account: "B".to_string(),
                    balance: 0,
                },
                ScenarioStep::ExpectLogLength { length: 1 },
            ],
        }
    }

    /// Non-integer amounts are rejected.
    fn invalid_amounts() -> Self {
        Self {
            name: "invalid-amounts".to_string(),
            description: "Amounts must be integers, not whole-valued floats".to_string(),
            steps: vec![
                create("X"),
                create("Y"),
                add_funds("X", json!(3.5), Some("INVALID_AMOUNT")),
                add_funds("X", json!(3.0), Some("INVALID_AMOUNT")),
                add_funds("X", json!("3"), Some("INVALID_AMOUNT")),
                move_funds("X", "Y", json!(0.5), Some("INVALID_AMOUNT")),
                ScenarioStep::ExpectLogLength { length: 0 },
            ],
        }
    }
}

fn create(name: &str) -> ScenarioStep {
    ScenarioStep::CreateAccount {
        name: name.to_string(),
    }
}

fn add_funds(account: &str, amount: Value, expect_error: Option<&str>) -> ScenarioStep {
    ScenarioStep::AddFunds {
        account: account.to_string(),
        amount,
        expect_error: expect_error.map(str::to_string),
    }
}

fn move_funds(from: &str, to: &str, amount: Value, expect_error: Option<&str>) -> ScenarioStep {
    ScenarioStep::MoveFunds {
        from: from.to_string(),
        to: to.to_string(),
        amount,
        expect_error: expect_error.map(str::to_string),
    }
}

/// Match an operation result against the expected error code, if any.
fn check_outcome<T>(
    result: LedgerResult<T>,
    expect_error: Option<&str>,
    metrics: &mut SimulationMetrics,
    record_commit: fn(&mut SimulationMetrics),
) -> anyhow::Result<()> {
    match (result, expect_error) {
        (Ok(_), None) => {
            record_commit(metrics);
            Ok(())
        }
        (Ok(_), Some(code)) => {
            record_commit(metrics);
            bail!("Operation committed, expected {}", code)
        }
        (Err(e), Some(code)) if e.error_code() == code => {
            metrics.record_rejection(&e);
            Ok(())
        }
        (Err(e), _) => {
            metrics.record_rejection(&e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_pass() {
        for name in Scenario::builtin_names() {
            let engine = LedgerEngine::new();
            let mut metrics = SimulationMetrics::new();
            let scenario = Scenario::load(name).unwrap();

            scenario.run(&engine, &mut metrics).unwrap();
            assert!(engine.verify_integrity().is_consistent());
        }
    }

    #[test]
    fn test_overdraft_scenario_metrics() {
        let engine = LedgerEngine::new();
        let mut metrics = SimulationMetrics::new();

        Scenario::load("overdraft-rejection")
            .unwrap()
            .run(&engine, &mut metrics)
            .unwrap();

        assert_eq!(metrics.committed, 1);
        assert_eq!(metrics.rejected.get("OVERDRAWN"), Some(&3));
        assert_eq!(metrics.rejected.get("ACCOUNT_NOT_FOUND"), Some(&1));
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(Scenario::load("no-such-scenario").is_err());
    }

    #[test]
    fn test_scenario_from_json() {
        let raw = r#"{
            "name": "from-file",
            "steps": [
                { "step": "create_account", "name": "A" },
                { "step": "add_funds", "account": "A", "amount": 5 },
                { "step": "add_funds", "account": "A", "amount": 1.5, "expect_error": "INVALID_AMOUNT" },
                { "step": "expect_balance", "account": "A", "balance": 5 }
            ]
        }"#;

        let scenario = Scenario::from_json(raw).unwrap();
        assert_eq!(scenario.steps.len(), 4);

        let engine = LedgerEngine::new();
        scenario.run(&engine, &mut SimulationMetrics::new()).unwrap();
        assert_eq!(engine.balance_of("A").unwrap(), 5);
    }

    #[test]
    fn test_failed_expectation_reports_step() {
        let scenario = Scenario {
            name: "wrong-balance".to_string(),
            description: String::new(),
            steps: vec![
                create("A"),
                ScenarioStep::ExpectBalance {
                    account: "A".to_string(),
                    balance: 1,
                },
            ],
        };

        let err = scenario
            .run(&LedgerEngine::new(), &mut SimulationMetrics::new())
            .unwrap_err();
        assert!(err.to_string().contains("step 2"));
    }

    #[test]
    fn test_unexpected_commit_fails() {
        let scenario = Scenario {
            name: "expects-rejection".to_string(),
            description: String::new(),
            steps: vec![create("A"), add_funds("A", json!(5), Some("OVERDRAWN"))],
        };

        assert!(scenario
            .run(&LedgerEngine::new(), &mut SimulationMetrics::new())
            .is_err());
    }
}
