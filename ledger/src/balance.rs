//! Balance views and the ledger integrity report.

use serde::{Deserialize, Serialize};
use tally_common::AccountName;

/// An account together with its derived balance.
///
/// Serializes as `{"name": "...", "balance": n}`, the shape a request layer
/// returns when an account is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    /// Account name.
    pub name: AccountName,
    /// Current balance, summed from the transaction log.
    pub balance: i64,
}

/// Result of auditing the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Number of accounts.
    pub accounts: usize,
    /// Number of log entries.
    pub transactions: usize,
    /// Sum of every account balance.
    pub total_balance: i128,
    /// Sum of all transfer legs; zero in a consistent ledger.
    pub transfer_residual: i128,
    /// Accounts whose derived balance is negative.
    pub negative_balances: Vec<AccountView>,
    /// Log entries naming an account that does not exist.
    pub unknown_accounts: Vec<AccountName>,
}

impl IntegrityReport {
    /// Whether every ledger invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.negative_balances.is_empty()
            && self.unknown_accounts.is_empty()
            && self.transfer_residual == 0
    }
}
