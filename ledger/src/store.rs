//! Account set and append-only transaction log.
//!
//! The store performs no validation of log entries; that belongs to the
//! engine, which also provides the locking. A `LedgerStore` on its own is a
//! plain single-owner value.

use std::collections::BTreeMap;

use tally_common::{AccountName, LedgerError, LedgerResult};
use tracing::debug;

use crate::account::Account;
use crate::config::{DuplicateAccountPolicy, LedgerConfig};
use crate::journal::Transaction;

/// Accounts keyed by name plus the ordered transaction log.
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    accounts: BTreeMap<AccountName, Account>,
    transactions: Vec<Transaction>,
    config: LedgerConfig,
}

impl LedgerStore {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create an empty store with custom configuration.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            accounts: BTreeMap::new(),
            transactions: Vec::new(),
            config,
        }
    }

    /// Create an account, or return the existing one under the same name.
    pub fn create_account(&mut self, name: &str) -> LedgerResult<Account> {
        let name = self.check_name(name)?;

        if let Some(existing) = self.accounts.get(&name) {
            return match self.config.duplicate_accounts {
                DuplicateAccountPolicy::Reuse => {
                    debug!(account = %name, "Account already exists, reusing");
                    Ok(existing.clone())
                }
                DuplicateAccountPolicy::Reject => Err(LedgerError::AccountExists(name)),
            };
        }

        let account = Account::new(name.clone());
        self.accounts.insert(name, account.clone());
        Ok(account)
    }

    /// Look up an account by exact name.
    pub fn get_account(&self, name: &str) -> LedgerResult<&Account> {
        self.accounts
            .get(name)
            .ok_or_else(|| LedgerError::AccountNotFound(AccountName::new(name)))
    }

    /// Whether an account with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    /// Sum of every log entry for the account; 0 when there are none.
    ///
    /// Entries are summed wide so a netted pair whose first leg would leave
    /// `i64` cannot overflow midway. Committed balances always fit in `i64`.
    pub fn balance_of(&self, account: &Account) -> i64 {
        let total: i128 = self
            .transactions
            .iter()
            .filter(|t| t.account == account.name)
            .map(|t| i128::from(t.amount))
            .sum();

        total.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Append one entry to the end of the log.
    pub fn append(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    /// Accounts in name order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// The log in append order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn check_name(&self, name: &str) -> LedgerResult<AccountName> {
        let name = AccountName::new(name);

        if name.is_empty() {
            return Err(LedgerError::invalid_name("account name cannot be empty"));
        }

        if let Some(max) = self.config.max_name_len {
            if name.char_len() > max {
                return Err(LedgerError::invalid_name(format!(
                    "account name longer than {} characters",
                    max
                )));
            }
        }

        Ok(name)
    }
}
