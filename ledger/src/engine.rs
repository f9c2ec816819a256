//! Core ledger engine implementation.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use tally_common::{AccountName, Clock, IntoAmount, LedgerError, LedgerResult, SystemClock};

use crate::account::Account;
use crate::balance::{AccountView, IntegrityReport};
use crate::config::LedgerConfig;
use crate::journal::{Transaction, TransactionKind, Transfer};
use crate::store::LedgerStore;

/// The ledger engine validates deposits and transfers and appends them to
/// the store.
///
/// One lock guards both the account set and the log. Mutating operations hold
/// the write guard from the balance read through the final append, so no
/// other caller can act on a balance that is about to change.
pub struct LedgerEngine {
    /// Accounts and transaction log.
    store: RwLock<LedgerStore>,
    /// Timestamp source for appended entries.
    clock: Arc<dyn Clock>,
}

impl LedgerEngine {
    /// Create a new ledger engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create a new ledger engine with custom configuration.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new ledger engine with custom configuration and clock.
    pub fn with_clock(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: RwLock::new(LedgerStore::with_config(config)),
            clock,
        }
    }

    /// Create an account.
    #[instrument(skip(self))]
    pub fn create_account(&self, name: &str) -> LedgerResult<Account> {
        let mut store = self.store.write();
        let existed = store.contains(name);

        let account = store.create_account(name).map_err(|e| {
            warn!(error = %e, "Account creation rejected");
            e
        })?;

        if !existed {
            info!(account = %account.name, "Account created");
        }

        Ok(account)
    }

    /// Get an account by name.
    pub fn get_account(&self, name: &str) -> LedgerResult<Account> {
        let store = self.store.read();
        let account = store.get_account(name)?.clone();
        debug!(account = %account.name, "Account resolved");
        Ok(account)
    }

    /// Current balance of the named account.
    pub fn balance_of(&self, name: &str) -> LedgerResult<i64> {
        let store = self.store.read();
        let account = store.get_account(name)?;
        Ok(store.balance_of(account))
    }

    /// Deposit into (positive amount) or withdraw from (negative amount) an
    /// account.
    #[instrument(skip(self, amount))]
    pub fn add_funds(&self, name: &str, amount: impl IntoAmount) -> LedgerResult<Transaction> {
        let amount = amount.into_amount().map_err(|e| {
            warn!(error = %e, "Deposit rejected");
            e
        })?;

        let mut store = self.store.write();
        let account = store.get_account(name)?.name.clone();

        let entry = Transaction::new(
            account,
            TransactionKind::Deposit,
            amount,
            self.clock.now(),
        );

        Self::check_entries(&store, &[&entry]).map_err(|e| {
            warn!(error = %e, amount, "Deposit rejected");
            e
        })?;

        store.append(entry.clone());

        info!(
            account = %entry.account,
            amount,
            transaction_id = %entry.id,
            "Funds added"
        );

        Ok(entry)
    }

    /// Move funds between two accounts.
    ///
    /// Appends a debit on `name_from` and a credit on `name_to`, both or
    /// neither.
    #[instrument(skip(self, amount))]
    pub fn move_funds(
        &self,
        name_from: &str,
        name_to: &str,
        amount: impl IntoAmount,
    ) -> LedgerResult<Transfer> {
        let amount = amount.into_amount().map_err(|e| {
            warn!(error = %e, "Transfer rejected");
            e
        })?;

        let mut store = self.store.write();
        let from = store.get_account(name_from)?.name.clone();
        let to = store.get_account(name_to)?.name.clone();

        let transfer = Transfer::new(from, to, amount, self.clock.now())
            .and_then(|transfer| {
                Self::check_entries(&store, &transfer.legs())?;
                Ok(transfer)
            })
            .map_err(|e| {
                warn!(error = %e, amount, "Transfer rejected");
                e
            })?;

        store.append(transfer.debit.clone());
        store.append(transfer.credit.clone());

        info!(
            from = %transfer.debit.account,
            to = %transfer.credit.account,
            amount,
            "Funds moved"
        );

        Ok(transfer)
    }

    /// All accounts in name order.
    pub fn accounts(&self) -> Vec<Account> {
        self.store.read().accounts().cloned().collect()
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.store.read().account_count()
    }

    /// Snapshot of the log in append order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.store.read().transactions().to_vec()
    }

    /// Number of log entries.
    pub fn transaction_count(&self) -> usize {
        self.store.read().transactions().len()
    }

    /// Log entries for one account, in append order.
    pub fn transactions_for(&self, name: &str) -> LedgerResult<Vec<Transaction>> {
        let store = self.store.read();
        let account = store.get_account(name)?;

        Ok(store
            .transactions()
            .iter()
            .filter(|t| t.account == account.name)
            .cloned()
            .collect())
    }

    /// Account with its current balance.
    pub fn account_view(&self, name: &str) -> LedgerResult<AccountView> {
        let store = self.store.read();
        let account = store.get_account(name)?;

        Ok(AccountView {
            name: account.name.clone(),
            balance: store.balance_of(account),
        })
    }

    /// Every account with its current balance, in name order.
    pub fn account_views(&self) -> Vec<AccountView> {
        let store = self.store.read();
        store
            .accounts()
            .map(|account| AccountView {
                name: account.name.clone(),
                balance: store.balance_of(account),
            })
            .collect()
    }

    /// Audit the whole ledger against its invariants.
    pub fn verify_integrity(&self) -> IntegrityReport {
        let store = self.store.read();
        let mut report = IntegrityReport {
            accounts: store.account_count(),
            transactions: store.transactions().len(),
            ..IntegrityReport::default()
        };

        for account in store.accounts() {
            let balance = store.balance_of(account);
            report.total_balance += i128::from(balance);
            if balance < 0 {
                report.negative_balances.push(AccountView {
                    name: account.name.clone(),
                    balance,
                });
            }
        }

        for entry in store.transactions() {
            if entry.kind.is_transfer_leg() {
                report.transfer_residual += i128::from(entry.amount);
            }
            if !store.contains(entry.account.as_str())
                && !report.unknown_accounts.contains(&entry.account)
            {
                report.unknown_accounts.push(entry.account.clone());
            }
        }

        if !report.is_consistent() {
            warn!(
                negative = report.negative_balances.len(),
                unknown = report.unknown_accounts.len(),
                residual = %report.transfer_residual,
                "Ledger integrity violated"
            );
        }

        report
    }

    /// Check prospective entries against the log as it stands.
    ///
    /// Entries for the same account are netted, so each account is judged by
    /// its balance after the whole group lands. Every account must exist and
    /// no closing balance may be negative; a closing balance outside `i64` is
    /// reported only once no account is overdrawn.
    fn check_entries(store: &LedgerStore, entries: &[&Transaction]) -> LedgerResult<()> {
        // (account, opening balance, running balance)
        let mut balances: Vec<(&AccountName, i64, i128)> = Vec::with_capacity(entries.len());

        for entry in entries {
            let slot = match balances.iter().position(|(name, ..)| **name == entry.account) {
                Some(slot) => slot,
                None => {
                    let account = store.get_account(entry.account.as_str())?;
                    let opening = store.balance_of(account);
                    balances.push((&entry.account, opening, i128::from(opening)));
                    balances.len() - 1
                }
            };

            balances[slot].2 += i128::from(entry.amount);
        }

        for (account, opening, closing) in &balances {
            if *closing < 0 {
                let change = i64::try_from(*closing - i128::from(*opening)).map_err(|_| {
                    LedgerError::AmountOverflow {
                        account: (*account).clone(),
                    }
                })?;
                return Err(LedgerError::Overdrawn {
                    account: (*account).clone(),
                    balance: *opening,
                    change,
                });
            }
        }

        for (account, _, closing) in &balances {
            if i64::try_from(*closing).is_err() {
                return Err(LedgerError::AmountOverflow {
                    account: (*account).clone(),
                });
            }
        }

        Ok(())
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use tally_common::FixedClock;

    fn engine_with(accounts: &[(&str, i64)]) -> LedgerEngine {
        let engine = LedgerEngine::new();
        for (name, balance) in accounts {
            engine.create_account(name).unwrap();
            if *balance != 0 {
                engine.add_funds(name, *balance).unwrap();
            }
        }
        engine
    }

    #[test]
    fn test_create_and_get_account() {
        let engine = LedgerEngine::new();
        engine.create_account("Test").unwrap();

        let account = engine.get_account("Test").unwrap();
        assert_eq!(account.name(), "Test");
        assert_eq!(engine.balance_of("Test").unwrap(), 0);
        assert_eq!(engine.account_count(), 1);
        assert_eq!(engine.transaction_count(), 0);
    }

    #[test]
    fn test_create_account_raises_error_if_name_blank() {
        let engine = LedgerEngine::new();
        assert!(matches!(
            engine.create_account(""),
            Err(LedgerError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_add_funds_no_account() {
        let engine = LedgerEngine::new();
        assert_eq!(
            engine.add_funds("no-account", 3),
            Err(LedgerError::AccountNotFound(AccountName::new("no-account")))
        );
    }

    #[test]
    fn test_add_multiple_funds() {
        let engine = engine_with(&[("Test", 0)]);
        engine.add_funds("Test", 50).unwrap();
        engine.add_funds("Test", 25).unwrap();

        let amounts: Vec<i64> = engine.transactions().iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![50, 25]);
        assert_eq!(engine.balance_of("Test").unwrap(), 75);
    }

    #[test]
    fn test_add_fractional_funds() {
        let engine = engine_with(&[("Test", 0)]);

        assert!(matches!(
            engine.add_funds("Test", 3.5),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.add_funds("Test", 3.0),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(engine.transaction_count(), 0);
    }

    #[test]
    fn test_invalid_amount_checked_before_account() {
        let engine = LedgerEngine::new();
        assert!(matches!(
            engine.add_funds("missing", 1.5),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_withdraw_within_balance() {
        let engine = engine_with(&[("X", 30)]);
        engine.add_funds("X", -30).unwrap();
        assert_eq!(engine.balance_of("X").unwrap(), 0);
    }

    #[test]
    fn test_overdraft_rejected() {
        let engine = engine_with(&[("X", 0)]);

        assert_eq!(
            engine.add_funds("X", -1),
            Err(LedgerError::Overdrawn {
                account: AccountName::new("X"),
                balance: 0,
                change: -1,
            })
        );
        assert_eq!(engine.transaction_count(), 0);
    }

    #[test]
    fn test_deposit_overflow_rejected() {
        let engine = engine_with(&[("X", i64::MAX)]);

        assert_eq!(
            engine.add_funds("X", 1),
            Err(LedgerError::AmountOverflow {
                account: AccountName::new("X")
            })
        );
        assert_eq!(engine.transaction_count(), 1);
    }

    #[test]
    fn test_transfer() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let engine =
            LedgerEngine::with_clock(LedgerConfig::default(), Arc::new(FixedClock::new(at)));
        engine.create_account("A").unwrap();
        engine.create_account("B").unwrap();
        engine.add_funds("A", 100).unwrap();

        let transfer = engine.move_funds("A", "B", 40).unwrap();

        assert_eq!(engine.balance_of("A").unwrap(), 60);
        assert_eq!(engine.balance_of("B").unwrap(), 40);

        let log = engine.transactions();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1], transfer.debit);
        assert_eq!(log[2], transfer.credit);
        assert_eq!(log[1].amount, -40);
        assert_eq!(log[2].amount, 40);
        assert_eq!(log[1].timestamp, at);
        assert_eq!(log[2].timestamp, at);
        assert_eq!(transfer.timestamp(), at);
    }

    #[test]
    fn test_transfer_overdraft_appends_nothing() {
        let engine = engine_with(&[("A", 10), ("B", 0)]);

        let result = engine.move_funds("A", "B", 50);

        assert_eq!(
            result,
            Err(LedgerError::Overdrawn {
                account: AccountName::new("A"),
                balance: 10,
                change: -50,
            })
        );
        assert_eq!(engine.balance_of("A").unwrap(), 10);
        assert_eq!(engine.balance_of("B").unwrap(), 0);
        assert_eq!(engine.transaction_count(), 1);
    }

    #[test]
    fn test_negative_transfer_can_overdraw_destination() {
        let engine = engine_with(&[("A", 10), ("B", 5)]);

        let result = engine.move_funds("A", "B", -6);

        assert!(matches!(
            result,
            Err(LedgerError::Overdrawn { ref account, .. }) if account.as_str() == "B"
        ));
        assert_eq!(engine.transaction_count(), 2);

        engine.move_funds("A", "B", -5).unwrap();
        assert_eq!(engine.balance_of("A").unwrap(), 15);
        assert_eq!(engine.balance_of("B").unwrap(), 0);
    }

    #[test]
    fn test_transfer_unknown_account() {
        let engine = engine_with(&[("A", 10)]);

        assert_eq!(
            engine.move_funds("A", "nobody", 5),
            Err(LedgerError::AccountNotFound(AccountName::new("nobody")))
        );
        assert_eq!(
            engine.move_funds("nobody", "A", 5),
            Err(LedgerError::AccountNotFound(AccountName::new("nobody")))
        );
        assert_eq!(engine.transaction_count(), 1);
    }

    #[test]
    fn test_transfer_fractional_amount() {
        let engine = engine_with(&[("A", 10), ("B", 0)]);
        assert!(matches!(
            engine.move_funds("A", "B", 2.5f32),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(engine.transaction_count(), 1);
    }

    #[test]
    fn test_self_transfer_nets_to_zero() {
        let engine = engine_with(&[("A", 10)]);

        let transfer = engine.move_funds("A", "A", 25).unwrap();

        assert!(transfer.is_self_transfer());
        assert_eq!(engine.balance_of("A").unwrap(), 10);
        assert_eq!(engine.transaction_count(), 3);
    }

    #[test]
    fn test_overdraft_reported_before_destination_overflow() {
        let engine = engine_with(&[("A", 10), ("B", i64::MAX)]);

        assert_eq!(
            engine.move_funds("A", "B", 50),
            Err(LedgerError::Overdrawn {
                account: AccountName::new("A"),
                balance: 10,
                change: -50,
            })
        );
        assert_eq!(engine.transaction_count(), 2);
    }

    #[test]
    fn test_destination_overflow_rejected() {
        let engine = engine_with(&[("A", 10), ("B", i64::MAX)]);

        assert_eq!(
            engine.move_funds("A", "B", 5),
            Err(LedgerError::AmountOverflow {
                account: AccountName::new("B")
            })
        );
        assert_eq!(engine.balance_of("B").unwrap(), i64::MAX);
    }

    #[test]
    fn test_large_negative_self_transfer_nets_to_zero() {
        let engine = engine_with(&[("S", 5)]);

        engine.move_funds("S", "S", -i64::MAX).unwrap();

        assert_eq!(engine.balance_of("S").unwrap(), 5);
        assert_eq!(engine.transaction_count(), 3);
        assert!(engine.verify_integrity().is_consistent());
    }

    #[test]
    fn test_transfer_min_amount_rejected() {
        let engine = engine_with(&[("A", 10), ("B", 0)]);
        assert!(matches!(
            engine.move_funds("A", "B", i64::MIN),
            Err(LedgerError::AmountOverflow { .. })
        ));
        assert_eq!(engine.transaction_count(), 1);
    }

    #[test]
    fn test_account_views() {
        let engine = engine_with(&[("bob", 5), ("alice", 20)]);

        let view = engine.account_view("alice").unwrap();
        assert_eq!(view.balance, 20);

        let names: Vec<String> = engine
            .account_views()
            .into_iter()
            .map(|v| v.name.to_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_transactions_for() {
        let engine = engine_with(&[("A", 100), ("B", 0)]);
        engine.move_funds("A", "B", 30).unwrap();

        let entries = engine.transactions_for("B").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::TransferCredit);
        assert!(engine.transactions_for("C").is_err());
    }

    #[test]
    fn test_verify_integrity() {
        let engine = engine_with(&[("A", 100), ("B", 0)]);
        engine.move_funds("A", "B", 30).unwrap();
        let _ = engine.move_funds("B", "A", 500);

        let report = engine.verify_integrity();
        assert!(report.is_consistent());
        assert_eq!(report.accounts, 2);
        assert_eq!(report.transactions, 3);
        assert_eq!(report.total_balance, 100);
    }

    #[test]
    fn test_balance_reads_are_idempotent() {
        let engine = engine_with(&[("A", 42)]);
        assert_eq!(engine.balance_of("A"), engine.balance_of("A"));
    }

    proptest! {
        #[test]
        fn prop_add_funds(amount in 0i64..=i64::MAX) {
            let engine = engine_with(&[("Test", 0)]);
            let entry = engine.add_funds("Test", amount).unwrap();

            prop_assert_eq!(entry.amount, amount);
            prop_assert_eq!(engine.transaction_count(), 1);
            prop_assert_eq!(engine.balance_of("Test").unwrap(), amount);
        }

        #[test]
        fn prop_negative_deposit_on_empty_account(amount in i64::MIN..0i64) {
            let engine = engine_with(&[("Test", 0)]);

            let is_overdrawn = matches!(
                engine.add_funds("Test", amount),
                Err(LedgerError::Overdrawn { .. })
            );
            prop_assert!(is_overdrawn);
            prop_assert_eq!(engine.transaction_count(), 0);
        }

        #[test]
        fn prop_add_fractional_funds(amount in any::<f64>()) {
            let engine = engine_with(&[("Test", 0)]);

            let is_invalid = matches!(
                engine.add_funds("Test", amount),
                Err(LedgerError::InvalidAmount(_))
            );
            prop_assert!(is_invalid);
            prop_assert_eq!(engine.transaction_count(), 0);
        }

        #[test]
        fn prop_transfer_all_or_nothing(
            from_balance in 0i64..1_000_000,
            to_balance in 0i64..1_000_000,
            amount in -2_000_000i64..2_000_000,
        ) {
            let engine = engine_with(&[("A", from_balance), ("B", to_balance)]);
            let before = engine.transaction_count();

            match engine.move_funds("A", "B", amount) {
                Ok(_) => {
                    prop_assert!(from_balance - amount >= 0);
                    prop_assert!(to_balance + amount >= 0);
                    prop_assert_eq!(engine.transaction_count(), before + 2);
                    prop_assert_eq!(engine.balance_of("A").unwrap(), from_balance - amount);
                    prop_assert_eq!(engine.balance_of("B").unwrap(), to_balance + amount);
                }
                Err(e) => {
                    prop_assert_eq!(e.error_code(), "OVERDRAWN");
                    prop_assert!(from_balance - amount < 0 || to_balance + amount < 0);
                    prop_assert_eq!(engine.transaction_count(), before);
                    prop_assert_eq!(engine.balance_of("A").unwrap(), from_balance);
                    prop_assert_eq!(engine.balance_of("B").unwrap(), to_balance);
                }
            }
            prop_assert!(engine.verify_integrity().is_consistent());
        }
    }
}
