//! Transaction log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_common::{AccountName, LedgerError, LedgerResult, TransactionId};

/// What produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Single-leg deposit or withdrawal via `add_funds`.
    Deposit,
    /// Outgoing leg of a transfer.
    TransferDebit,
    /// Incoming leg of a transfer.
    TransferCredit,
}

impl TransactionKind {
    /// Whether this entry is one leg of a transfer.
    pub fn is_transfer_leg(&self) -> bool {
        matches!(
            self,
            TransactionKind::TransferDebit | TransactionKind::TransferCredit
        )
    }
}

/// A single entry in the transaction log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique entry ID.
    pub id: TransactionId,
    /// Account affected.
    pub account: AccountName,
    /// Entry kind.
    pub kind: TransactionKind,
    /// Signed amount: positive credits the account, negative debits it.
    pub amount: i64,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a new entry.
    pub fn new(
        account: AccountName,
        kind: TransactionKind,
        amount: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account,
            kind,
            amount,
            timestamp,
        }
    }

    /// Whether the entry increases the balance.
    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }

    /// Whether the entry decreases the balance.
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Both legs of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Leg taking funds out of the source account.
    pub debit: Transaction,
    /// Leg putting funds into the destination account.
    pub credit: Transaction,
}

impl Transfer {
    /// Build both legs of a transfer: a debit on `from` followed by a credit
    /// on `to`, sharing one timestamp.
    ///
    /// Fails with `AmountOverflow` when `amount` has no negation (`i64::MIN`).
    pub fn new(
        from: AccountName,
        to: AccountName,
        amount: i64,
        timestamp: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let debit = amount
            .checked_neg()
            .ok_or_else(|| LedgerError::AmountOverflow {
                account: from.clone(),
            })?;

        Ok(Self {
            debit: Transaction::new(from, TransactionKind::TransferDebit, debit, timestamp),
            credit: Transaction::new(to, TransactionKind::TransferCredit, amount, timestamp),
        })
    }

    /// Both legs in append order.
    pub fn legs(&self) -> [&Transaction; 2] {
        [&self.debit, &self.credit]
    }

    /// Whether source and destination are the same account.
    pub fn is_self_transfer(&self) -> bool {
        self.debit.account == self.credit.account
    }

    /// Amount moved from source to destination.
    pub fn amount(&self) -> i64 {
        self.credit.amount
    }

    /// Shared timestamp of both legs.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.credit.timestamp
    }
}
