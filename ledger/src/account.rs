//! Account definitions for ledger.

use serde::{Deserialize, Serialize};
use tally_common::AccountName;

/// A ledger account.
///
/// An account carries nothing but its name; balances are derived from the
/// transaction log. Serializes as `{"name": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Account name, the sole identity attribute.
    pub name: AccountName,
}

impl Account {
    /// Create a new account.
    pub fn new(name: impl Into<AccountName>) -> Self {
        Self { name: name.into() }
    }

    /// Account name as a string slice.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}
