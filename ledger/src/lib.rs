//! Tally Ledger Engine
//!
//! In-memory ledger of named accounts and an append-only log of signed
//! transactions. Balances are derived from the log and may never go negative;
//! transfers commit both legs or neither.

pub mod engine;
pub mod account;
pub mod journal;
pub mod balance;
pub mod store;
pub mod config;

pub use engine::LedgerEngine;
pub use account::Account;
pub use journal::{Transaction, TransactionKind, Transfer};
pub use balance::{AccountView, IntegrityReport};
pub use store::LedgerStore;
pub use config::{DuplicateAccountPolicy, LedgerConfig};
