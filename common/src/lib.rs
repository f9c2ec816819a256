//! Tally Common Types
//!
//! Shared types used across the Tally ledger: account and transaction
//! identifiers, the integer amount contract, the error taxonomy, and time
//! helpers.

pub mod identifiers;
pub mod amount;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use amount::*;
pub use error::*;
pub use time::*;
