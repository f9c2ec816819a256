//! Ledger configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What `create_account` does when the name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAccountPolicy {
    /// Return the existing account; nothing is added.
    #[default]
    Reuse,
    /// Fail with `AccountExists`.
    Reject,
}

impl FromStr for DuplicateAccountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reuse" => Ok(DuplicateAccountPolicy::Reuse),
            "reject" => Ok(DuplicateAccountPolicy::Reject),
            other => Err(format!("Unknown duplicate account policy: {}", other)),
        }
    }
}

impl fmt::Display for DuplicateAccountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateAccountPolicy::Reuse => write!(f, "reuse"),
            DuplicateAccountPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Main ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Behavior when an account is created twice under one name.
    pub duplicate_accounts: DuplicateAccountPolicy,
    /// Maximum account name length, in characters. Unlimited when `None`.
    pub max_name_len: Option<usize>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            duplicate_accounts: DuplicateAccountPolicy::Reuse,
            max_name_len: None,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(policy) = std::env::var("TALLY_DUPLICATE_ACCOUNTS") {
            if let Ok(policy) = policy.parse() {
                config.duplicate_accounts = policy;
            }
        }

        if let Ok(len) = std::env::var("TALLY_MAX_NAME_LEN") {
            if let Ok(len) = len.parse() {
                config.max_name_len = Some(len);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_name_len == Some(0) {
            return Err("Maximum account name length cannot be 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.duplicate_accounts, DuplicateAccountPolicy::Reuse);
        assert_eq!(config.max_name_len, None);
    }

    #[test]
    fn test_invalid_config() {
        let config = LedgerConfig {
            max_name_len: Some(0),
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("reuse".parse::<DuplicateAccountPolicy>(), Ok(DuplicateAccountPolicy::Reuse));
        assert_eq!(" REJECT ".parse::<DuplicateAccountPolicy>(), Ok(DuplicateAccountPolicy::Reject));
        assert!("ignore".parse::<DuplicateAccountPolicy>().is_err());
        assert_eq!(DuplicateAccountPolicy::Reject.to_string(), "reject");
    }
}
