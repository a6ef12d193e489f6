//! Configuration management for the ballot ledger
//!
//! Loads contract and logging settings from environment variables with validation.

use crate::keys::COMPOSITE_KEY_MARKER;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default ledger namespace for ballot keys
pub const DEFAULT_VOTE_NAMESPACE: &str = "Vote";

/// Default reserved key holding the organization allow-list
pub const DEFAULT_ALLOWED_ORGS_KEY: &str = "allowedOrgs";

/// Whether casts are gated by the organization allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationMode {
    /// Only organizations stored at init time may vote
    AllowList,
    /// Any organization with a parseable certificate may vote
    Open,
}

impl FromStr for AuthorizationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow-list" => Ok(Self::AllowList),
            "open" => Ok(Self::Open),
            other => Err(Error::config(format!(
                "BALLOT_AUTHORIZATION must be 'allow-list' or 'open', got '{other}'"
            ))),
        }
    }
}

/// What happens when a participant casts again on the same question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecastPolicy {
    /// Last write wins
    Overwrite,
    /// The first ballot stands; later casts fail with `AlreadyVoted`
    Reject,
}

impl FromStr for RecastPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            other => Err(Error::config(format!(
                "BALLOT_RECAST_POLICY must be 'overwrite' or 'reject', got '{other}'"
            ))),
        }
    }
}

/// Settings the vote contract needs on every invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Namespace tag for composite ballot keys
    pub vote_namespace: String,

    /// Reserved simple key for the allow-list
    pub allowed_orgs_key: String,

    /// Authorization gate mode
    pub authorization: AuthorizationMode,

    /// Recast behavior
    pub recast_policy: RecastPolicy,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            vote_namespace: DEFAULT_VOTE_NAMESPACE.to_string(),
            allowed_orgs_key: DEFAULT_ALLOWED_ORGS_KEY.to_string(),
            authorization: AuthorizationMode::AllowList,
            recast_policy: RecastPolicy::Overwrite,
        }
    }
}

impl ContractConfig {
    /// Load contract configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vote_namespace =
            var("BALLOT_VOTE_NAMESPACE").unwrap_or_else(|| DEFAULT_VOTE_NAMESPACE.to_string());

        let allowed_orgs_key =
            var("BALLOT_ALLOWED_ORGS_KEY").unwrap_or_else(|| DEFAULT_ALLOWED_ORGS_KEY.to_string());

        let authorization = var("BALLOT_AUTHORIZATION")
            .map(|s| s.parse::<AuthorizationMode>())
            .transpose()?
            .unwrap_or(AuthorizationMode::AllowList);

        let recast_policy = var("BALLOT_RECAST_POLICY")
            .map(|s| s.parse::<RecastPolicy>())
            .transpose()?
            .unwrap_or(RecastPolicy::Overwrite);

        let config = Self {
            vote_namespace,
            allowed_orgs_key,
            authorization,
            recast_policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self::default()
    }

    /// Check namespace and reserved key constraints
    pub fn validate(&self) -> Result<()> {
        if self.vote_namespace.is_empty() {
            return Err(Error::config("BALLOT_VOTE_NAMESPACE must not be empty"));
        }

        match self.allowed_orgs_key.as_bytes().first() {
            None => Err(Error::config("BALLOT_ALLOWED_ORGS_KEY must not be empty")),
            // Composite keys own the 0x00 prefix.
            Some(&COMPOSITE_KEY_MARKER) => Err(Error::config(
                "BALLOT_ALLOWED_ORGS_KEY must not start with a NUL byte",
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub contract: ContractConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let contract = ContractConfig::from_env()?;

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "full".to_string()),
        };

        Ok(Self { contract, logging })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };

        Self {
            contract: ContractConfig::for_testing(),
            logging,
        }
    }
}
