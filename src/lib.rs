//! Ballot ledger
//!
//! Certificate-authorized ballot casting and tallying over an ordered
//! key-value ledger. One answer per (question, organization, user), an
//! organization allow-list fixed at instantiation, and range queries by
//! question or by question and organization.

pub mod authorization;
pub mod config;
pub mod contract;
pub mod errors;
pub mod identity;
pub mod keys;
pub mod ledger;
pub mod types;

// Re-export commonly used types
pub use config::{AuthorizationMode, Config, ContractConfig, LoggingConfig, RecastPolicy};
pub use contract::{Invocation, Response, VoteContract};
pub use errors::{Error, Result};
pub use ledger::{Ledger, MemoryLedger};
pub use types::{Identity, Tally, Vote, VoteKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ballot_ledger={}", config.level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format.as_str() {
        "pretty" => builder.pretty().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| Error::config(format!("failed to install tracing subscriber: {e}")))?;

    tracing::info!("🗳️  Ballot ledger v{} initialized", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_installs_once() {
        let config = Config::for_testing().logging;
        let _ = init_logging(&config);
        assert!(matches!(init_logging(&config), Err(Error::Config { .. })));
    }
}
