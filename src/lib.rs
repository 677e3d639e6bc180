#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Once;

/// Keyword classifier and canned responder behind the chat panel
pub mod assistant;
/// Client for the bank-aggregation backend and the account-link flow
pub mod backend;
/// Demo session data
pub mod demo;
/// Error handling and custom [`Error`](std::error::Error) types
pub mod errors;
/// Named export files: cash flow, transactions, budget, tax summary and AI report
pub mod export;
/// Delimited text serialization and CSV loading
pub mod io;
/// Ledger totals and the in-memory record stores
pub mod ops;
/// Running-balance projection to the next payday
pub mod projection;
/// Budget, tax and category spending reports
pub mod reports;
/// The session store and its input forms
pub mod session;
/// Persisted user settings
pub mod settings;
/// Data types used throughout Payday
pub mod types;

/// Log filter used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_DIRECTIVE: &str = "payday=warn";

static INIT_TRACING: Once = Once::new();

fn log_filter() -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` is honoured; otherwise this crate logs at `warn`.
/// Safe to call more than once.
pub fn init() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(log_filter())
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::Directive;

    use super::DEFAULT_LOG_DIRECTIVE;

    #[test]
    fn default_directive_parses() {
        assert!(DEFAULT_LOG_DIRECTIVE.parse::<Directive>().is_ok());
    }

    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
