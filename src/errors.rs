use crate::types::{AccountId, TransactionId};

/// Error type that can be returned by fallible operations in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error reading or writing delimited text; could wrap IO or parsing errors
    #[error("Error processing CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A backend response or settings file could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A backend round trip failed, either in transport or with a non-2xx status.
    /// `status` is `None` when no response was received at all.
    #[error("Network error{}: {}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default(), .message)]
    Network {
        /// HTTP status of the failed response, if any
        status: Option<u16>,
        /// Human readable description of the failure
        message: String,
    },
    /// The savings rate is undefined because there was no income to divide by
    #[error("Savings rate is undefined without income")]
    UndefinedRate,
    /// A projection was asked for payday balances but contains no income event
    #[error("No upcoming income in the projection")]
    NoUpcomingIncome,
    /// Submitted form data is missing a required field or has an invalid value
    #[error("Invalid {0}")]
    Validation(String),
    /// Each account id may only be added to a session once
    #[error("Account {0} already exists")]
    DuplicateAccount(AccountId),
    /// Each transaction id may only be added to a session once
    #[error("Transaction {0} already exists")]
    DuplicateTransaction(TransactionId),
    /// A month string was not in `YYYY-MM` form
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    /// Settings could not be located or written
    #[error("Settings error: {0}")]
    Settings(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] naming the offending field
    pub(crate) fn validation(field: impl Into<String>) -> Self {
        Self::Validation(field.into())
    }

    /// Shorthand for a [`Error::Network`] failure with no response
    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_message_with_status() {
        let err = Error::Network {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Network error (HTTP 502): bad gateway");
        assert_eq!(
            Error::network("connection refused").to_string(),
            "Network error: connection refused"
        );
    }
}
