//! Unified error type for the service.
//!
//! Business outcomes (validation, not found, conflicts, insufficient funds) and
//! infrastructure failures share one enum so every layer can propagate with `?`.
//! The HTTP and bot layers decide how each variant is presented.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors produced by `charity-hub`.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input the caller can correct
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Referenced user does not exist
    #[error("User not found: {id}")]
    UserNotFound {
        /// The id that failed to resolve
        id: i64,
    },

    /// Referenced product does not exist
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The id that failed to resolve
        id: i64,
    },

    /// Referenced help request does not exist
    #[error("Help request not found: {id}")]
    HelpRequestNotFound {
        /// The id that failed to resolve
        id: i64,
    },

    /// Invalid state transition or uniqueness violation
    #[error("Conflict: {message}")]
    Conflict {
        /// Which rule was violated
        message: String,
    },

    /// Not enough money for the operation yet. A business outcome, not a fault.
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        /// Balance available at the time of the check
        available: i64,
        /// Amount the operation needed
        required: i64,
    },

    /// The fund ledger row has not been initialised
    #[error("Fund ledger is not initialised")]
    LedgerMissing,

    /// Settings could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Socket or filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable was missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// A notification could not be delivered
    #[error("Notification error: {message}")]
    Notification {
        /// Why delivery failed
        message: String,
    },

    /// Discord client or command framework failure
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for building a [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// True for any of the "referenced entity absent" variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. } | Self::ProductNotFound { .. } | Self::HelpRequestNotFound { .. }
        )
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Returns true when the store rejected a write because of a UNIQUE index.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
