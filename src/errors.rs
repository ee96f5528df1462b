//! Unified error types and result handling.
//!
//! Errors fall into two groups. The domain variants (`Connectivity`,
//! `Validation`, `Unauthorized`, `MissingData`) each map to a specific chat
//! reply; the remaining variants wrap failures of the ambient stack.

use thiserror::Error;

/// All errors produced by `SolarBuddy`.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// The telemetry source is unreachable or rejected the credentials
    #[error("Telemetry source unavailable: {message}")]
    Connectivity {
        /// Description of the failure
        message: String,
    },

    /// Malformed command argument
    #[error("Invalid command: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A non-admin user invoked an admin command
    #[error("User {user_id} is not authorized to run this command")]
    Unauthorized {
        /// Chat id of the caller
        user_id: String,
    },

    /// The snapshot lacks the plant/device/weather structure a query needs
    #[error("Missing telemetry data: {what}")]
    MissingData {
        /// Name of the absent structure
        what: String,
    },

    /// Filesystem failure (state file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing required environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Failure while building a chat reply
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Error raised by the Discord transport
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Connectivity {
            message: value.to_string(),
        }
    }
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::MissingData`] naming the absent structure.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData { what: what.into() }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
