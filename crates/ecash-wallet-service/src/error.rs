//! Error types for the wallet service

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet service errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Recovery phrase rejected; nothing was opened or created
    #[error("Invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    /// Not enough stored value; nothing was mutated
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Stored total
        available: u64,
        /// Requested amount
        requested: u64,
    },

    /// Zero or overflowing amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Storage fault; the failed write was not applied
    #[error("Storage error: {0}")]
    Storage(String),

    /// Mint call failed or answered inconsistently after counters were persisted
    #[error("Mint call failed: {0}")]
    MintCallFailed(String),

    /// Persisted row failed validation
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// Token could not be decoded or encoded, or carries the wrong unit
    #[error("Token error: {0}")]
    Token(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRecoveryPhrase(_)
                | Error::InsufficientFunds { .. }
                | Error::InvalidAmount(_)
                | Error::Token(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidRecoveryPhrase(_) | Error::InvalidAmount(_) | Error::Token(_) => {
                ErrorCategory::Input
            }
            Error::InsufficientFunds { .. } => ErrorCategory::Funds,
            Error::Storage(_) | Error::CorruptState(_) => ErrorCategory::Storage,
            Error::MintCallFailed(_) => ErrorCategory::Mint,
            Error::Config(_) | Error::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller-supplied input was rejected
    Input,
    /// Balance too low
    Funds,
    /// Storage errors
    Storage,
    /// Mint errors
    Mint,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "Input"),
            ErrorCategory::Funds => write!(f, "Funds"),
            ErrorCategory::Storage => write!(f, "Storage"),
            ErrorCategory::Mint => write!(f, "Mint"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

impl From<ecash_storage_sqlite::Error> for Error {
    fn from(err: ecash_storage_sqlite::Error) -> Self {
        match err {
            ecash_storage_sqlite::Error::CorruptState(msg) => Error::CorruptState(msg),
            other => Error::Storage(other.to_string()),
        }
    }
}

impl From<ecash_core::Error> for Error {
    fn from(err: ecash_core::Error) -> Self {
        match err {
            ecash_core::Error::InvalidRecoveryPhrase(msg) => Error::InvalidRecoveryPhrase(msg),
            ecash_core::Error::InvalidAmount(msg) | ecash_core::Error::AmountOverflow(msg) => {
                Error::InvalidAmount(msg)
            }
            // Index space is a storage resource
            ecash_core::Error::CounterExhausted(msg) => Error::Storage(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl From<ecash_core::MintError> for Error {
    fn from(err: ecash_core::MintError) -> Self {
        Error::MintCallFailed(err.to_string())
    }
}

impl From<ecash_core::CodecError> for Error {
    fn from(err: ecash_core::CodecError) -> Self {
        Error::Token(err.to_string())
    }
}
