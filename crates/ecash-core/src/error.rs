//! Error types for Ecash Core
//!
//! Error taxonomy for recovery phrases, derivation, counters and proofs.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Ecash Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Recovery phrase failed word-list, word-count or checksum validation
    #[error("Invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    /// Malformed keyset identifier
    #[error("Invalid keyset id: {0}")]
    InvalidKeyset(String),

    /// Proof failed field validation
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Counter index space for a keyset is used up
    #[error("Counter exhausted: {0}")]
    CounterExhausted(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRecoveryPhrase(_) | Error::InvalidAmount(_) | Error::AmountOverflow(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidRecoveryPhrase(_) => {
                "The recovery phrase is invalid. Please check and try again.".to_string()
            }
            Error::InvalidAmount(_) | Error::AmountOverflow(_) => {
                "The amount is invalid. Please enter a valid amount.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidAmount(_) | Error::AmountOverflow(_) => ErrorCategory::Amount,
            Error::InvalidRecoveryPhrase(_) | Error::KeyDerivation(_) => ErrorCategory::Keys,
            Error::InvalidKeyset(_) | Error::InvalidProof(_) => ErrorCategory::Proofs,
            Error::CounterExhausted(_) => ErrorCategory::Counters,
            Error::Other(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Amount-related errors
    Amount,
    /// Key and seed errors
    Keys,
    /// Proof and keyset errors
    Proofs,
    /// Counter errors
    Counters,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Amount => write!(f, "Amount"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Proofs => write!(f, "Proofs"),
            ErrorCategory::Counters => write!(f, "Counters"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
