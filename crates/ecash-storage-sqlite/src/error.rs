//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted row failed validation
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// Attempt to move a persisted counter backwards
    #[error("Counter regression for keyset {keyset_id}: stored {stored}, requested {requested}")]
    CounterRegression {
        /// Keyset of the counter
        keyset_id: String,
        /// Value already persisted
        stored: u32,
        /// Value the caller tried to write
        requested: u32,
    },

    /// Proof secret already stored
    #[error("Duplicate secret: {0}")]
    DuplicateSecret(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage error (generic)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
