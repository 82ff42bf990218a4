//! SQLite storage for the ecash wallet ledger
//!
//! One database file per identity fingerprint, holding two tables:
//!
//! - `counters`: next unused derivation index per keyset
//! - `proofs`: unspent proofs, keyed by secret
//!
//! Counter writes are durable (`synchronous=FULL`) before they return, and
//! proof-set changes apply atomically inside a single transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod counters;
pub mod database;
pub mod error;
pub mod migrations;
pub mod proofs;
pub mod retry;

pub use counters::CounterStore;
pub use database::{Database, DEFAULT_BUSY_TIMEOUT};
pub use error::{Error, Result};
pub use proofs::ProofStore;
pub use retry::{with_busy_retry, BASE_BACKOFF_MS, MAX_BACKOFF_MS, MAX_BUSY_RETRIES};
