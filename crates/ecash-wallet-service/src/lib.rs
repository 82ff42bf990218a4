//! Ecash wallet service
//!
//! Receive and send flows over the deterministic-secret ledger. Counter
//! ranges are persisted before any mint call uses them, and the proof set
//! changes only after a mint response has been checked, so no secret is ever
//! derived twice even across crashes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod wallet;

pub use balance::{Balance, BalanceView};
pub use config::WalletConfig;
pub use coordinator::{OperationCoordinator, ReceiveResult, SendResult};
pub use error::{Error, ErrorCategory, Result};
pub use state::{OperationKind, OperationState, OperationTrace};
pub use wallet::Wallet;
