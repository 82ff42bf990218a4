//! Ecash wallet core
//!
//! This crate implements recovery-phrase handling, deterministic secret
//! derivation, counter reservation arithmetic and the proof model, together
//! with the traits the wallet uses to talk to a mint and a token codec.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod counter;
pub mod error;
pub mod keyset;
pub mod mint;
pub mod params;
pub mod proof;
pub mod secrets;
pub mod seed;

pub use counter::{CounterSnapshot, Reservation};
pub use error::{Error, ErrorCategory, Result};
pub use keyset::KeysetId;
pub use mint::{
    CodecError, DecodedToken, MintClient, MintError, MintResult, SplitOutcome, SplitPlan,
    TokenCodec,
};
pub use params::{DERIVATION_COIN_TYPE, DERIVATION_PURPOSE, KEYSET_INDEX_MODULUS, MAX_COUNTER};
pub use proof::{total_amount, Proof};
pub use secrets::{BlindingFactor, PreparedOutput, SecretDeriver};
pub use seed::{Fingerprint, Identity, Seed, SeedDerivation, FINGERPRINT_LEN};
