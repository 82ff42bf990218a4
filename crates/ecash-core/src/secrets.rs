//! Deterministic secret derivation
//!
//! Every fresh blinded output gets its secret and blinding factor from the
//! session seed and a counter index:
//!
//! - secret: `m/129372'/0'/{keyset}'/{counter}'/0`
//! - blinding factor: `m/129372'/0'/{keyset}'/{counter}'/1`
//!
//! `{keyset}` is [`KeysetId::derivation_index`]. The same seed, keyset and
//! counter always give the same output, which is why a persisted counter must
//! never be handed out twice.

use crate::params::{BLINDING_BRANCH, DERIVATION_COIN_TYPE, DERIVATION_PURPOSE, SECRET_BRANCH};
use crate::{Error, KeysetId, Reservation, Result, Seed};
use bip32::{DerivationPath, XPrv};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Scalar used to blind an output secret
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BlindingFactor([u8; 32]);

impl BlindingFactor {
    /// Raw scalar bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlindingFactor(<redacted>)")
    }
}

/// Secret material for one fresh output, handed to the mint client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOutput {
    /// Keyset the output is requested from
    pub keyset_id: KeysetId,
    /// Counter index the output was derived from
    pub counter: u32,
    /// Hex secret
    pub secret: String,
    /// Blinding factor for the secret
    pub blinding_factor: BlindingFactor,
}

/// Derives output secrets from a session seed
pub struct SecretDeriver<'a> {
    seed: &'a Seed,
}

impl<'a> SecretDeriver<'a> {
    /// Create deriver over a seed
    pub fn new(seed: &'a Seed) -> Self {
        Self { seed }
    }

    /// Derive the output for one counter index
    pub fn derive(&self, keyset_id: &KeysetId, counter: u32) -> Result<PreparedOutput> {
        let secret = self.derive_key(keyset_id, counter, SECRET_BRANCH)?;
        let blinding = self.derive_key(keyset_id, counter, BLINDING_BRANCH)?;

        Ok(PreparedOutput {
            keyset_id: keyset_id.clone(),
            counter,
            secret: hex::encode(secret),
            blinding_factor: BlindingFactor(blinding),
        })
    }

    /// Derive outputs for every index of a reservation, in index order
    pub fn derive_reservation(&self, reservation: &Reservation) -> Result<Vec<PreparedOutput>> {
        reservation
            .indices()
            .map(|counter| self.derive(&reservation.keyset_id, counter))
            .collect()
    }

    fn derive_key(&self, keyset_id: &KeysetId, counter: u32, branch: u32) -> Result<[u8; 32]> {
        let path = derivation_path(keyset_id, counter, branch)?;
        let xprv = XPrv::derive_from_path(self.seed.as_bytes(), &path)
            .map_err(|e| Error::KeyDerivation(format!("{}: {}", path, e)))?;
        Ok(xprv.to_bytes())
    }
}

fn path_string(keyset_id: &KeysetId, counter: u32, branch: u32) -> String {
    format!(
        "m/{}'/{}'/{}'/{}'/{}",
        DERIVATION_PURPOSE,
        DERIVATION_COIN_TYPE,
        keyset_id.derivation_index(),
        counter,
        branch
    )
}

/// Derivation path of an output key
pub fn derivation_path(keyset_id: &KeysetId, counter: u32, branch: u32) -> Result<DerivationPath> {
    let path = path_string(keyset_id, counter, branch);
    path.parse::<DerivationPath>()
        .map_err(|e| Error::KeyDerivation(format!("{}: {}", path, e)))
}
