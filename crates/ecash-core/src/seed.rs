//! Recovery phrase handling
//!
//! Turns a BIP-39 recovery phrase into the session [`Seed`] and into a
//! [`Fingerprint`] that names the persisted store of that identity.
//!
//! The fingerprint is hashed from the phrase's raw entropy, not from the
//! stretched seed. The optional passphrase does not change it.

use crate::{Error, Result};
use bip39::{Language, Mnemonic};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of hash bytes kept in a fingerprint
pub const FINGERPRINT_LEN: usize = 8;

/// 64-byte seed stretched from a recovery phrase.
///
/// Lives for one session only and is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Seed length in bytes
    pub const LEN: usize = 64;

    /// Wrap raw seed bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Raw seed bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// Short stable identifier of a recovery phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint of raw phrase entropy
    pub fn from_entropy(entropy: &[u8]) -> Self {
        let digest = Sha256::digest(entropy);
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        Self(bytes)
    }

    /// Validate a phrase and compute its fingerprint without stretching a seed
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic = parse_phrase(phrase)?;
        Ok(Self::from_entropy(&mnemonic.to_entropy()))
    }

    /// Raw fingerprint bytes
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// File name of the store owned by this identity
    pub fn store_file_name(&self) -> String {
        format!("{}.sqlite", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let decoded = hex::decode(s)
            .map_err(|e| Error::Other(format!("Invalid fingerprint '{}': {}", s, e)))?;
        let bytes: [u8; FINGERPRINT_LEN] = decoded.try_into().map_err(|_| {
            Error::Other(format!(
                "Invalid fingerprint '{}': expected {} bytes",
                s, FINGERPRINT_LEN
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Seed plus the fingerprint selecting its store
#[derive(Debug)]
pub struct Identity {
    /// Stretched seed
    pub seed: Seed,
    /// Store partition key
    pub fingerprint: Fingerprint,
}

/// Recovery phrase to identity derivation
pub struct SeedDerivation;

impl SeedDerivation {
    /// Validate `phrase` and derive the seed and fingerprint.
    ///
    /// Pure: touches neither the filesystem nor the network.
    pub fn derive(phrase: &str, passphrase: &str) -> Result<Identity> {
        let mnemonic = parse_phrase(phrase)?;
        let fingerprint = Fingerprint::from_entropy(&mnemonic.to_entropy());
        let seed = Seed::from_bytes(mnemonic.to_seed(passphrase));

        tracing::debug!("Derived identity {}", fingerprint);

        Ok(Identity { seed, fingerprint })
    }
}

fn parse_phrase(phrase: &str) -> Result<Mnemonic> {
    let normalized = phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.is_empty() {
        return Err(Error::InvalidRecoveryPhrase("empty phrase".to_string()));
    }

    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| Error::InvalidRecoveryPhrase(e.to_string()))
}
