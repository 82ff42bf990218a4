//! Keyset identifiers

use crate::params::KEYSET_INDEX_MODULUS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque mint-assigned id of a signing-key generation.
///
/// Stored in lowercase hex form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeysetId(String);

impl KeysetId {
    /// Parse and normalize a hex keyset id
    pub fn parse(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidKeyset("empty keyset id".to_string()));
        }
        if trimmed.len() % 2 != 0 {
            return Err(Error::InvalidKeyset(format!(
                "'{}' has odd length {}",
                trimmed,
                trimmed.len()
            )));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidKeyset(format!("'{}' is not hex", trimmed)));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Hex form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hardened child index used for this keyset in secret derivation.
    ///
    /// The id bytes are read as a big-endian integer reduced modulo 2^31 - 1.
    pub fn derivation_index(&self) -> u32 {
        // Validated as hex in `parse`
        let bytes = hex::decode(&self.0).unwrap_or_default();
        let index = bytes
            .iter()
            .fold(0u64, |acc, byte| (acc * 256 + u64::from(*byte)) % KEYSET_INDEX_MODULUS);
        // Reduced below 2^31 - 1, so it always fits
        index as u32
    }
}

impl fmt::Display for KeysetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeysetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeysetId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<KeysetId> for String {
    fn from(id: KeysetId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_index_vector() {
        let id = KeysetId::parse("009a1f293253e41e").unwrap();
        assert_eq!(id.derivation_index(), 864_559_728);
    }

    #[test]
    fn test_long_ids_reduce_without_overflow() {
        let id = KeysetId::parse(&"ff".repeat(33)).unwrap();
        assert!(u64::from(id.derivation_index()) < KEYSET_INDEX_MODULUS);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = KeysetId::parse(" 009A1F293253E41E ").unwrap();
        assert_eq!(id.as_str(), "009a1f293253e41e");
        assert_eq!(id, "009a1f293253e41e".parse().unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(KeysetId::parse("").is_err());
        assert!(KeysetId::parse("abc").is_err());
        assert!(KeysetId::parse("zz00").is_err());
    }
}
