//! Proof model

use crate::{Error, KeysetId, Result};
use serde::{Deserialize, Serialize};

/// Unspent value fragment issued by a mint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proof {
    /// Keyset that signed the proof
    #[serde(rename = "id")]
    pub keyset_id: KeysetId,
    /// Value in the wallet unit
    pub amount: u64,
    /// Secret, unique within a store
    pub secret: String,
    /// Mint signature over the secret
    #[serde(rename = "C")]
    pub signature: String,
}

impl Proof {
    /// Create new proof
    pub fn new(
        keyset_id: KeysetId,
        amount: u64,
        secret: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            keyset_id,
            amount,
            secret: secret.into(),
            signature: signature.into(),
        }
    }

    /// Check field invariants
    pub fn validate(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(Error::InvalidProof(format!(
                "proof {} has zero amount",
                self.secret
            )));
        }
        if self.secret.is_empty() {
            return Err(Error::InvalidProof("proof has empty secret".to_string()));
        }
        if self.signature.is_empty() {
            return Err(Error::InvalidProof(format!(
                "proof {} has empty signature",
                self.secret
            )));
        }
        Ok(())
    }
}

/// Sum proof amounts, failing on overflow
pub fn total_amount<'a, I>(proofs: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a Proof>,
{
    proofs.into_iter().try_fold(0u64, |acc, proof| {
        acc.checked_add(proof.amount)
            .ok_or_else(|| Error::AmountOverflow("proof total exceeds u64".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(amount: u64, secret: &str) -> Proof {
        Proof::new(KeysetId::parse("00ad268c4d1f5826").unwrap(), amount, secret, "02ab")
    }

    #[test]
    fn test_total_amount() {
        let proofs = vec![proof(1, "a"), proof(2, "b"), proof(64, "c")];
        assert_eq!(total_amount(&proofs).unwrap(), 67);
        assert_eq!(total_amount(&Vec::<Proof>::new()).unwrap(), 0);
    }

    #[test]
    fn test_total_amount_overflow() {
        let proofs = vec![proof(u64::MAX, "a"), proof(1, "b")];
        assert!(matches!(total_amount(&proofs), Err(Error::AmountOverflow(_))));
    }

    #[test]
    fn test_validate() {
        assert!(proof(8, "s").validate().is_ok());
        assert!(proof(0, "s").validate().is_err());
        assert!(proof(8, "").validate().is_err());
        assert!(Proof::new(KeysetId::parse("00").unwrap(), 1, "s", "")
            .validate()
            .is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(proof(4, "s")).unwrap();
        assert_eq!(value["id"], "00ad268c4d1f5826");
        assert_eq!(value["C"], "02ab");
    }
}
