//! Read-only balance aggregation

use crate::Result;
use ecash_core::{Error as CoreError, KeysetId, Proof};
use ecash_storage_sqlite::ProofStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated stored value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Sum of all proof amounts
    pub total: u64,
    /// Number of stored proofs
    pub proof_count: usize,
    /// Sum per keyset
    pub by_keyset: BTreeMap<KeysetId, u64>,
}

/// Balance computation over stored proofs
pub struct BalanceView;

impl BalanceView {
    /// Aggregate `proofs`, failing on overflow
    pub fn from_proofs(proofs: &[Proof]) -> Result<Balance> {
        let mut balance = Balance::default();

        for proof in proofs {
            balance.total = checked_add(balance.total, proof.amount)?;
            let keyset_total = balance.by_keyset.entry(proof.keyset_id.clone()).or_insert(0);
            *keyset_total = checked_add(*keyset_total, proof.amount)?;
            balance.proof_count += 1;
        }

        Ok(balance)
    }

    /// Aggregate everything in `store`
    pub fn load(store: &ProofStore<'_>) -> Result<Balance> {
        let proofs = store.load_all()?;
        Self::from_proofs(&proofs)
    }
}

fn checked_add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b)
        .ok_or_else(|| CoreError::AmountOverflow(format!("{} + {}", a, b)).into())
}
