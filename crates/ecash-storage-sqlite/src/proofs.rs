//! Proof storage
//!
//! The proof set only changes through [`ProofStore::replace`], which removes
//! spent proofs and inserts fresh ones in one transaction.

use crate::{with_busy_retry, Database, Error, Result};
use ecash_core::{KeysetId, Proof};
use rusqlite::params;
use std::collections::HashSet;

/// Proof storage operations
pub struct ProofStore<'a> {
    db: &'a Database,
}

impl<'a> ProofStore<'a> {
    /// Create proof store
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All stored proofs, oldest first
    pub fn load_all(&self) -> Result<Vec<Proof>> {
        let rows: Vec<(String, String, i64, String)> = with_busy_retry("proof load_all", || {
            let mut stmt = self.db.conn().prepare(
                "SELECT secret, id, amount, signature FROM proofs ORDER BY created_at, secret",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(secret, keyset_raw, amount_raw, signature)| {
                decode_proof(secret, &keyset_raw, amount_raw, signature)
            })
            .collect()
    }

    /// Atomically remove `remove` and insert `add`.
    ///
    /// Every removed secret must be present and every added secret must be
    /// new; otherwise nothing changes.
    pub fn replace(&self, remove: &[Proof], add: &[Proof]) -> Result<()> {
        let mut seen = HashSet::with_capacity(add.len());
        for proof in add {
            proof
                .validate()
                .map_err(|e| Error::Validation(e.to_string()))?;
            if !seen.insert(proof.secret.as_str()) {
                return Err(Error::DuplicateSecret(proof.secret.clone()));
            }
        }

        let created_at = chrono::Utc::now().timestamp();

        with_busy_retry("proof replace", || {
            let tx = self.db.write_transaction()?;

            for proof in remove {
                let deleted = tx.execute("DELETE FROM proofs WHERE secret = ?1", [&proof.secret])?;
                if deleted == 0 {
                    return Err(Error::NotFound(format!("proof {}", proof.secret)));
                }
            }

            for proof in add {
                let amount = i64::try_from(proof.amount).map_err(|_| {
                    Error::Validation(format!(
                        "proof {} amount {} exceeds storage range",
                        proof.secret, proof.amount
                    ))
                })?;
                let inserted = tx.execute(
                    r#"
                    INSERT OR IGNORE INTO proofs (secret, id, amount, signature, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        proof.secret,
                        proof.keyset_id.as_str(),
                        amount,
                        proof.signature,
                        created_at
                    ],
                )?;
                if inserted == 0 {
                    return Err(Error::DuplicateSecret(proof.secret.clone()));
                }
            }

            tx.commit()?;
            Ok(())
        })?;

        tracing::debug!(
            "Replaced proofs: removed={}, added={}",
            remove.len(),
            add.len()
        );
        Ok(())
    }

    /// Sum of stored amounts
    pub fn total_amount(&self) -> Result<u64> {
        let proofs = self.load_all()?;
        ecash_core::total_amount(&proofs).map_err(|e| Error::CorruptState(e.to_string()))
    }

    /// Number of stored proofs
    pub fn count(&self) -> Result<usize> {
        let count: i64 = with_busy_retry("proof count", || {
            Ok(self
                .db
                .conn()
                .query_row("SELECT COUNT(*) FROM proofs", [], |row| row.get(0))?)
        })?;
        usize::try_from(count).map_err(|_| Error::CorruptState(format!("proof count {}", count)))
    }
}

fn decode_proof(secret: String, keyset_raw: &str, amount_raw: i64, signature: String) -> Result<Proof> {
    let keyset_id = KeysetId::parse(keyset_raw)
        .map_err(|e| Error::CorruptState(format!("proofs row '{}': {}", secret, e)))?;
    let amount = u64::try_from(amount_raw).map_err(|_| {
        Error::CorruptState(format!("proofs row '{}': amount {}", secret, amount_raw))
    })?;

    let proof = Proof::new(keyset_id, amount, secret, signature);
    proof
        .validate()
        .map_err(|e| Error::CorruptState(e.to_string()))?;
    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_BUSY_TIMEOUT;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("wallet.sqlite"), DEFAULT_BUSY_TIMEOUT).unwrap();
        (dir, db)
    }

    fn proof(amount: u64, secret: &str) -> Proof {
        Proof::new(
            KeysetId::parse("009a1f293253e41e").unwrap(),
            amount,
            secret,
            format!("02{}", secret),
        )
    }

    fn secrets(proofs: &[Proof]) -> HashSet<String> {
        proofs.iter().map(|p| p.secret.clone()).collect()
    }

    #[test]
    fn test_empty_store() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);
        assert!(store.load_all().unwrap().is_empty());
        assert_eq!(store.total_amount().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_load() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);
        let added = vec![proof(2, "aa"), proof(8, "bb")];

        store.replace(&[], &added).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(secrets(&loaded), secrets(&added));
        assert_eq!(store.total_amount().unwrap(), 10);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_replace_swaps_sets() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);
        let a = proof(4, "aa");
        let b = proof(4, "bb");
        let c = proof(8, "cc");
        store.replace(&[], &[a.clone(), b.clone()]).unwrap();

        store.replace(&[a, b.clone()], &[c.clone()]).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![c]);
    }

    #[test]
    fn test_missing_removal_changes_nothing() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);
        let a = proof(4, "aa");
        store.replace(&[], &[a.clone()]).unwrap();

        let err = store
            .replace(&[a.clone(), proof(1, "zz")], &[proof(5, "cc")])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.load_all().unwrap(), vec![a]);
    }

    #[test]
    fn test_duplicate_secret_changes_nothing() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);
        let a = proof(4, "aa");
        store.replace(&[], &[a.clone()]).unwrap();

        let err = store.replace(&[], &[proof(1, "bb"), proof(2, "aa")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateSecret(s) if s == "aa"));
        assert_eq!(store.load_all().unwrap(), vec![a]);
    }

    #[test]
    fn test_duplicate_within_batch_rejected() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);

        let err = store.replace(&[], &[proof(1, "aa"), proof(2, "aa")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateSecret(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_proof_rejected() {
        let (_dir, db) = test_db();
        let store = ProofStore::new(&db);

        let err = store.replace(&[], &[proof(0, "aa")]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let too_large = proof(u64::MAX, "bb");
        let err = store.replace(&[], &[too_large]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_row_surfaces() {
        let (_dir, db) = test_db();
        db.conn()
            .execute(
                "INSERT INTO proofs (secret, id, amount, signature, created_at)
                 VALUES ('aa', '009a1f293253e41e', -1, '02aa', 0)",
                [],
            )
            .unwrap();

        let store = ProofStore::new(&db);
        assert!(matches!(store.load_all(), Err(Error::CorruptState(_))));
        assert!(matches!(store.total_amount(), Err(Error::CorruptState(_))));
    }
}
