//! Keyset counter storage
//!
//! `next` is the first derivation index not yet handed out for a keyset.
//! Rows are created on first use and only ever move forward.

use crate::{with_busy_retry, Database, Error, Result};
use ecash_core::{CounterSnapshot, KeysetId, Reservation, MAX_COUNTER};
use rusqlite::{params, OptionalExtension};

/// Counter storage operations
pub struct CounterStore<'a> {
    db: &'a Database,
}

impl<'a> CounterStore<'a> {
    /// Create counter store
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persisted `next` for a keyset, 0 if the keyset was never used
    pub fn load(&self, keyset_id: &KeysetId) -> Result<u32> {
        let raw: Option<i64> = with_busy_retry("counter load", || {
            Ok(self
                .db
                .conn()
                .query_row(
                    "SELECT next FROM counters WHERE keyset_id = ?1",
                    [keyset_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match raw {
            Some(raw) => decode_next(keyset_id.as_str(), raw),
            None => Ok(0),
        }
    }

    /// Load every counter into a snapshot for one operation
    pub fn load_all(&self) -> Result<CounterSnapshot> {
        let rows: Vec<(String, i64)> = with_busy_retry("counter load_all", || {
            let mut stmt = self
                .db
                .conn()
                .prepare("SELECT keyset_id, next FROM counters ORDER BY keyset_id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(keyset_raw, next_raw)| {
                let keyset_id = KeysetId::parse(&keyset_raw).map_err(|e| {
                    Error::CorruptState(format!("counters row '{}': {}", keyset_raw, e))
                })?;
                let next = decode_next(&keyset_raw, next_raw)?;
                Ok((keyset_id, next))
            })
            .collect()
    }

    /// Durably write the counter value a reservation ends at.
    ///
    /// Returns only after the transaction has committed. A stored value
    /// greater than `reservation.next` is never overwritten.
    pub fn persist(&self, reservation: &Reservation) -> Result<()> {
        let keyset = reservation.keyset_id.as_str();
        let updated_at = chrono::Utc::now().timestamp();

        with_busy_retry("counter persist", || {
            let tx = self.db.write_transaction()?;

            let stored: Option<i64> = tx
                .query_row(
                    "SELECT next FROM counters WHERE keyset_id = ?1",
                    [keyset],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(raw) = stored {
                let stored = decode_next(keyset, raw)?;
                if stored > reservation.next {
                    return Err(Error::CounterRegression {
                        keyset_id: keyset.to_string(),
                        stored,
                        requested: reservation.next,
                    });
                }
            }

            tx.execute(
                r#"
                INSERT INTO counters (keyset_id, next, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(keyset_id) DO UPDATE SET
                    next = excluded.next,
                    updated_at = excluded.updated_at
                "#,
                params![keyset, i64::from(reservation.next), updated_at],
            )?;

            tx.commit()?;
            Ok(())
        })?;

        tracing::debug!(
            "Persisted counter for keyset {}: reserved [{}, {}), next={}",
            keyset,
            reservation.start,
            reservation.next,
            reservation.next
        );
        Ok(())
    }
}

fn decode_next(keyset: &str, raw: i64) -> Result<u32> {
    u32::try_from(raw)
        .ok()
        .filter(|next| *next <= MAX_COUNTER)
        .ok_or_else(|| {
            Error::CorruptState(format!(
                "counters row '{}': next {} outside 0..={}",
                keyset, raw, MAX_COUNTER
            ))
        })
}
