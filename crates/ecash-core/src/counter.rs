//! Counter reservation arithmetic
//!
//! A [`CounterSnapshot`] holds the known `next` index of every keyset for the
//! length of one operation. Reserving from it is pure; persisting the
//! resulting [`Reservation`] is the storage layer's job.

use crate::params::MAX_COUNTER;
use crate::{Error, KeysetId, Result};
use std::collections::BTreeMap;
use std::ops::Range;

/// Index range carved out of a keyset counter for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Keyset the indices belong to
    pub keyset_id: KeysetId,
    /// First reserved index
    pub start: u32,
    /// Number of reserved indices
    pub count: u32,
    /// Counter value once the range is consumed (`start + count`)
    pub next: u32,
}

impl Reservation {
    /// Reserve `count` indices after `current_next`
    pub fn new(keyset_id: KeysetId, current_next: u32, count: u32) -> Result<Self> {
        let next = current_next
            .checked_add(count)
            .filter(|next| *next <= MAX_COUNTER)
            .ok_or_else(|| {
                Error::CounterExhausted(format!(
                    "keyset {} cannot reserve {} indices after {}",
                    keyset_id, count, current_next
                ))
            })?;

        Ok(Self {
            keyset_id,
            start: current_next,
            count,
            next,
        })
    }

    /// True when no indices were reserved
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reserved indices
    pub fn indices(&self) -> Range<u32> {
        self.start..self.next
    }
}

/// In-memory view of all keyset counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    counters: BTreeMap<KeysetId, u32>,
}

impl CounterSnapshot {
    /// Empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Known `next` for a keyset, or 0 if the keyset was never used
    pub fn next(&self, keyset_id: &KeysetId) -> u32 {
        self.counters.get(keyset_id).copied().unwrap_or(0)
    }

    /// Reserve `count` indices and advance the snapshot past them.
    ///
    /// Does not persist anything.
    pub fn reserve(&mut self, keyset_id: &KeysetId, count: u32) -> Result<Reservation> {
        let reservation = Reservation::new(keyset_id.clone(), self.next(keyset_id), count)?;
        self.counters.insert(keyset_id.clone(), reservation.next);
        Ok(reservation)
    }

    /// Iterate `(keyset, next)` pairs in keyset order
    pub fn iter(&self) -> impl Iterator<Item = (&KeysetId, u32)> {
        self.counters.iter().map(|(id, next)| (id, *next))
    }

    /// Number of keysets with a counter
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// True when no keyset has a counter
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl FromIterator<(KeysetId, u32)> for CounterSnapshot {
    fn from_iter<I: IntoIterator<Item = (KeysetId, u32)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyset() -> KeysetId {
        KeysetId::parse("009a1f293253e41e").unwrap()
    }

    #[test]
    fn test_reserve_from_empty() {
        let mut snapshot = CounterSnapshot::new();
        let r = snapshot.reserve(&keyset(), 4).unwrap();
        assert_eq!((r.start, r.count, r.next), (0, 4, 4));
        assert_eq!(snapshot.next(&keyset()), 4);
    }

    #[test]
    fn test_consecutive_reservations_do_not_overlap() {
        let mut snapshot: CounterSnapshot = [(keyset(), 10)].into_iter().collect();
        let a = snapshot.reserve(&keyset(), 3).unwrap();
        let b = snapshot.reserve(&keyset(), 2).unwrap();
        assert_eq!(a.indices(), 10..13);
        assert_eq!(b.indices(), 13..15);
    }

    #[test]
    fn test_empty_reservation() {
        let mut snapshot = CounterSnapshot::new();
        let r = snapshot.reserve(&keyset(), 0).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.next, 0);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let mut snapshot: CounterSnapshot = [(keyset(), MAX_COUNTER - 1)].into_iter().collect();
        assert!(snapshot.reserve(&keyset(), 1).is_ok());
        let err = snapshot.reserve(&keyset(), 1).unwrap_err();
        assert!(matches!(err, Error::CounterExhausted(_)));
        // Failed reservation leaves the snapshot where it was
        assert_eq!(snapshot.next(&keyset()), MAX_COUNTER);
    }
}
