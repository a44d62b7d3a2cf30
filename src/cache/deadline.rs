//! Deadline Index Module
//!
//! Orders live entries by expiration so the earliest deadline can be found
//! without scanning the whole cache.

use std::collections::btree_map::{BTreeMap, Entry};

use crate::cache::entry::Deadline;

// == Deadline Key ==
/// Fixed-width big-endian encoding of a [`Deadline`].
///
/// The sign bit is flipped before encoding, so byte-lexicographic order of
/// keys equals chronological order across the whole `i64` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeadlineKey([u8; 8]);

const SIGN_BIT: u64 = 1 << 63;

impl DeadlineKey {
    /// Encodes a deadline into its sortable byte form.
    pub fn encode(deadline: Deadline) -> Self {
        Self(((deadline.as_nanos() as u64) ^ SIGN_BIT).to_be_bytes())
    }

    /// Recovers the deadline without any string or numeric parsing.
    pub fn decode(self) -> Deadline {
        Deadline::from_nanos((u64::from_be_bytes(self.0) ^ SIGN_BIT) as i64)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<Deadline> for DeadlineKey {
    fn from(deadline: Deadline) -> Self {
        Self::encode(deadline)
    }
}

// == Deadline Index ==
/// Maps encoded deadlines to the key of the entry expiring at that instant.
#[derive(Debug)]
pub struct DeadlineIndex<K> {
    tree: BTreeMap<DeadlineKey, K>,
}

impl<K> Default for DeadlineIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DeadlineIndex<K> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Records `key` as expiring at `deadline`.
    ///
    /// Returns true on conflict, in which case the existing slot is left untouched.
    pub fn insert(&mut self, deadline: DeadlineKey, key: K) -> bool {
        match self.tree.entry(deadline) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(key);
                false
            }
        }
    }

    // == Delete ==
    /// Removes the slot for `deadline`, returning whether it existed.
    pub fn delete(&mut self, deadline: DeadlineKey) -> bool {
        self.tree.remove(&deadline).is_some()
    }

    // == Minimum ==
    /// Returns the earliest deadline and its key.
    pub fn minimum(&self) -> Option<(DeadlineKey, &K)> {
        self.tree.first_key_value().map(|(deadline, key)| (*deadline, key))
    }

    // == Contains ==
    pub fn contains(&self, deadline: DeadlineKey) -> bool {
        self.tree.contains_key(&deadline)
    }

    // == Vacant Before ==
    /// Returns the latest vacant slot at or before `deadline`.
    ///
    /// Walks back over the run of consecutive occupied slots ending at
    /// `deadline`. Returns `None` only if that run reaches the earliest
    /// representable deadline.
    pub fn vacant_before(&self, deadline: DeadlineKey) -> Option<DeadlineKey> {
        let mut candidate = deadline.decode();
        for (occupied, _) in self.tree.range(..=deadline).rev() {
            if *occupied != DeadlineKey::encode(candidate) {
                break;
            }
            candidate = candidate.checked_add_nanos(-1)?;
        }
        Some(candidate.into())
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Iterates slots in chronological order.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&DeadlineKey, &K)> + '_ {
        self.tree.iter()
    }
}
