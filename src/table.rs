//! Chained hash table keyed by small non-negative integers.
//!
//! Engines store their per-bucket bookkeeping here. Keys are bucket ids, which
//! tend to be small and sequential, so the slot index is computed from a
//! spread key (`k ^ (k >> 16)`) masked by the power-of-two chain count.
//!
//! ```text
//! chains: [ 0 ] -> entry(16) -> entry(0)
//!         [ 1 ] -> entry(1)
//!         [ 2 ]
//!         ...
//!         [15 ] -> entry(15)
//! ```
//!
//! The table does not enforce key uniqueness: several entries may share a key,
//! and `get`/`remove` always act on the most recently added one. Resizing keeps
//! the relative order of entries that share a key, so callers can use a key's
//! entries as a stack.
//!
//! # Tiger Style
//!
//! - Fixed limits: chain count bounded by `TABLE_MIN_CAPACITY..=TABLE_MAX_CAPACITY`
//! - Resizing is local and synchronous, driven only by the load thresholds

use std::fmt;
use std::iter;

use tracing::trace;

use crate::constants::TABLE_GROW_DENOMINATOR;
use crate::constants::TABLE_GROW_NUMERATOR;
use crate::constants::TABLE_MAX_CAPACITY;
use crate::constants::TABLE_MIN_CAPACITY;
use crate::constants::TABLE_SHRINK_DENOMINATOR;
use crate::constants::TABLE_SHRINK_NUMERATOR;

/// An entry that can be stored in a [`ChainedIndexTable`].
pub trait TableEntry {
    /// The integer key the entry is filed under.
    fn key(&self) -> u32;
}

struct Link<E> {
    entry: E,
    next: Option<Box<Link<E>>>,
}

/// Hash table of entries keyed by `u32`, with separate chaining.
pub struct ChainedIndexTable<E> {
    chains: Vec<Option<Box<Link<E>>>>,
    len: usize,
}

impl<E: TableEntry> ChainedIndexTable<E> {
    /// Create an empty table with `TABLE_MIN_CAPACITY` chains.
    pub fn new() -> Self {
        Self {
            chains: empty_chains(TABLE_MIN_CAPACITY),
            len: 0,
        }
    }

    /// Number of entries stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chains currently allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chains.len()
    }

    /// Most recently added entry filed under `key`.
    pub fn get(&self, key: u32) -> Option<&E> {
        let mut link = self.chains[self.slot(key)].as_deref();
        while let Some(node) = link {
            if node.entry.key() == key {
                return Some(&node.entry);
            }
            link = node.next.as_deref();
        }
        None
    }

    /// Mutable access to the most recently added entry filed under `key`.
    pub fn get_mut(&mut self, key: u32) -> Option<&mut E> {
        let slot = self.slot(key);
        let mut link = self.chains[slot].as_deref_mut();
        while let Some(node) = link {
            if node.entry.key() == key {
                return Some(&mut node.entry);
            }
            link = node.next.as_deref_mut();
        }
        None
    }

    /// Whether at least one entry is filed under `key`.
    #[inline]
    pub fn contains_key(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    /// Insert an entry, doubling the chain count once the load factor is exceeded.
    pub fn add(&mut self, entry: E) {
        let slot = self.slot(entry.key());
        let next = self.chains[slot].take();
        self.chains[slot] = Some(Box::new(Link { entry, next }));
        self.len += 1;

        let capacity = self.capacity();
        if capacity < TABLE_MAX_CAPACITY && self.len * TABLE_GROW_DENOMINATOR > capacity * TABLE_GROW_NUMERATOR {
            self.resize(capacity * 2);
        }
    }

    /// Remove and return the most recently added entry filed under `key`.
    ///
    /// Halves the chain count once the table drops to a quarter of the load
    /// factor, never going below `TABLE_MIN_CAPACITY`.
    pub fn remove(&mut self, key: u32) -> Option<E> {
        let slot = self.slot(key);
        let mut cursor = &mut self.chains[slot];
        while cursor.as_ref().is_some_and(|link| link.entry.key() != key) {
            cursor = &mut cursor.as_mut()?.next;
        }
        let link = cursor.take()?;
        let Link { entry, next } = *link;
        *cursor = next;
        self.len -= 1;

        let capacity = self.capacity();
        if capacity > TABLE_MIN_CAPACITY && self.len * TABLE_SHRINK_DENOMINATOR <= capacity * TABLE_SHRINK_NUMERATOR {
            self.resize(capacity / 2);
        }
        Some(entry)
    }

    /// Iterate over every entry, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.chains
            .iter()
            .flat_map(|head| iter::successors(head.as_deref(), |link| link.next.as_deref()))
            .map(|link| &link.entry)
    }

    #[inline]
    fn slot(&self, key: u32) -> usize {
        (self.chains.len() - 1) & spread(key) as usize
    }

    fn resize(&mut self, capacity: usize) {
        trace!(from = self.chains.len(), to = capacity, len = self.len, "resizing chained index table");
        let old = std::mem::replace(&mut self.chains, empty_chains(capacity));
        let mask = capacity - 1;
        let mut detached = Vec::new();

        for mut head in old {
            while let Some(mut link) = head {
                head = link.next.take();
                detached.push(link);
            }
            // Re-link back to front: pushing on chain heads then restores the
            // original order of each destination chain.
            for mut link in detached.drain(..).rev() {
                let slot = mask & spread(link.entry.key()) as usize;
                link.next = self.chains[slot].take();
                self.chains[slot] = Some(link);
            }
        }
    }
}

impl<E: TableEntry> Default for ChainedIndexTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ChainedIndexTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedIndexTable").field("len", &self.len).field("capacity", &self.chains.len()).finish()
    }
}

impl<E> Drop for ChainedIndexTable<E> {
    fn drop(&mut self) {
        // Unlink iteratively so that a long chain cannot overflow the stack.
        for chain in &mut self.chains {
            let mut head = chain.take();
            while let Some(mut link) = head {
                head = link.next.take();
            }
        }
    }
}

/// Decorrelate low bits of small sequential keys.
#[inline]
fn spread(key: u32) -> u32 {
    key ^ (key >> 16)
}

fn empty_chains<E>(capacity: usize) -> Vec<Option<Box<Link<E>>>> {
    iter::repeat_with(|| None).take(capacity).collect()
}
