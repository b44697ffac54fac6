//! Bidirectional binding between node identities and bucket indices.
//!
//! Engines only know buckets `[0, array_size)`. The indirection remembers which
//! node owns which bucket so that a router can translate in both directions.
//!
//! # Capacity
//!
//! `capacity()` is always the highest bound bucket plus one (zero when empty).
//! Binding at `bucket == capacity` appends; a vacant bucket below the capacity
//! can be refilled, which is what happens when an engine restores a bucket it
//! removed earlier. Unbinding the highest bucket retracts the capacity through
//! every vacated trailing slot.
//!
//! ```text
//! buckets:  [a][ ][c][d]        capacity 4
//! remove d: [a][ ][c]           capacity 3
//! remove c: [a]                 capacity 1
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use snafu::ensure;
use snafu::OptionExt;

use crate::error::BucketBeyondCapacitySnafu;
use crate::error::BucketNotBoundSnafu;
use crate::error::BucketOccupiedSnafu;
use crate::error::NodeAlreadyBoundSnafu;
use crate::error::NodeNotBoundSnafu;
use crate::error::Result;

/// Node <-> bucket map with trailing compaction.
#[derive(Debug, Clone)]
pub struct Indirection<N> {
    node_to_bucket: HashMap<N, u32>,
    bucket_to_node: HashMap<u32, N>,
    capacity: u32,
}

impl<N: Eq + Hash + Clone> Indirection<N> {
    /// Create an empty indirection.
    pub fn new() -> Self {
        Self {
            node_to_bucket: HashMap::new(),
            bucket_to_node: HashMap::new(),
            capacity: 0,
        }
    }

    /// Bind `node` to `bucket`.
    ///
    /// # Errors
    ///
    /// - `BucketBeyondCapacity` if `bucket > capacity()`
    /// - `NodeAlreadyBound` if the node already owns a bucket
    /// - `BucketOccupied` if another node owns the bucket
    pub fn put(&mut self, node: N, bucket: u32) -> Result<()> {
        ensure!(
            bucket <= self.capacity,
            BucketBeyondCapacitySnafu {
                bucket,
                capacity: self.capacity
            }
        );
        self.bind(node, bucket)
    }

    /// Bind `node` to `bucket` wherever it lies, growing the capacity past it.
    ///
    /// An engine that keeps its array size after losing its top bucket may
    /// restore a bucket above the retracted capacity; routers re-bind such
    /// buckets here.
    ///
    /// # Errors
    ///
    /// - `NodeAlreadyBound` if the node already owns a bucket
    /// - `BucketOccupied` if another node owns the bucket
    pub fn bind(&mut self, node: N, bucket: u32) -> Result<()> {
        if let Some(&bound) = self.node_to_bucket.get(&node) {
            return NodeAlreadyBoundSnafu { bucket: bound }.fail();
        }
        ensure!(!self.bucket_to_node.contains_key(&bucket), BucketOccupiedSnafu { bucket });

        self.node_to_bucket.insert(node.clone(), bucket);
        self.bucket_to_node.insert(bucket, node);
        self.capacity = self.capacity.max(bucket + 1);
        Ok(())
    }

    /// Bucket owned by `node`.
    pub fn get_bucket(&self, node: &N) -> Result<u32> {
        self.node_to_bucket.get(node).copied().context(NodeNotBoundSnafu)
    }

    /// Node owning `bucket`.
    pub fn get_node(&self, bucket: u32) -> Result<&N> {
        self.bucket_to_node.get(&bucket).context(BucketNotBoundSnafu { bucket })
    }

    /// Unbind `node` and return the bucket it owned.
    pub fn remove_node(&mut self, node: &N) -> Result<u32> {
        let bucket = self.node_to_bucket.remove(node).context(NodeNotBoundSnafu)?;
        self.bucket_to_node.remove(&bucket);
        self.retract(bucket);
        Ok(bucket)
    }

    /// Unbind `bucket` and return the node that owned it.
    pub fn remove_bucket(&mut self, bucket: u32) -> Result<N> {
        let node = self.bucket_to_node.remove(&bucket).context(BucketNotBoundSnafu { bucket })?;
        self.node_to_bucket.remove(&node);
        self.retract(bucket);
        Ok(node)
    }

    /// Whether `node` owns a bucket.
    #[inline]
    pub fn contains_node(&self, node: &N) -> bool {
        self.node_to_bucket.contains_key(node)
    }

    /// Whether `bucket` is bound to a node.
    #[inline]
    pub fn contains_bucket(&self, bucket: u32) -> bool {
        self.bucket_to_node.contains_key(&bucket)
    }

    /// Number of bindings.
    #[inline]
    pub fn size(&self) -> u32 {
        self.bucket_to_node.len() as u32
    }

    /// Highest bound bucket plus one.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Bindings in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &N)> + '_ {
        (0..self.capacity).filter_map(|bucket| self.bucket_to_node.get(&bucket).map(|node| (bucket, node)))
    }

    fn retract(&mut self, bucket: u32) {
        if bucket + 1 != self.capacity {
            return;
        }
        self.capacity = bucket;
        while self.capacity > 0 && !self.bucket_to_node.contains_key(&(self.capacity - 1)) {
            self.capacity -= 1;
        }
    }
}

impl<N: Eq + Hash + Clone> Default for Indirection<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BucketError;

    fn filled(nodes: &[&'static str]) -> Indirection<&'static str> {
        let mut indirection = Indirection::new();
        for (bucket, node) in nodes.iter().enumerate() {
            indirection.put(*node, bucket as u32).unwrap();
        }
        indirection
    }

    #[test]
    fn test_put_and_lookup_both_ways() {
        let indirection = filled(&["a", "b", "c"]);
        assert_eq!(indirection.capacity(), 3);
        assert_eq!(indirection.size(), 3);
        assert_eq!(indirection.get_bucket(&"b").unwrap(), 1);
        assert_eq!(*indirection.get_node(2).unwrap(), "c");
        assert!(indirection.contains_node(&"a"));
        assert!(!indirection.contains_bucket(3));
    }

    #[test]
    fn test_put_rejects_conflicts() {
        let mut indirection = filled(&["a", "b"]);
        assert_eq!(indirection.put("z", 5), Err(BucketError::BucketBeyondCapacity { bucket: 5, capacity: 2 }));
        assert_eq!(indirection.put("a", 2), Err(BucketError::NodeAlreadyBound { bucket: 0 }));
        assert_eq!(indirection.put("z", 1), Err(BucketError::BucketOccupied { bucket: 1 }));
        assert_eq!(indirection.size(), 2);
        assert_eq!(indirection.capacity(), 2);
    }

    #[test]
    fn test_missing_bindings() {
        let mut indirection = filled(&["a"]);
        assert_eq!(indirection.get_bucket(&"x"), Err(BucketError::NodeNotBound));
        assert_eq!(indirection.get_node(4), Err(BucketError::BucketNotBound { bucket: 4 }));
        assert_eq!(indirection.remove_node(&"x"), Err(BucketError::NodeNotBound));
        assert_eq!(indirection.remove_bucket(4), Err(BucketError::BucketNotBound { bucket: 4 }));
    }

    #[test]
    fn test_interior_removal_keeps_capacity() {
        let mut indirection = filled(&["a", "b", "c", "d"]);
        assert_eq!(indirection.remove_node(&"b").unwrap(), 1);
        assert_eq!(indirection.capacity(), 4);
        assert_eq!(indirection.size(), 3);

        // Refill the hole.
        indirection.put("e", 1).unwrap();
        assert_eq!(indirection.capacity(), 4);
        assert_eq!(*indirection.get_node(1).unwrap(), "e");
    }

    #[test]
    fn test_trailing_removal_compacts_through_holes() {
        let mut indirection = filled(&["a", "b", "c", "d"]);
        indirection.remove_bucket(1).unwrap();
        indirection.remove_bucket(2).unwrap();
        assert_eq!(indirection.capacity(), 4);

        assert_eq!(indirection.remove_bucket(3).unwrap(), "d");
        assert_eq!(indirection.capacity(), 1);

        indirection.remove_node(&"a").unwrap();
        assert_eq!(indirection.capacity(), 0);
        assert_eq!(indirection.size(), 0);
    }

    #[test]
    fn test_bind_above_retracted_capacity() {
        let mut indirection = filled(&["a", "b", "c", "d"]);
        indirection.remove_bucket(1).unwrap();
        indirection.remove_bucket(3).unwrap();
        indirection.remove_bucket(2).unwrap();
        assert_eq!(indirection.capacity(), 1);

        assert_eq!(indirection.put("c", 2), Err(BucketError::BucketBeyondCapacity { bucket: 2, capacity: 1 }));
        indirection.bind("c", 2).unwrap();
        assert_eq!(indirection.capacity(), 3);
        indirection.bind("d", 3).unwrap();
        indirection.bind("b", 1).unwrap();
        assert_eq!(indirection.capacity(), 4);
        assert_eq!(indirection.bind("a", 5), Err(BucketError::NodeAlreadyBound { bucket: 0 }));
        assert_eq!(indirection.bind("z", 3), Err(BucketError::BucketOccupied { bucket: 3 }));
        assert_eq!(indirection.capacity(), 4);
    }

    #[test]
    fn test_iter_in_bucket_order() {
        let mut indirection = filled(&["a", "b", "c"]);
        indirection.remove_node(&"b").unwrap();
        let bindings: Vec<_> = indirection.iter().map(|(bucket, node)| (bucket, *node)).collect();
        assert_eq!(bindings, vec![(0, "a"), (2, "c")]);
    }
}
