//! Key routing onto a dynamic set of nodes.
//!
//! The `BucketRouter` composes a bucket engine with an [`Indirection`]: the
//! engine maps keys onto bucket indices with minimal disruption, and the
//! indirection names the node owning each bucket.
//!
//! ```text
//! key --engine.get_bucket--> bucket --indirection.get_node--> node
//! ```
//!
//! # Tiger Style
//!
//! - Explicit bounds: node count limited by `MAX_BUCKETS` through the engine
//! - Validate before mutating: unknown or duplicate nodes are rejected before
//!   the engine or the indirection changes
//! - Single owner: mutation takes `&mut self`, callers serialize access

use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::BucketEngine;
use crate::error::NodeAlreadyBoundSnafu;
use crate::error::Result;
use crate::indirection::Indirection;

/// Routes keys to nodes using a bucket engine.
pub struct BucketRouter<N> {
    /// Engine configuration.
    config: EngineConfig,
    /// Key -> bucket.
    engine: Box<dyn BucketEngine>,
    /// Bucket <-> node.
    indirection: Indirection<N>,
}

impl<N: Eq + Hash + Clone + fmt::Debug> BucketRouter<N> {
    /// Create a router over `nodes`, binding them to buckets in iteration order.
    ///
    /// The engine is sized to the node count; `config.initial_size` is ignored.
    ///
    /// # Errors
    ///
    /// - `InvalidSize` if `nodes` is empty or larger than `MAX_BUCKETS`
    /// - `NodeAlreadyBound` if a node appears twice
    pub fn new(config: EngineConfig, nodes: impl IntoIterator<Item = N>) -> Result<Self> {
        let nodes: Vec<N> = nodes.into_iter().collect();
        let size = u32::try_from(nodes.len()).unwrap_or(u32::MAX);
        let engine = config.build_with_size(size)?;

        let mut indirection = Indirection::new();
        for (bucket, node) in (0..size).zip(nodes) {
            indirection.put(node, bucket)?;
        }
        debug!(algorithm = %config.algorithm, nodes = size, "bucket router created");

        Ok(Self {
            config,
            engine,
            indirection,
        })
    }

    /// Node owning `key`.
    pub fn get_node(&self, key: &[u8]) -> Result<&N> {
        let bucket = self.engine.get_bucket(key);
        self.indirection.get_node(bucket)
    }

    /// Bucket currently owned by `node`.
    pub fn bucket_of(&self, node: &N) -> Result<u32> {
        self.indirection.get_bucket(node)
    }

    /// Add `node` and return the bucket it now owns.
    ///
    /// Engines with removal history hand back the most recently removed bucket;
    /// otherwise the node gets a fresh bucket at the top of the range.
    pub fn add_node(&mut self, node: N) -> Result<u32> {
        if let Ok(bucket) = self.indirection.get_bucket(&node) {
            return NodeAlreadyBoundSnafu { bucket }.fail();
        }

        let bucket = self.engine.add_bucket()?;
        // Restored buckets may lie above the retracted capacity.
        self.indirection.bind(node.clone(), bucket)?;

        debug!(?node, bucket, size = self.engine.size(), array_size = self.engine.array_size(), "node added");
        Ok(bucket)
    }

    /// Remove `node` and return the bucket it owned.
    ///
    /// # Errors
    ///
    /// - `NodeNotBound` if the node is unknown
    /// - engine preconditions, e.g. `NotTopBucket` on LIFO engines or
    ///   `LastBucket` when `node` is the only one left
    pub fn remove_node(&mut self, node: &N) -> Result<u32> {
        let bucket = self.indirection.get_bucket(node)?;
        self.engine.remove_bucket(bucket)?;
        self.indirection.remove_bucket(bucket)?;

        debug!(?node, bucket, size = self.engine.size(), array_size = self.engine.array_size(), "node removed");
        Ok(bucket)
    }

    /// Whether `node` is routed to.
    #[inline]
    pub fn contains_node(&self, node: &N) -> bool {
        self.indirection.contains_node(node)
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> u32 {
        self.indirection.size()
    }

    /// Nodes with their buckets, in bucket order.
    pub fn nodes(&self) -> impl Iterator<Item = (u32, &N)> + '_ {
        self.indirection.iter()
    }

    /// The underlying engine.
    pub fn engine(&self) -> &dyn BucketEngine {
        self.engine.as_ref()
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<N: fmt::Debug> fmt::Debug for BucketRouter<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketRouter")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("indirection", &self.indirection)
            .finish()
    }
}
