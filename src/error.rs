//! Error types for bucket engines, indirection and routing.

use snafu::Snafu;

/// Errors returned by this crate.
///
/// Every variant except [`BucketError::UnknownAlgorithm`],
/// [`BucketError::UnknownHashFunction`] and [`BucketError::InvalidValue`] is a
/// precondition violation: the call sequence was malformed and the operation was
/// rejected before any state changed.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum BucketError {
    /// Engine size outside of `MIN_BUCKETS..=MAX_BUCKETS`.
    #[snafu(display("invalid bucket count {size}: must be between {min} and {max}"))]
    InvalidSize {
        /// The requested size.
        size: u32,
        /// Smallest accepted size.
        min: u32,
        /// Largest accepted size.
        max: u32,
    },

    /// The bucket index is not below the engine's array size.
    #[snafu(display("bucket {bucket} out of range (array size {array_size})"))]
    BucketOutOfRange {
        /// The offending bucket.
        bucket: u32,
        /// The engine's array size.
        array_size: u32,
    },

    /// The bucket was already removed.
    #[snafu(display("bucket {bucket} is not a working bucket"))]
    BucketNotLive {
        /// The offending bucket.
        bucket: u32,
    },

    /// LIFO engines can only remove their highest bucket.
    #[snafu(display("bucket {bucket} cannot be removed: only the top bucket {top} may be removed"))]
    NotTopBucket {
        /// The offending bucket.
        bucket: u32,
        /// The only removable bucket.
        top: u32,
    },

    /// Removing the bucket would leave the engine with no working bucket.
    #[snafu(display("cannot remove bucket {bucket}: it is the last working bucket"))]
    LastBucket {
        /// The offending bucket.
        bucket: u32,
    },

    /// Adding a bucket would exceed `MAX_BUCKETS`.
    #[snafu(display("bucket capacity exhausted (max {max})"))]
    CapacityExhausted {
        /// The bucket limit.
        max: u32,
    },

    /// The node is already bound to a bucket.
    #[snafu(display("node already bound to bucket {bucket}"))]
    NodeAlreadyBound {
        /// Bucket the node is bound to.
        bucket: u32,
    },

    /// The bucket is already bound to a node.
    #[snafu(display("bucket {bucket} is already occupied"))]
    BucketOccupied {
        /// The occupied bucket.
        bucket: u32,
    },

    /// The bucket lies past the end of the indirection.
    #[snafu(display("bucket {bucket} beyond indirection capacity {capacity}"))]
    BucketBeyondCapacity {
        /// The offending bucket.
        bucket: u32,
        /// Current indirection capacity.
        capacity: u32,
    },

    /// The node has no binding.
    #[snafu(display("node is not bound to any bucket"))]
    NodeNotBound,

    /// The bucket has no binding.
    #[snafu(display("bucket {bucket} is not bound to any node"))]
    BucketNotBound {
        /// The offending bucket.
        bucket: u32,
    },

    /// No engine is registered under this name.
    #[snafu(display("unknown algorithm '{name}'"))]
    UnknownAlgorithm {
        /// The requested name.
        name: String,
    },

    /// No hash function is registered under this name.
    #[snafu(display("unknown hash function '{name}'"))]
    UnknownHashFunction {
        /// The requested name.
        name: String,
    },

    /// A configuration value could not be parsed.
    #[snafu(display("invalid configuration for {key}: '{value}' ({reason})"))]
    InvalidValue {
        /// Configuration key, e.g. the environment variable name.
        key: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl BucketError {
    /// Returns `true` when the error reports a malformed call sequence rather than
    /// a configuration problem.
    pub fn is_precondition_violation(&self) -> bool {
        !matches!(
            self,
            BucketError::UnknownAlgorithm { .. }
                | BucketError::UnknownHashFunction { .. }
                | BucketError::InvalidValue { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = BucketError> = std::result::Result<T, E>;
