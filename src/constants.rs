//! Constants for bucket engines and the chained index table.
//!
//! Tiger Style: every resource bound is an explicit constant, and the
//! relationships between constants are checked at compile time below.

/// Minimum number of working buckets an engine may hold.
pub const MIN_BUCKETS: u32 = 1;

/// Maximum number of buckets (array size) an engine may address.
///
/// Kept well below `u32::MAX` so that `n + 1` and filter doubling never overflow.
pub const MAX_BUCKETS: u32 = 1 << 30;

/// Default number of buckets for a freshly configured engine.
pub const DEFAULT_BUCKETS: u32 = 16;

/// Initial (and minimum) number of chains in a chained index table.
pub const TABLE_MIN_CAPACITY: usize = 16;

/// Maximum number of chains in a chained index table.
pub const TABLE_MAX_CAPACITY: usize = 1 << 30;

/// Load factor numerator: the table doubles once `len > capacity * 3 / 4`.
pub const TABLE_GROW_NUMERATOR: usize = 3;

/// Load factor denominator for growth.
pub const TABLE_GROW_DENOMINATOR: usize = 4;

/// Shrink numerator: the table halves once `len <= capacity * 3 / 16`
/// (a quarter of the growth load factor).
pub const TABLE_SHRINK_NUMERATOR: usize = 3;

/// Shrink denominator.
pub const TABLE_SHRINK_DENOMINATOR: usize = 16;

/// Number of whole-range rehash attempts the binomial engine makes before
/// falling back to the minor range.
pub const BINOMIAL_MAX_RETRIES: u32 = 4;

// ============================================================================
// Compile-time relationships
// ============================================================================

const _: () = assert!(MIN_BUCKETS >= 1);
const _: () = assert!(MIN_BUCKETS <= DEFAULT_BUCKETS);
const _: () = assert!(DEFAULT_BUCKETS <= MAX_BUCKETS);
const _: () = assert!(MAX_BUCKETS.is_power_of_two());
// Filters are masks of the form 2^k - 1 covering n; doubling one must fit in u32.
const _: () = assert!((MAX_BUCKETS as u64) * 2 <= u32::MAX as u64 + 1);

const _: () = assert!(TABLE_MIN_CAPACITY.is_power_of_two());
const _: () = assert!(TABLE_MAX_CAPACITY.is_power_of_two());
const _: () = assert!(TABLE_MIN_CAPACITY < TABLE_MAX_CAPACITY);
// Shrinking must trigger strictly below the growth threshold, otherwise a single
// add/remove pair at the boundary would resize back and forth.
const _: () = assert!(
    TABLE_SHRINK_NUMERATOR * TABLE_GROW_DENOMINATOR * 2 <= TABLE_GROW_NUMERATOR * TABLE_SHRINK_DENOMINATOR
);

const _: () = assert!(BINOMIAL_MAX_RETRIES > 0);
