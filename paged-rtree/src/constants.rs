//! Constants for the R-tree capacity policy and page file format.

/// Default nominal page size in bytes; node capacities are derived from it
pub const DEFAULT_PAGE_SIZE: usize = 512;

/// Encoded size of a page's fixed prefix: level (u32), branch count (u32)
/// and the branch array length (u64)
pub const PAGE_HEADER_BYTES: usize = 16;

/// Number of branches removed for forced reinsertion when a non-root node
/// overflows for the first time at its level during one insertion
pub const FORCECARD: usize = 3;

/// Smallest supported node or leaf capacity
pub const MIN_CAPACITY: usize = 3;

/// Largest supported node or leaf capacity
pub const MAX_CAPACITY: usize = 256;

/// Largest supported dimensionality
pub const MAX_DIMENSIONS: usize = 20;

/// Size of the file header that precedes the first page
pub const FILE_HEADER_SIZE: u64 = 128;

/// Magic number for file format identification
pub const MAGIC: u32 = 0x5052_5452; // "PRTR"

/// File format version
pub const VERSION: u32 = 1;

/// Encoded width of one branch: the coordinate vector (u64 length prefix plus
/// `2 * dimensions` f64 values) and the child reference (u64).
pub const fn branch_bytes(dimensions: usize) -> usize {
    8 + 16 * dimensions + 8
}
