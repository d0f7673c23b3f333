//! Tree configuration and the capacity policy.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    branch_bytes, DEFAULT_PAGE_SIZE, FORCECARD, MAX_CAPACITY, MAX_DIMENSIONS, MIN_CAPACITY,
    PAGE_HEADER_BYTES,
};
use crate::errors::{RTreeError, RTreeResult};

/// How an overflowing node's branches are partitioned into two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitMethod {
    /// R*-tree topological split: axis by minimal margin sum, distribution
    /// by minimal overlap, then area, then margin.
    #[default]
    RStar,
    /// Guttman's quadratic split with deterministic seed and assignment order.
    Quadratic,
}

/// Where a tree keeps its nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Nodes live in an in-process arena
    Memory,
    /// Nodes are fixed-size pages in the file at this path
    Disk(PathBuf),
}

/// Configuration shared by every node of one tree.
///
/// Capacities are derived from the page size and dimensionality unless set
/// explicitly. Nothing is checked until [`TreeConfig::validate`] runs, which
/// every tree constructor does before touching storage.
///
/// # Examples
///
/// ```rust
/// use paged_rtree::TreeConfig;
///
/// let config = TreeConfig::new(2).with_node_capacity(4).with_leaf_capacity(4);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.min_fill(0), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    dimensions: usize,
    page_size: usize,
    node_capacity: usize,
    leaf_capacity: usize,
    split_method: SplitMethod,
}

impl TreeConfig {
    /// Creates a configuration for `dimensions`-dimensional rectangles with
    /// capacities derived from [`DEFAULT_PAGE_SIZE`], clamped to the
    /// supported range.
    pub fn new(dimensions: usize) -> Self {
        let capacity =
            capacity_for_page(DEFAULT_PAGE_SIZE, dimensions).clamp(MIN_CAPACITY, MAX_CAPACITY);
        Self {
            dimensions,
            page_size: DEFAULT_PAGE_SIZE,
            node_capacity: capacity,
            leaf_capacity: capacity,
            split_method: SplitMethod::default(),
        }
    }

    /// Sets the nominal page size and re-derives both capacities from it.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        let capacity = capacity_for_page(page_size, self.dimensions).min(MAX_CAPACITY);
        self.page_size = page_size;
        self.node_capacity = capacity;
        self.leaf_capacity = capacity;
        self
    }

    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.node_capacity = capacity;
        self
    }

    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = capacity;
        self
    }

    pub fn with_split_method(mut self, method: SplitMethod) -> Self {
        self.split_method = method;
        self
    }

    /// Checks dimensionality and capacities against the supported ranges.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` describing the first violated limit.
    pub fn validate(&self) -> RTreeResult<()> {
        if self.dimensions == 0 || self.dimensions > MAX_DIMENSIONS {
            return Err(RTreeError::Configuration(format!(
                "dimensions must be in 1..={}, got {}",
                MAX_DIMENSIONS, self.dimensions
            )));
        }
        for (name, capacity) in [
            ("node", self.node_capacity),
            ("leaf", self.leaf_capacity),
        ] {
            if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
                return Err(RTreeError::Configuration(format!(
                    "{} capacity must be in {}..={}, got {} (page size {}, {} dimensions)",
                    name, MIN_CAPACITY, MAX_CAPACITY, capacity, self.page_size, self.dimensions
                )));
            }
        }
        Ok(())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Nominal page size the capacities were derived from.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Maximum branches of a node at `level` (leaves are level 0).
    pub fn capacity(&self, level: u32) -> usize {
        if level == 0 {
            self.leaf_capacity
        } else {
            self.node_capacity
        }
    }

    /// A non-root node at `level` holding fewer branches than this is
    /// dissolved during deletion and its entries reinserted.
    pub fn min_fill(&self, level: u32) -> usize {
        (self.capacity(level).saturating_sub(2) / 2).max(1)
    }

    /// Minimum size of each group produced by splitting a node at `level`.
    pub fn min_split_fill(&self, level: u32) -> usize {
        (self.capacity(level).saturating_sub(1) / 2).max(1)
    }

    /// Number of branches removed for forced reinsertion from an overflowing
    /// node at `level`. Leaves at least `min_fill` branches behind.
    pub fn reinsert_count(&self, level: u32) -> usize {
        let overflowing = self.capacity(level) + 1;
        FORCECARD.min(overflowing - self.min_fill(level))
    }

    /// Encoded length of one disk page. Both node kinds share one page size,
    /// padded to the larger capacity.
    pub fn page_bytes(&self) -> usize {
        PAGE_HEADER_BYTES
            + self.node_capacity.max(self.leaf_capacity) * branch_bytes(self.dimensions)
    }
}

/// Number of branches of `dimensions`-dimensional rectangles that fit in a
/// page of `page_size` bytes.
pub fn capacity_for_page(page_size: usize, dimensions: usize) -> usize {
    page_size.saturating_sub(PAGE_HEADER_BYTES) / branch_bytes(dimensions.max(1))
}
