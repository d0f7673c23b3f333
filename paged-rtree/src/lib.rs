//! # Paged R-Tree - R*-tree spatial index over memory or disk pages
//!
//! This crate provides an n-dimensional R*-tree mapping axis-aligned
//! rectangles to record ids, with two interchangeable node stores that
//! behave identically.
//!
//! ## Features
//!
//! - **R\* Insertion**: ChooseSubtree by least enlargement, forced
//!   reinsertion once per level, R* topological or quadratic split
//! - **Condensing Deletion**: under-full nodes are dissolved and their
//!   entries reinserted, the root shrinks when it has a single child
//! - **Memory Store**: nodes in an arena addressed by slot index
//! - **Disk Store**: one fixed-size page per node, no read cache,
//!   reopenable from the file header
//! - **All-or-Nothing Mutations**: node writes are staged and committed
//!   only after every step of an insert or delete succeeded
//! - **Integrity Checking**: exact bounding rectangles, equal leaf depth
//!   and fill bounds verified on demand
//!
//! ## Quick Start
//!
//! ```rust
//! use paged_rtree::{RTree, Rect, TreeConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("index.rtree");
//!
//! let mut tree = RTree::create(&path, TreeConfig::new(2))?;
//! tree.insert_record(Rect::new(vec![0.0, 0.0], vec![10.0, 10.0])?, 1)?;
//! tree.insert_record(Rect::new(vec![20.0, 20.0], vec![30.0, 30.0])?, 2)?;
//! tree.close()?;
//!
//! let tree = RTree::open(&path)?;
//! let query = Rect::new(vec![5.0, 5.0], vec![15.0, 15.0])?;
//! assert_eq!(tree.search_collect(&query)?, vec![1]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod integrity;
pub mod node;
pub mod rect;
pub mod shared;
pub mod store;
pub mod tree;

mod split;
mod staging;

pub use config::{SplitMethod, StorageMode, TreeConfig};
pub use errors::{ErrorKind, RTreeError, RTreeResult};
pub use integrity::IntegrityReport;
pub use node::{Branch, ChildRef, Node, NodeRef, RecordId};
pub use rect::Rect;
pub use shared::SharedRTree;
pub use store::{DiskStore, FileHeader, MemoryStore, NodeStore};
pub use tree::{create_tree, RTree, TreeStats};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}
