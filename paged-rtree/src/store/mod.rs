//! Node storage backends.
//!
//! The tree engine reaches nodes only through [`NodeStore`]. Two backends
//! implement it with identical observable behaviour:
//! - [`MemoryStore`]: nodes in an arena, addressed by slot index
//! - [`DiskStore`]: nodes as fixed-size pages in a file, addressed by byte
//!   offset, read and written on every access with no cache

pub mod disk;
pub mod memory;
pub mod page;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use page::FileHeader;

use crate::config::TreeConfig;
use crate::errors::RTreeResult;
use crate::node::{Node, NodeRef};

/// Owns node lifetime and identity for one tree.
pub trait NodeStore {
    /// Fetches a node's contents.
    ///
    /// Fails with `NotFound` for stale references and `InvalidReference`
    /// for references belonging to another backend.
    fn get(&self, node: NodeRef) -> RTreeResult<Node>;

    /// Overwrites an existing node in place.
    fn put(&mut self, node: NodeRef, contents: &Node) -> RTreeResult<()>;

    /// Stores a new node and returns its reference.
    fn allocate(&mut self, contents: &Node) -> RTreeResult<NodeRef>;

    /// Releases a node; its slot or page may be reused by a later
    /// [`NodeStore::allocate`].
    fn free(&mut self, node: NodeRef) -> RTreeResult<()>;

    /// True if `node` currently refers to a live node of this store.
    fn is_valid_child(&self, node: NodeRef) -> bool;

    /// Discards every node, adopts `config` and returns a fresh empty root
    /// leaf.
    fn reset(&mut self, config: &TreeConfig) -> RTreeResult<NodeRef>;

    /// Records the tree's root and entry count so the tree can be reopened.
    fn persist_root(&mut self, root: NodeRef, root_level: u32, entries: u64) -> RTreeResult<()>;

    /// Flushes buffered writes to durable storage.
    fn sync(&mut self) -> RTreeResult<()>;

    /// Number of live nodes.
    fn node_count(&self) -> usize;
}

impl<S: NodeStore + ?Sized> NodeStore for Box<S> {
    fn get(&self, node: NodeRef) -> RTreeResult<Node> {
        (**self).get(node)
    }

    fn put(&mut self, node: NodeRef, contents: &Node) -> RTreeResult<()> {
        (**self).put(node, contents)
    }

    fn allocate(&mut self, contents: &Node) -> RTreeResult<NodeRef> {
        (**self).allocate(contents)
    }

    fn free(&mut self, node: NodeRef) -> RTreeResult<()> {
        (**self).free(node)
    }

    fn is_valid_child(&self, node: NodeRef) -> bool {
        (**self).is_valid_child(node)
    }

    fn reset(&mut self, config: &TreeConfig) -> RTreeResult<NodeRef> {
        (**self).reset(config)
    }

    fn persist_root(&mut self, root: NodeRef, root_level: u32, entries: u64) -> RTreeResult<()> {
        (**self).persist_root(root, root_level, entries)
    }

    fn sync(&mut self) -> RTreeResult<()> {
        (**self).sync()
    }

    fn node_count(&self) -> usize {
        (**self).node_count()
    }
}
