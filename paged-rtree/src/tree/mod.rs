//! The tree engine: construction, configuration and inspection.
//!
//! Insertion, deletion and search live in the submodules. Every mutating
//! call runs as one [`Operation`] over a [`Staging`] buffer and either
//! commits all of its node changes or none of them.

mod delete;
mod insert;
mod search;

use std::fmt::Write as _;
use std::path::Path;

use crate::config::{StorageMode, TreeConfig};
use crate::errors::{RTreeError, RTreeResult};
use crate::node::{ChildRef, Node, NodeRef};
use crate::rect::Rect;
use crate::staging::Staging;
use crate::store::{DiskStore, MemoryStore, NodeStore};

/// An R*-tree over a [`NodeStore`].
///
/// The tree owns its store and keeps the root reference, the root level
/// and the number of indexed records. A tree is a single-writer structure;
/// see [`crate::SharedRTree`] for sharing one across threads.
///
/// # Examples
///
/// ```rust
/// use paged_rtree::{RTree, Rect, TreeConfig};
///
/// let mut tree = RTree::in_memory(TreeConfig::new(2)).unwrap();
/// tree.insert_record(Rect::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap(), 7).unwrap();
///
/// let query = Rect::new(vec![0.5, 0.5], vec![3.0, 3.0]).unwrap();
/// assert_eq!(tree.search_collect(&query).unwrap(), vec![7]);
/// ```
#[derive(Debug)]
pub struct RTree<S: NodeStore> {
    pub(crate) config: TreeConfig,
    pub(crate) store: S,
    pub(crate) root: NodeRef,
    /// Level of the root node; leaves are level 0
    pub(crate) root_level: u32,
    /// Number of indexed records
    pub(crate) entries: u64,
}

/// Shape summary of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub entries: u64,
    pub height: u32,
    pub internal_nodes: usize,
    pub leaf_nodes: usize,
}

impl RTree<MemoryStore> {
    /// Creates an empty tree whose nodes live in memory.
    pub fn in_memory(config: TreeConfig) -> RTreeResult<Self> {
        Self::with_store(config, MemoryStore::new())
    }
}

impl RTree<DiskStore> {
    /// Creates an empty tree in a new page file, truncating any existing
    /// file at `path`.
    pub fn create(path: impl AsRef<Path>, config: TreeConfig) -> RTreeResult<Self> {
        config.validate()?;
        let store = DiskStore::create(path.as_ref(), &config)?;
        Self::with_store(config, store)
    }

    /// Reopens a tree from the root, configuration and entry count stored
    /// in the page file header.
    pub fn open(path: impl AsRef<Path>) -> RTreeResult<Self> {
        let (store, header) = DiskStore::open(path.as_ref())?;
        log::debug!(
            "Opened tree at {:?}: root {} at level {}, {} entries",
            path.as_ref(),
            header.root_offset,
            header.root_level,
            header.entry_count
        );
        Ok(Self {
            config: header.config,
            store,
            root: NodeRef::Disk(header.root_offset),
            root_level: header.root_level,
            entries: header.entry_count,
        })
    }
}

/// Creates an empty tree with the backend chosen by `mode`.
pub fn create_tree(
    config: TreeConfig,
    mode: StorageMode,
) -> RTreeResult<RTree<Box<dyn NodeStore>>> {
    config.validate()?;
    let store: Box<dyn NodeStore> = match mode {
        StorageMode::Memory => Box::new(MemoryStore::new()),
        StorageMode::Disk(path) => Box::new(DiskStore::create(&path, &config)?),
    };
    RTree::with_store(config, store)
}

impl<S: NodeStore> RTree<S> {
    /// Creates an empty tree over `store`, discarding anything it held.
    pub fn with_store(config: TreeConfig, mut store: S) -> RTreeResult<Self> {
        config.validate()?;
        let root = store.reset(&config)?;
        log::debug!(
            "Created tree: {} dimensions, node capacity {}, leaf capacity {}, {:?} split",
            config.dimensions(),
            config.node_capacity(),
            config.leaf_capacity(),
            config.split_method()
        );
        Ok(Self {
            config,
            store,
            root,
            root_level: 0,
            entries: 0,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct access to the node store.
    ///
    /// Nodes allocated here are not part of the tree until attached with
    /// [`RTree::insert`] at a level above 0.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// Number of levels, counting the leaves.
    pub fn height(&self) -> u32 {
        self.root_level + 1
    }

    pub fn len(&self) -> u64 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// True if `node` currently refers to a live node of this tree's store.
    pub fn is_valid_child_reference(&self, node: NodeRef) -> bool {
        self.store.is_valid_child(node)
    }

    /// Bounding rectangle of every record (null when empty).
    pub fn cover(&self) -> RTreeResult<Rect> {
        let root = self.store.get(self.root)?;
        Ok(root.cover(self.config.dimensions()))
    }

    /// Changes the maximum branches per internal node.
    ///
    /// # Errors
    ///
    /// `Configuration` if the tree already holds entries or the capacity
    /// is out of range.
    pub fn set_node_capacity(&mut self, capacity: usize) -> RTreeResult<()> {
        let config = self.config.clone().with_node_capacity(capacity);
        self.reconfigure(config)
    }

    /// Changes the maximum branches per leaf node.
    ///
    /// # Errors
    ///
    /// `Configuration` if the tree already holds entries or the capacity
    /// is out of range.
    pub fn set_leaf_capacity(&mut self, capacity: usize) -> RTreeResult<()> {
        let config = self.config.clone().with_leaf_capacity(capacity);
        self.reconfigure(config)
    }

    fn reconfigure(&mut self, config: TreeConfig) -> RTreeResult<()> {
        if self.entries > 0 || self.root_level > 0 {
            return Err(RTreeError::Configuration(
                "capacities can only change while the tree is empty".to_string(),
            ));
        }
        config.validate()?;
        self.root = self.store.reset(&config)?;
        log::debug!(
            "Capacities changed to node {}, leaf {}",
            config.node_capacity(),
            config.leaf_capacity()
        );
        self.config = config;
        Ok(())
    }

    /// Removes every entry, leaving an empty root leaf.
    pub fn clear(&mut self) -> RTreeResult<()> {
        self.root = self.store.reset(&self.config)?;
        self.root_level = 0;
        self.entries = 0;
        log::debug!("Tree cleared");
        Ok(())
    }

    /// Flushes the store to durable storage.
    pub fn sync(&mut self) -> RTreeResult<()> {
        self.store.sync()
    }

    /// Flushes and releases the tree.
    pub fn close(mut self) -> RTreeResult<()> {
        self.store.sync()
    }

    /// Counts records and nodes by walking the whole tree.
    pub fn stats(&self) -> RTreeResult<TreeStats> {
        let mut stats = TreeStats {
            entries: self.entries,
            height: self.height(),
            internal_nodes: 0,
            leaf_nodes: 0,
        };
        let mut pending = vec![self.root];
        while let Some(node_ref) = pending.pop() {
            let node = self.store.get(node_ref)?;
            if node.is_leaf() {
                stats.leaf_nodes += 1;
            } else {
                stats.internal_nodes += 1;
                pending.extend(node.branches.iter().filter_map(|b| b.child.as_node()));
            }
        }
        Ok(stats)
    }

    /// Renders the node hierarchy, one branch per line, indented by depth.
    pub fn dump(&self) -> RTreeResult<String> {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&self, node_ref: NodeRef, depth: usize, out: &mut String) -> RTreeResult<()> {
        let node = self.store.get(node_ref)?;
        let indent = "  ".repeat(depth);
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "{}{} level {} ({} branches)",
            indent,
            node_ref,
            node.level,
            node.len()
        );
        for branch in &node.branches {
            match branch.child {
                ChildRef::Node(child) => self.dump_node(child, depth + 1, out)?,
                ChildRef::Record(id) => {
                    let _ = writeln!(out, "{}  record {} {}", indent, id, branch.rect);
                }
            }
        }
        Ok(())
    }

    fn check_dimensions(&self, rect: &Rect) -> RTreeResult<()> {
        if rect.dimensions() != self.config.dimensions() {
            return Err(RTreeError::InvalidOperation(format!(
                "rectangle has {} dimensions, tree has {}",
                rect.dimensions(),
                self.config.dimensions()
            )));
        }
        Ok(())
    }

    /// Runs `body` as one all-or-nothing operation and adopts the root it
    /// leaves behind. Failures inside `body` or while writing staged nodes
    /// leave the tree as it was; an I/O error while freeing nodes at commit
    /// or in the later [`RTree::persist`] can leave the store partly
    /// updated.
    fn run<T>(
        &mut self,
        body: impl FnOnce(&mut Operation<'_, S>) -> RTreeResult<T>,
    ) -> RTreeResult<T> {
        let mut op = Operation {
            staging: Staging::new(&mut self.store),
            config: &self.config,
            root: self.root,
            root_level: self.root_level,
        };
        let value = match body(&mut op) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("Operation failed, rolling back: {}", err);
                op.staging.rollback();
                return Err(err);
            }
        };
        let (root, root_level) = (op.root, op.root_level);
        op.staging.commit()?;
        self.root = root;
        self.root_level = root_level;
        Ok(value)
    }

    fn persist(&mut self) -> RTreeResult<()> {
        self.store.persist_root(self.root, self.root_level, self.entries)
    }
}

/// State of one mutating call: staged node changes plus the root as that
/// call has reshaped it so far.
pub(crate) struct Operation<'a, S: NodeStore + ?Sized> {
    staging: Staging<'a, S>,
    config: &'a TreeConfig,
    root: NodeRef,
    root_level: u32,
}

impl<S: NodeStore + ?Sized> Operation<'_, S> {
    /// Reads a node, checking it sits at the level its parent implies.
    fn node_at(&self, node_ref: NodeRef, level: u32) -> RTreeResult<Node> {
        let node = self.staging.get(node_ref)?;
        if node.level != level {
            return Err(RTreeError::corrupted(format!(
                "{} is at level {}, expected {}",
                node_ref, node.level, level
            )));
        }
        Ok(node)
    }

    /// The node reference held by an internal branch, after checking that
    /// it is still live.
    fn child_node(&self, child: &ChildRef) -> RTreeResult<NodeRef> {
        match child.as_node() {
            Some(node) if self.staging.is_valid_child(node) => Ok(node),
            _ => Err(RTreeError::InvalidReference(format!(
                "{} is not a live node",
                child
            ))),
        }
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions()
    }
}
