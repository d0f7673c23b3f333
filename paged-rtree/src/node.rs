//! Node, branch and reference types shared by the tree engine and the
//! node stores.

use std::fmt;

use crate::rect::Rect;

/// Opaque identifier of an indexed record, stored in leaf branches.
pub type RecordId = u64;

/// Identity of a node in one of the storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    /// Slot index in a [`MemoryStore`](crate::store::MemoryStore) arena
    Memory(usize),
    /// Byte offset of a page in a [`DiskStore`](crate::store::DiskStore) file
    Disk(u64),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Memory(slot) => write!(f, "memory#{}", slot),
            NodeRef::Disk(offset) => write!(f, "disk@{}", offset),
        }
    }
}

/// What a branch points at. Leaves (level 0) hold records, internal nodes
/// hold node references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildRef {
    Node(NodeRef),
    Record(RecordId),
}

impl ChildRef {
    pub fn as_node(&self) -> Option<NodeRef> {
        match self {
            ChildRef::Node(node) => Some(*node),
            ChildRef::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<RecordId> {
        match self {
            ChildRef::Record(id) => Some(*id),
            ChildRef::Node(_) => None,
        }
    }
}

impl From<RecordId> for ChildRef {
    fn from(id: RecordId) -> Self {
        ChildRef::Record(id)
    }
}

impl From<NodeRef> for ChildRef {
    fn from(node: NodeRef) -> Self {
        ChildRef::Node(node)
    }
}

impl fmt::Display for ChildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildRef::Node(node) => write!(f, "{}", node),
            ChildRef::Record(id) => write!(f, "record {}", id),
        }
    }
}

/// A rectangle paired with the child it bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub rect: Rect,
    pub child: ChildRef,
}

impl Branch {
    pub fn new(rect: Rect, child: ChildRef) -> Self {
        Self { rect, child }
    }
}

/// One tree node: a level tag and its valid branches in order.
///
/// The branch list never exceeds the capacity for the node's level once a
/// tree operation completes; the engine may hold one extra branch
/// transiently while deciding between reinsertion and a split.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub level: u32,
    pub branches: Vec<Branch>,
}

impl Node {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            branches: Vec::new(),
        }
    }

    pub fn with_branches(level: u32, branches: Vec<Branch>) -> Self {
        Self { level, branches }
    }

    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Minimum bounding rectangle of every branch (null when empty).
    pub fn cover(&self, dimensions: usize) -> Rect {
        let mut cover = Rect::null(dimensions);
        for branch in &self.branches {
            cover.expand(&branch.rect);
        }
        cover
    }
}
