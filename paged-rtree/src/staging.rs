//! Per-operation write buffer over a node store.
//!
//! A mutating tree call reads and reshapes nodes through a [`Staging`]
//! buffer. Writes and frees are held back until [`Staging::commit`], so
//! every read that can fail has already happened before the store is
//! modified. Nodes allocated while staging are released again by
//! [`Staging::rollback`].

use std::collections::BTreeMap;

use crate::errors::{RTreeError, RTreeResult};
use crate::node::{Node, NodeRef};
use crate::store::NodeStore;

pub(crate) struct Staging<'a, S: NodeStore + ?Sized> {
    store: &'a mut S,
    /// Node contents written during this operation, keyed for a stable
    /// commit order
    dirty: BTreeMap<NodeRef, Node>,
    /// Nodes allocated during this operation
    allocated: Vec<NodeRef>,
    /// Nodes released during this operation, freed at commit
    freed: Vec<NodeRef>,
}

impl<'a, S: NodeStore + ?Sized> Staging<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            dirty: BTreeMap::new(),
            allocated: Vec::new(),
            freed: Vec::new(),
        }
    }

    /// Staged contents if this operation wrote the node, otherwise the
    /// store's.
    pub fn get(&self, node: NodeRef) -> RTreeResult<Node> {
        if self.freed.contains(&node) {
            return Err(RTreeError::NotFound(format!(
                "{} was released earlier in this operation",
                node
            )));
        }
        match self.dirty.get(&node) {
            Some(contents) => Ok(contents.clone()),
            None => self.store.get(node),
        }
    }

    pub fn put(&mut self, node: NodeRef, contents: Node) {
        self.dirty.insert(node, contents);
    }

    pub fn allocate(&mut self, contents: Node) -> RTreeResult<NodeRef> {
        let node = self.store.allocate(&contents)?;
        self.allocated.push(node);
        self.dirty.insert(node, contents);
        Ok(node)
    }

    pub fn free(&mut self, node: NodeRef) {
        self.dirty.remove(&node);
        self.freed.push(node);
    }

    pub fn is_valid_child(&self, node: NodeRef) -> bool {
        !self.freed.contains(&node) && (self.dirty.contains_key(&node) || self.store.is_valid_child(node))
    }

    /// Number of staged node writes.
    #[cfg(test)]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Writes every staged node, then releases freed nodes.
    ///
    /// If a write fails, nodes already overwritten get their previous
    /// contents back and allocated nodes are released before the error is
    /// returned. A failure while freeing, or while restoring, can leave the
    /// store partly updated.
    pub fn commit(self) -> RTreeResult<()> {
        let mut previous = Vec::new();
        for node in self.dirty.keys() {
            if !self.allocated.contains(node) {
                previous.push((*node, self.store.get(*node)?));
            }
        }

        let mut written = Vec::new();
        let mut failure = None;
        for (node, contents) in &self.dirty {
            if let Err(err) = self.store.put(*node, contents) {
                log::debug!("Write of {} failed, undoing commit: {}", node, err);
                failure = Some(err);
                break;
            }
            written.push(*node);
        }
        if let Some(err) = failure {
            for (node, contents) in previous.iter().filter(|(n, _)| written.contains(n)) {
                if let Err(err) = self.store.put(*node, contents) {
                    log::warn!("Failed to restore {} during rollback: {}", node, err);
                }
            }
            self.rollback();
            return Err(err);
        }

        for node in &self.freed {
            self.store.free(*node)?;
        }
        Ok(())
    }

    /// Releases nodes allocated during the operation. Nodes that existed
    /// before it were never written, so the store is back to its prior
    /// shape.
    pub fn rollback(self) {
        for node in self.allocated {
            if let Err(err) = self.store.free(node) {
                log::warn!("Failed to release {} during rollback: {}", node, err);
            }
        }
    }
}
