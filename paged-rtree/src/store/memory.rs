//! Arena-backed node store.

use crate::config::TreeConfig;
use crate::errors::{RTreeError, RTreeResult};
use crate::node::{Node, NodeRef};
use crate::store::NodeStore;

/// Keeps nodes in a growable arena of slots.
///
/// References are slot indices. Freed slots are reused by later
/// allocations, most recently freed first.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Vec<Option<Node>>,
    free_slots: Vec<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, node: NodeRef) -> RTreeResult<usize> {
        match node {
            NodeRef::Memory(slot) => Ok(slot),
            other => Err(RTreeError::InvalidReference(format!(
                "{} does not belong to a memory store",
                other
            ))),
        }
    }

    fn live_slot(&self, node: NodeRef) -> RTreeResult<usize> {
        let slot = self.slot(node)?;
        match self.slots.get(slot) {
            Some(Some(_)) => Ok(slot),
            _ => Err(RTreeError::NotFound(format!("no live node at {}", node))),
        }
    }
}

impl NodeStore for MemoryStore {
    fn get(&self, node: NodeRef) -> RTreeResult<Node> {
        let slot = self.live_slot(node)?;
        self.slots[slot]
            .clone()
            .ok_or_else(|| RTreeError::NotFound(format!("no live node at {}", node)))
    }

    fn put(&mut self, node: NodeRef, contents: &Node) -> RTreeResult<()> {
        let slot = self.live_slot(node)?;
        self.slots[slot] = Some(contents.clone());
        Ok(())
    }

    fn allocate(&mut self, contents: &Node) -> RTreeResult<NodeRef> {
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(contents.clone());
                slot
            }
            None => {
                self.slots.push(Some(contents.clone()));
                self.slots.len() - 1
            }
        };
        log::trace!("Allocated memory node {}", slot);
        Ok(NodeRef::Memory(slot))
    }

    fn free(&mut self, node: NodeRef) -> RTreeResult<()> {
        let slot = self.live_slot(node)?;
        self.slots[slot] = None;
        self.free_slots.push(slot);
        Ok(())
    }

    fn is_valid_child(&self, node: NodeRef) -> bool {
        self.live_slot(node).is_ok()
    }

    fn reset(&mut self, _config: &TreeConfig) -> RTreeResult<NodeRef> {
        self.slots.clear();
        self.free_slots.clear();
        self.allocate(&Node::new(0))
    }

    fn persist_root(&mut self, _root: NodeRef, _root_level: u32, _entries: u64) -> RTreeResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> RTreeResult<()> {
        Ok(())
    }

    fn node_count(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }
}
