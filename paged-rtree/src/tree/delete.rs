use crate::errors::{ErrorKind, RTreeError, RTreeResult};
use crate::node::{ChildRef, Node, NodeRef, RecordId};
use crate::rect::Rect;
use crate::store::NodeStore;
use crate::tree::{Operation, RTree};

impl<S: NodeStore> RTree<S> {
    /// Removes the branch whose rectangle equals `rect` exactly and whose
    /// child is `child`, then condenses the tree.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such branch exists, `InvalidReference` if a
    /// dangling node reference is met on the way down. On any of these the
    /// tree is left unchanged. A `StorageIo` error raised after the nodes
    /// are written, while freeing pages or saving the file header, can
    /// leave the stored tree partly updated.
    pub fn delete(&mut self, rect: &Rect, child: &ChildRef) -> RTreeResult<()> {
        self.check_dimensions(rect)?;
        self.run(|op| op.delete(rect, child))?;
        self.entries = self.entries.saturating_sub(1);
        self.persist()
    }

    pub fn delete_record(&mut self, rect: &Rect, id: RecordId) -> RTreeResult<()> {
        self.delete(rect, &ChildRef::Record(id))
    }

    /// Like [`RTree::delete_record`], but reports a missing entry as
    /// `Ok(false)`.
    pub fn remove(&mut self, rect: &Rect, id: RecordId) -> RTreeResult<bool> {
        match self.delete_record(rect, id) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<S: NodeStore + ?Sized> Operation<'_, S> {
    pub(super) fn delete(&mut self, rect: &Rect, child: &ChildRef) -> RTreeResult<()> {
        let mut orphans = Vec::new();
        let (root, root_level) = (self.root, self.root_level);
        match self.delete_from(root, root_level, rect, child, &mut orphans)? {
            Some(node) => self.staging.put(root, node),
            None => {
                return Err(RTreeError::NotFound(format!(
                    "no entry {} for {}",
                    rect, child
                )))
            }
        }

        // higher subtrees first, so lower orphans find their full depth
        orphans.sort_by(|a, b| b.level.cmp(&a.level));
        if !orphans.is_empty() {
            log::debug!("Condensing: reinserting the branches of {} nodes", orphans.len());
        }
        for orphan in orphans {
            for branch in orphan.branches {
                self.insert(branch, orphan.level)?;
            }
        }

        self.shrink_root()
    }

    /// Finds and removes the entry beneath `node_ref`. Returns the node's
    /// new contents if the entry was found, leaving the caller to stage or
    /// dissolve it. Children that fall below minimum fill are freed here
    /// and their contents pushed to `orphans`.
    fn delete_from(
        &mut self,
        node_ref: NodeRef,
        node_level: u32,
        rect: &Rect,
        child: &ChildRef,
        orphans: &mut Vec<Node>,
    ) -> RTreeResult<Option<Node>> {
        let mut node = self.node_at(node_ref, node_level)?;
        if node.is_leaf() {
            let found = node
                .branches
                .iter()
                .position(|b| b.child == *child && b.rect.equals(rect));
            return Ok(found.map(|index| {
                node.branches.remove(index);
                node
            }));
        }

        for index in 0..node.branches.len() {
            if !node.branches[index].rect.overlaps(rect) {
                continue;
            }
            let child_ref = self.child_node(&node.branches[index].child)?;
            let Some(child_node) =
                self.delete_from(child_ref, node.level - 1, rect, child, orphans)?
            else {
                continue;
            };

            if child_node.len() < self.config.min_fill(child_node.level) {
                node.branches.remove(index);
                self.staging.free(child_ref);
                log::debug!(
                    "Dissolving {} at level {} with {} branches",
                    child_ref,
                    child_node.level,
                    child_node.len()
                );
                orphans.push(child_node);
            } else {
                node.branches[index].rect = child_node.cover(self.dimensions());
                self.staging.put(child_ref, child_node);
            }
            return Ok(Some(node));
        }
        Ok(None)
    }

    /// Drops internal roots with a single child until the root is a leaf or
    /// has at least two children.
    fn shrink_root(&mut self) -> RTreeResult<()> {
        while self.root_level > 0 {
            let root = self.node_at(self.root, self.root_level)?;
            match root.branches.as_slice() {
                [] => {
                    self.staging.put(self.root, Node::new(0));
                    self.root_level = 0;
                }
                [only] => {
                    let child = self.child_node(&only.child)?;
                    self.staging.free(self.root);
                    self.root = child;
                    self.root_level -= 1;
                    log::debug!("Root shrunk, tree height is now {}", self.root_level + 1);
                }
                _ => break,
            }
        }
        Ok(())
    }
}
