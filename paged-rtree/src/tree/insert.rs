use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::errors::{RTreeError, RTreeResult};
use crate::integrity::check_subtree;
use crate::node::{Branch, ChildRef, Node, NodeRef, RecordId};
use crate::rect::Rect;
use crate::split::split;
use crate::store::NodeStore;
use crate::tree::{Operation, RTree};

/// What became of a node after a branch was added somewhere beneath it.
enum Outcome {
    /// The node still fits; its new exact cover
    Fit(Rect),
    /// The node split; its own new cover and the branch for its new sibling
    Split { cover: Rect, sibling: Branch },
}

/// Branches waiting to be inserted from the root, and the levels that have
/// already been relieved by forced reinsertion during this call.
#[derive(Default)]
struct Reinsertion {
    queue: VecDeque<(Branch, u32)>,
    spent: BTreeSet<u32>,
}

impl<S: NodeStore> RTree<S> {
    /// Adds a branch to a node at `level`.
    ///
    /// Level 0 takes a record id. Higher levels attach a detached subtree
    /// (see [`RTree::store_mut`]) whose root is at `level - 1` and whose
    /// bounding rectangle is exactly `rect`.
    ///
    /// Returns true if the tree grew a level.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for a rectangle of the wrong dimensionality or a
    /// level above the root, `InvalidReference` for a child of the wrong
    /// kind or a dangling node reference. On any of these the tree is left
    /// unchanged. A `StorageIo` error raised after the nodes are written,
    /// while freeing pages or saving the file header, can leave the stored
    /// tree partly updated.
    pub fn insert(&mut self, rect: Rect, child: ChildRef, level: u32) -> RTreeResult<bool> {
        self.check_dimensions(&rect)?;
        let added = self.check_insert_target(&rect, &child, level)?;
        let grew = self.run(|op| op.insert(Branch::new(rect, child), level))?;
        self.entries += added;
        self.persist()?;
        Ok(grew)
    }

    /// Indexes one record under its bounding rectangle.
    pub fn insert_record(&mut self, rect: Rect, id: RecordId) -> RTreeResult<bool> {
        self.insert(rect, ChildRef::Record(id), 0)
    }

    /// Validates an insertion target and returns how many records it adds.
    fn check_insert_target(&self, rect: &Rect, child: &ChildRef, level: u32) -> RTreeResult<u64> {
        if level > self.root_level {
            return Err(RTreeError::InvalidOperation(format!(
                "cannot insert at level {}, root is at level {}",
                level, self.root_level
            )));
        }
        match (level, child) {
            (0, ChildRef::Record(_)) => Ok(1),
            (0, ChildRef::Node(node)) => Err(RTreeError::InvalidReference(format!(
                "leaf branches hold record ids, got {}",
                node
            ))),
            (_, ChildRef::Record(id)) => Err(RTreeError::InvalidReference(format!(
                "level {} branches hold node references, got record {}",
                level, id
            ))),
            (_, ChildRef::Node(node)) => {
                if !self.store.is_valid_child(*node) {
                    return Err(RTreeError::InvalidReference(format!(
                        "{} is not a live node",
                        node
                    )));
                }
                let subtree = self.store.get(*node)?;
                if subtree.level + 1 != level {
                    return Err(RTreeError::InvalidOperation(format!(
                        "{} is at level {} and cannot hang from level {}",
                        node, subtree.level, level
                    )));
                }
                let scan = check_subtree(&self.store, &self.config, *node, None, false)?;
                if let Some(problem) = scan.errors.first() {
                    return Err(RTreeError::InvalidOperation(format!(
                        "subtree at {} is malformed: {}",
                        node, problem
                    )));
                }
                if subtree.cover(self.config.dimensions()) != *rect {
                    return Err(RTreeError::InvalidOperation(format!(
                        "{} is not the bounding rectangle of {}",
                        rect, node
                    )));
                }
                if let Some(shared) = self.first_attached(&scan.visited)? {
                    return Err(RTreeError::InvalidOperation(format!(
                        "{} in the subtree at {} is already part of the tree",
                        shared, node
                    )));
                }
                Ok(scan.records)
            }
        }
    }

    /// The first node of `candidates` reachable from the root, if any.
    fn first_attached(&self, candidates: &HashSet<NodeRef>) -> RTreeResult<Option<NodeRef>> {
        let mut pending = vec![self.root];
        while let Some(node_ref) = pending.pop() {
            if candidates.contains(&node_ref) {
                return Ok(Some(node_ref));
            }
            let node = self.store.get(node_ref)?;
            pending.extend(node.branches.iter().filter_map(|b| b.child.as_node()));
        }
        Ok(None)
    }
}

impl<S: NodeStore + ?Sized> Operation<'_, S> {
    /// One top-level insertion, including every forced reinsertion it
    /// triggers. Returns true if the root split.
    pub(super) fn insert(&mut self, branch: Branch, level: u32) -> RTreeResult<bool> {
        let mut reinsertion = Reinsertion::default();
        reinsertion.queue.push_back((branch, level));
        let mut grew = false;

        while let Some((branch, level)) = reinsertion.queue.pop_front() {
            let (root, root_level) = (self.root, self.root_level);
            if let Outcome::Split { cover, sibling } =
                self.insert_into(root, root_level, branch, level, &mut reinsertion)?
            {
                self.grow_root(cover, sibling)?;
                grew = true;
            }
        }
        Ok(grew)
    }

    fn insert_into(
        &mut self,
        node_ref: NodeRef,
        node_level: u32,
        branch: Branch,
        level: u32,
        reinsertion: &mut Reinsertion,
    ) -> RTreeResult<Outcome> {
        let mut node = self.node_at(node_ref, node_level)?;
        if node.level == level {
            node.branches.push(branch);
        } else {
            let index = self.choose_subtree(&node, &branch.rect)?;
            let child = self.child_node(&node.branches[index].child)?;
            match self.insert_into(child, node.level - 1, branch, level, reinsertion)? {
                Outcome::Fit(cover) => node.branches[index].rect = cover,
                Outcome::Split { cover, sibling } => {
                    node.branches[index].rect = cover;
                    node.branches.push(sibling);
                }
            }
        }
        self.settle(node_ref, node, reinsertion)
    }

    /// Picks the branch needing the least area enlargement to take `rect`.
    /// Ties go to the smaller resulting area, then to the child with fewer
    /// branches, then to the lower index.
    fn choose_subtree(&self, node: &Node, rect: &Rect) -> RTreeResult<usize> {
        let mut best: Option<(f64, f64)> = None;
        let mut tied = Vec::new();
        for (index, branch) in node.branches.iter().enumerate() {
            let grown = branch.rect.combine(rect).area();
            let key = (grown - branch.rect.area(), grown);
            let ordering = match best {
                None => Ordering::Less,
                Some(best) => key.0.total_cmp(&best.0).then(key.1.total_cmp(&best.1)),
            };
            match ordering {
                Ordering::Less => {
                    best = Some(key);
                    tied.clear();
                    tied.push(index);
                }
                Ordering::Equal => tied.push(index),
                Ordering::Greater => {}
            }
        }

        match tied.as_slice() {
            [] => Err(RTreeError::corrupted(format!(
                "internal node at level {} has no branches",
                node.level
            ))),
            [only] => Ok(*only),
            _ => {
                let mut pick = tied[0];
                let mut fewest = usize::MAX;
                for &index in &tied {
                    let child = self.child_node(&node.branches[index].child)?;
                    let len = self.staging.get(child)?.len();
                    if len < fewest {
                        fewest = len;
                        pick = index;
                    }
                }
                Ok(pick)
            }
        }
    }

    /// Stages `node` after a branch was added to it, resolving an overflow
    /// by forced reinsertion (once per level per call, never at the root)
    /// or by a split.
    fn settle(
        &mut self,
        node_ref: NodeRef,
        mut node: Node,
        reinsertion: &mut Reinsertion,
    ) -> RTreeResult<Outcome> {
        let dimensions = self.dimensions();
        if node.len() <= self.config.capacity(node.level) {
            let cover = node.cover(dimensions);
            self.staging.put(node_ref, node);
            return Ok(Outcome::Fit(cover));
        }

        if node_ref != self.root && reinsertion.spent.insert(node.level) {
            return Ok(Outcome::Fit(self.force_reinsert(node_ref, node, reinsertion)));
        }

        let level = node.level;
        let (kept, moved) = split(std::mem::take(&mut node.branches), level, self.config)?;
        node.branches = kept;
        let sibling = Node::with_branches(level, moved);
        let sibling_cover = sibling.cover(dimensions);
        let sibling_ref = self.staging.allocate(sibling)?;
        let cover = node.cover(dimensions);
        self.staging.put(node_ref, node);
        Ok(Outcome::Split {
            cover,
            sibling: Branch::new(sibling_cover, ChildRef::Node(sibling_ref)),
        })
    }

    /// Removes the branches farthest from the node's centre and queues them
    /// for reinsertion at the node's level, closest first. Returns the
    /// node's tightened cover.
    fn force_reinsert(
        &mut self,
        node_ref: NodeRef,
        mut node: Node,
        reinsertion: &mut Reinsertion,
    ) -> Rect {
        let dimensions = self.dimensions();
        let level = node.level;
        let count = self.config.reinsert_count(level);
        let cover = node.cover(dimensions);

        let mut by_distance: Vec<(usize, f64)> = node
            .branches
            .iter()
            .map(|b| b.rect.center_distance_sq(&cover))
            .enumerate()
            .collect();
        by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut slots: Vec<Option<Branch>> = node.branches.drain(..).map(Some).collect();
        for &(index, _) in by_distance[..count].iter().rev() {
            if let Some(branch) = slots[index].take() {
                reinsertion.queue.push_back((branch, level));
            }
        }
        node.branches = slots.into_iter().flatten().collect();
        log::debug!(
            "Forced reinsertion of {} branches from {} at level {}",
            count,
            node_ref,
            level
        );

        let cover = node.cover(dimensions);
        self.staging.put(node_ref, node);
        cover
    }

    /// Puts a new root above the old one and its new sibling.
    fn grow_root(&mut self, cover: Rect, sibling: Branch) -> RTreeResult<()> {
        let level = self.root_level + 1;
        let root = Node::with_branches(
            level,
            vec![Branch::new(cover, ChildRef::Node(self.root)), sibling],
        );
        self.root = self.staging.allocate(root)?;
        self.root_level = level;
        log::debug!("Root split, tree height is now {}", level + 1);
        Ok(())
    }
}
