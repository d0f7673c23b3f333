//! Structural validation of a tree.

use std::collections::{BTreeSet, HashSet};

use crate::config::TreeConfig;
use crate::errors::RTreeResult;
use crate::node::{ChildRef, NodeRef};
use crate::rect::Rect;
use crate::store::NodeStore;
use crate::tree::RTree;

/// Result of [`RTree::check_integrity`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    /// Nodes reachable from the root
    pub nodes_checked: usize,
    /// Distinct depths at which leaves were found; a sound tree has one
    pub leaf_depths: Vec<u32>,
    /// One message per violation found
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Findings of a walk over one subtree.
#[derive(Debug, Default)]
pub(crate) struct SubtreeScan {
    pub nodes: usize,
    pub records: u64,
    pub leaf_depths: BTreeSet<u32>,
    pub errors: Vec<String>,
    /// Every node reference the walk reached
    pub visited: HashSet<NodeRef>,
}

struct Visit {
    node: NodeRef,
    depth: u32,
    level: Option<u32>,
    bound: Option<Rect>,
}

/// Walks the subtree under `root`, checking that every branch rectangle
/// is exactly the cover of its child, that levels step down by one, and
/// that every node is within its fill bounds. A node whose branch
/// rectangles do not match the configured dimensionality is reported and
/// not descended into. When `is_tree_root` is set, `root` itself only
/// needs two branches if internal.
pub(crate) fn check_subtree<S: NodeStore + ?Sized>(
    store: &S,
    config: &TreeConfig,
    root: NodeRef,
    root_level: Option<u32>,
    is_tree_root: bool,
) -> RTreeResult<SubtreeScan> {
    let mut scan = SubtreeScan::default();
    let mut pending = vec![Visit {
        node: root,
        depth: 0,
        level: root_level,
        bound: None,
    }];

    while let Some(visit) = pending.pop() {
        let at = visit.node;
        if !scan.visited.insert(at) {
            scan.errors.push(format!("{} is reachable more than once", at));
            continue;
        }
        if !store.is_valid_child(at) {
            scan.errors.push(format!("{} is not a live node", at));
            continue;
        }
        let node = match store.get(at) {
            Ok(node) => node,
            Err(err) => {
                scan.errors.push(format!("{} cannot be read: {}", at, err));
                continue;
            }
        };
        scan.nodes += 1;

        let dimensions = config.dimensions();
        if let Some(branch) = node.branches.iter().find(|b| b.rect.dimensions() != dimensions) {
            scan.errors.push(format!(
                "{} holds a {}-dimensional rectangle, tree has {} dimensions",
                at,
                branch.rect.dimensions(),
                dimensions
            ));
            continue;
        }

        if let Some(level) = visit.level {
            if node.level != level {
                scan.errors
                    .push(format!("{} is at level {}, expected {}", at, node.level, level));
            }
        }

        let capacity = config.capacity(node.level);
        if node.len() > capacity {
            scan.errors.push(format!(
                "{} holds {} branches, capacity is {}",
                at,
                node.len(),
                capacity
            ));
        }
        if visit.depth == 0 && is_tree_root {
            if !node.is_leaf() && node.len() < 2 {
                scan.errors
                    .push(format!("internal root {} has {} branches", at, node.len()));
            }
        } else if node.len() < config.min_fill(node.level) {
            scan.errors.push(format!(
                "{} holds {} branches, minimum is {}",
                at,
                node.len(),
                config.min_fill(node.level)
            ));
        }

        if let Some(bound) = &visit.bound {
            let cover = node.cover(dimensions);
            if cover != *bound {
                scan.errors.push(format!(
                    "branch rectangle {} for {} differs from its cover {}",
                    bound, at, cover
                ));
            }
        }

        if node.is_leaf() {
            scan.leaf_depths.insert(visit.depth);
            for branch in &node.branches {
                match branch.child {
                    ChildRef::Record(_) => scan.records += 1,
                    ChildRef::Node(child) => scan
                        .errors
                        .push(format!("leaf {} points at node {}", at, child)),
                }
            }
            continue;
        }

        for branch in &node.branches {
            match branch.child {
                ChildRef::Node(child) => pending.push(Visit {
                    node: child,
                    depth: visit.depth + 1,
                    level: Some(node.level - 1),
                    bound: Some(branch.rect.clone()),
                }),
                ChildRef::Record(id) => scan
                    .errors
                    .push(format!("internal node {} holds record {}", at, id)),
            }
        }
    }
    Ok(scan)
}

impl<S: NodeStore> RTree<S> {
    /// Walks the whole tree and reports every structural violation: loose
    /// or stale branch rectangles, uneven leaf depth, nodes outside their
    /// fill bounds, an entry count that disagrees with the leaves, and
    /// live nodes that are not reachable from the root.
    pub fn check_integrity(&self) -> RTreeResult<IntegrityReport> {
        let scan = check_subtree(
            &self.store,
            &self.config,
            self.root,
            Some(self.root_level),
            true,
        )?;
        let mut errors = scan.errors;

        if scan.leaf_depths.len() > 1 {
            errors.push(format!("leaves found at depths {:?}", scan.leaf_depths));
        }
        if let Some(depth) = scan.leaf_depths.iter().next() {
            if scan.leaf_depths.len() == 1 && *depth != self.root_level {
                errors.push(format!(
                    "leaves are at depth {}, root is at level {}",
                    depth, self.root_level
                ));
            }
        }
        if scan.records != self.entries {
            errors.push(format!(
                "tree counts {} entries, leaves hold {}",
                self.entries, scan.records
            ));
        }
        let live = self.store.node_count();
        if live != scan.nodes {
            errors.push(format!(
                "store holds {} live nodes, {} reachable from the root",
                live, scan.nodes
            ));
        }

        for error in &errors {
            log::warn!("Integrity violation: {}", error);
        }
        Ok(IntegrityReport {
            nodes_checked: scan.nodes,
            leaf_depths: scan.leaf_depths.into_iter().collect(),
            errors,
        })
    }
}
