use std::ops::ControlFlow;

use crate::errors::RTreeResult;
use crate::node::{ChildRef, NodeRef, RecordId};
use crate::rect::Rect;
use crate::store::NodeStore;
use crate::tree::RTree;

/// Which leaf entries a query reports.
#[derive(Clone, Copy)]
enum Matching {
    Overlapping,
    Contained,
}

impl<S: NodeStore> RTree<S> {
    /// Calls `visitor` with every record whose rectangle overlaps `query`
    /// (touching counts). Only subtrees whose bounding rectangle overlaps
    /// the query are read.
    ///
    /// The visitor may return [`ControlFlow::Break`] to stop the traversal.
    /// Returns the number of matches visited, including the one that
    /// stopped it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use paged_rtree::{RTree, Rect, TreeConfig};
    ///
    /// let mut tree = RTree::in_memory(TreeConfig::new(1)).unwrap();
    /// for i in 0..10 {
    ///     tree.insert_record(Rect::new(vec![i as f64], vec![i as f64 + 0.5]).unwrap(), i).unwrap();
    /// }
    ///
    /// let everything = Rect::new(vec![0.0], vec![10.0]).unwrap();
    /// let count = tree.search(&everything, |_, _| ControlFlow::Break(())).unwrap();
    /// assert_eq!(count, 1);
    /// ```
    pub fn search<F>(&self, query: &Rect, mut visitor: F) -> RTreeResult<usize>
    where
        F: FnMut(RecordId, &Rect) -> ControlFlow<()>,
    {
        self.run_query(query, Matching::Overlapping, &mut visitor)
    }

    /// Calls `visitor` with every record whose rectangle lies entirely
    /// inside `query`.
    pub fn search_contained<F>(&self, query: &Rect, mut visitor: F) -> RTreeResult<usize>
    where
        F: FnMut(RecordId, &Rect) -> ControlFlow<()>,
    {
        self.run_query(query, Matching::Contained, &mut visitor)
    }

    /// Ids of every record whose rectangle overlaps `query`, in traversal
    /// order.
    pub fn search_collect(&self, query: &Rect) -> RTreeResult<Vec<RecordId>> {
        let mut ids = Vec::new();
        self.search(query, |id, _| {
            ids.push(id);
            ControlFlow::Continue(())
        })?;
        Ok(ids)
    }

    fn run_query<F>(&self, query: &Rect, matching: Matching, visitor: &mut F) -> RTreeResult<usize>
    where
        F: FnMut(RecordId, &Rect) -> ControlFlow<()>,
    {
        self.check_dimensions(query)?;
        let mut count = 0;
        self.search_node(self.root, query, matching, visitor, &mut count)?;
        Ok(count)
    }

    fn search_node<F>(
        &self,
        node_ref: NodeRef,
        query: &Rect,
        matching: Matching,
        visitor: &mut F,
        count: &mut usize,
    ) -> RTreeResult<ControlFlow<()>>
    where
        F: FnMut(RecordId, &Rect) -> ControlFlow<()>,
    {
        let node = self.store.get(node_ref)?;
        for branch in &node.branches {
            if !branch.rect.overlaps(query) {
                continue;
            }
            let flow = match branch.child {
                ChildRef::Node(child) => {
                    self.search_node(child, query, matching, visitor, count)?
                }
                ChildRef::Record(id) => {
                    if let Matching::Contained = matching {
                        if !query.contains(&branch.rect) {
                            continue;
                        }
                    }
                    *count += 1;
                    visitor(id, &branch.rect)
                }
            };
            if flow.is_break() {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}
