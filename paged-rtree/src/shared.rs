//! A tree shared between threads: many concurrent readers or one writer.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::RTreeResult;
use crate::node::RecordId;
use crate::rect::Rect;
use crate::store::NodeStore;
use crate::tree::RTree;

/// Cloneable handle to one [`RTree`] behind a read-write lock.
///
/// Searches take the read lock and may run in parallel; inserts and
/// deletes take the write lock, so no search ever sees a half-applied
/// mutation.
pub struct SharedRTree<S: NodeStore> {
    inner: Arc<RwLock<RTree<S>>>,
}

impl<S: NodeStore> Clone for SharedRTree<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: NodeStore> SharedRTree<S> {
    pub fn new(tree: RTree<S>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RTree<S>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, RTree<S>> {
        self.inner.write()
    }

    pub fn insert_record(&self, rect: Rect, id: RecordId) -> RTreeResult<bool> {
        self.inner.write().insert_record(rect, id)
    }

    pub fn remove(&self, rect: &Rect, id: RecordId) -> RTreeResult<bool> {
        self.inner.write().remove(rect, id)
    }

    pub fn search_collect(&self, query: &Rect) -> RTreeResult<Vec<RecordId>> {
        self.inner.read().search_collect(query)
    }

    pub fn len(&self) -> u64 {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns the tree if this is the last handle to it.
    pub fn into_inner(self) -> Option<RTree<S>> {
        Arc::try_unwrap(self.inner).ok().map(RwLock::into_inner)
    }
}
