//! Lock-guarded index handle for prefetching callers.
//!
//! A training loop that prefetches batches on background workers can clone
//! a [`SharedIndex`] into each worker. Every call takes the lock once, so a
//! read issued after an update returns observes that update.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::index::{PriorityIndex, UpdateReport, Visit};

/// Cloneable handle to one [`PriorityIndex`].
#[derive(Debug, Clone)]
pub struct SharedIndex {
    inner: Arc<Mutex<PriorityIndex>>,
}

impl SharedIndex {
    /// Wrap `index` for sharing.
    pub fn new(index: PriorityIndex) -> Self {
        Self {
            inner: Arc::new(Mutex::new(index)),
        }
    }

    /// Owned snapshot of the next `k` ids.
    pub fn next_batch(&self, k: usize) -> Vec<usize> {
        self.inner.lock().next_batch(k)
    }

    /// [`PriorityIndex::update`] under the lock.
    pub fn update(&self, ids: &[usize], priorities: &[f64]) -> Result<UpdateReport> {
        self.inner.lock().update(ids, priorities)
    }

    /// [`PriorityIndex::update_one`] under the lock.
    pub fn update_one(&self, id: usize, priority: f64) -> Result<Visit> {
        self.inner.lock().update_one(id, priority)
    }

    /// Ids still eligible for enumeration.
    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }

    /// Size of the id universe.
    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    /// Run `f` with exclusive access, e.g. to pull a scheduler batch and
    /// inspect the index under one lock.
    pub fn with<T>(&self, f: impl FnOnce(&mut PriorityIndex) -> T) -> T {
        f(&mut *self.inner.lock())
    }
}

impl From<PriorityIndex> for SharedIndex {
    fn from(index: PriorityIndex) -> Self {
        Self::new(index)
    }
}
