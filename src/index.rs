//! Priority index with visit-count eviction.
//!
//! Holds a fixed universe of ids `0..N` and orders the active ones by a
//! mutable priority (higher first, ties by ascending id). Every reported
//! priority counts as one visit; an id whose visit count reaches the
//! threshold is evicted for good.
//!
//! Layout is two cooperating arrays:
//!
//! - `heap`: a binary max-heap of `(priority, id)` entries, active ids only;
//! - `pos`: indexed by id, `Some(heap position)` while active and `None`
//!   once evicted (the tombstone that makes later updates fail fast).
//!
//! Both are sized to the universe once at construction, so updates never
//! allocate. Changing a priority is an increase/decrease-key on `heap`
//! (O(log n)); enumeration walks the heap best-first with a small frontier
//! (O(k log k) for `k` ids) and never mutates the index.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use crate::config::IndexConfig;
use crate::error::{Error, Result};

/// One heap slot.
///
/// Ordered so that the greater entry is drawn first: higher priority wins,
/// then lower id. Priorities are never NaN and `-0.0` is stored as `0.0`,
/// which makes `total_cmp` agree with numeric comparison.
#[derive(Debug, Clone, Copy)]
struct Entry {
    priority: f64,
    id: usize,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

#[inline]
fn normalize(priority: f64) -> f64 {
    if priority == 0.0 {
        0.0
    } else {
        priority
    }
}

/// Outcome of a single successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// The updated id.
    pub id: usize,
    /// Visit count after this update.
    pub visits: u32,
    /// Whether this update pushed the id over the visit threshold.
    pub evicted: bool,
}

/// Summary of a batched [`PriorityIndex::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Number of `(id, priority)` pairs applied.
    pub applied: usize,
    /// Ids evicted by this call, in application order.
    pub evicted: Vec<usize>,
}

/// Exact priority order over a fixed id universe.
#[derive(Debug, Clone)]
pub struct PriorityIndex {
    heap: Vec<Entry>,
    pos: Vec<Option<usize>>,
    priorities: Vec<f64>,
    visits: Vec<u32>,
    initial_priority: f64,
    visit_threshold: u32,
}

impl PriorityIndex {
    /// Build an index over ids `0..size`, all active with `initial_priority`
    /// and zero visits.
    pub fn new(size: usize, initial_priority: f64, visit_threshold: u32) -> Result<Self> {
        Self::from_config(
            size,
            &IndexConfig {
                initial_priority,
                visit_threshold,
            },
        )
    }

    /// Build an index from an [`IndexConfig`].
    pub fn from_config(size: usize, config: &IndexConfig) -> Result<Self> {
        if size == 0 {
            return Err(Error::EmptyUniverse);
        }
        config.validate()?;

        let initial_priority = normalize(config.initial_priority);
        // Equal priorities with ascending ids already satisfy the heap order.
        let heap = (0..size)
            .map(|id| Entry {
                priority: initial_priority,
                id,
            })
            .collect();
        let pos = (0..size).map(Some).collect();

        debug!(
            size,
            initial_priority,
            visit_threshold = config.visit_threshold,
            "built priority index"
        );

        Ok(Self {
            heap,
            pos,
            priorities: vec![initial_priority; size],
            visits: vec![0; size],
            initial_priority,
            visit_threshold: config.visit_threshold,
        })
    }

    /// Up to `k` active ids, highest priority first, ties by ascending id.
    ///
    /// Returns fewer than `k` ids only when fewer are active. Does not
    /// mutate the index; the returned vector is an owned snapshot.
    pub fn next_batch(&self, k: usize) -> Vec<usize> {
        let k = k.min(self.heap.len());
        let mut out = Vec::with_capacity(k);
        if k == 0 {
            return out;
        }

        // Best-first walk: a node is only a candidate once its parent has
        // been emitted, so the frontier never exceeds k + 1 entries.
        let mut frontier = BinaryHeap::with_capacity(k + 1);
        frontier.push((self.heap[0], 0usize));
        while out.len() < k {
            let Some((entry, i)) = frontier.pop() else {
                break;
            };
            out.push(entry.id);
            for child in [2 * i + 1, 2 * i + 2] {
                if child < self.heap.len() {
                    frontier.push((self.heap[child], child));
                }
            }
        }
        out
    }

    /// The id [`next_batch`](Self::next_batch) would return first.
    pub fn peek(&self) -> Option<usize> {
        self.heap.first().map(|e| e.id)
    }

    /// Report priorities for a batch of ids.
    ///
    /// Pairs are applied in order, so a repeated id sees the effect of its
    /// earlier occurrence (including eviction). The first failing pair stops
    /// the call: pairs before it stay applied, the failing id is untouched.
    pub fn update(&mut self, ids: &[usize], priorities: &[f64]) -> Result<UpdateReport> {
        if ids.len() != priorities.len() {
            return Err(Error::LengthMismatch {
                ids: ids.len(),
                priorities: priorities.len(),
            });
        }

        let mut report = UpdateReport::default();
        for (&id, &priority) in ids.iter().zip(priorities) {
            let visit = self.update_one(id, priority)?;
            report.applied += 1;
            if visit.evicted {
                report.evicted.push(id);
            }
        }
        Ok(report)
    }

    /// Report the priority for one id: set it, count a visit, and evict the
    /// id if it reached the visit threshold.
    pub fn update_one(&mut self, id: usize, priority: f64) -> Result<Visit> {
        let slot = self.slot(id)?;
        if priority.is_nan() {
            return Err(Error::UndefinedPriority { id });
        }
        let priority = normalize(priority);

        self.priorities[id] = priority;
        self.visits[id] = self.visits[id].saturating_add(1);
        let visits = self.visits[id];

        if visits >= self.visit_threshold {
            self.remove_at(slot);
            self.pos[id] = None;
            debug!(id, visits, active = self.heap.len(), "evicted stale id");
            return Ok(Visit {
                id,
                visits,
                evicted: true,
            });
        }

        self.heap[slot].priority = priority;
        self.restore(slot);
        trace!(id, priority, visits, "updated priority");
        Ok(Visit {
            id,
            visits,
            evicted: false,
        })
    }

    /// Size of the id universe, evicted ids included.
    pub fn size(&self) -> usize {
        self.pos.len()
    }

    /// Number of ids still eligible for enumeration.
    pub fn active_count(&self) -> usize {
        self.heap.len()
    }

    /// Number of ids evicted so far.
    pub fn evicted_count(&self) -> usize {
        self.size() - self.active_count()
    }

    /// False for evicted and out-of-range ids.
    pub fn is_active(&self, id: usize) -> bool {
        matches!(self.pos.get(id), Some(Some(_)))
    }

    /// Last reported priority (or the initial one). Kept after eviction.
    pub fn priority(&self, id: usize) -> Option<f64> {
        self.priorities.get(id).copied()
    }

    /// Visit count of `id`, `None` when out of range.
    pub fn visits(&self, id: usize) -> Option<u32> {
        self.visits.get(id).copied()
    }

    /// Visits after which an id is evicted.
    pub fn visit_threshold(&self) -> u32 {
        self.visit_threshold
    }

    /// Priority every id started with.
    pub fn initial_priority(&self) -> f64 {
        self.initial_priority
    }

    fn slot(&self, id: usize) -> Result<usize> {
        match self.pos.get(id) {
            Some(Some(slot)) => Ok(*slot),
            Some(None) => Err(Error::Evicted {
                id,
                visits: self.visits[id],
            }),
            None => Err(Error::UnknownId {
                id,
                size: self.size(),
            }),
        }
    }

    fn remove_at(&mut self, i: usize) {
        let last = self.heap.len() - 1;
        self.swap(i, last);
        self.heap.pop();
        if i < self.heap.len() {
            self.restore(i);
        }
    }

    /// Re-establish heap order for the entry at `i` after its key changed.
    fn restore(&mut self, i: usize) {
        if i > 0 && self.heap[i] > self.heap[(i - 1) / 2] {
            self.sift_up(i);
        } else {
            self.sift_down(i);
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i] <= self.heap[parent] {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let best = if right < len && self.heap[right] > self.heap[left] {
                right
            } else {
                left
            };
            if self.heap[best] <= self.heap[i] {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos[self.heap[a].id] = Some(a);
        self.pos[self.heap[b].id] = Some(b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn assert_heap_consistent(idx: &PriorityIndex) {
        for (i, e) in idx.heap.iter().enumerate() {
            assert_eq!(idx.pos[e.id], Some(i), "position of id {}", e.id);
            if i > 0 {
                assert!(idx.heap[(i - 1) / 2] > *e, "heap order at {i}");
            }
        }
        let live = idx.pos.iter().filter(|p| p.is_some()).count();
        assert_eq!(live, idx.heap.len());
    }

    #[test]
    fn construction_rejects_bad_params() {
        assert_eq!(
            PriorityIndex::new(0, 0.0, 1).unwrap_err(),
            Error::EmptyUniverse
        );
        assert_eq!(
            PriorityIndex::new(3, 0.0, 0).unwrap_err(),
            Error::ZeroVisitThreshold
        );
        assert!(PriorityIndex::new(3, f64::NAN, 1).unwrap_err().is_config());
    }

    #[test]
    fn fresh_index_enumerates_by_id() {
        let idx = PriorityIndex::new(6, f64::INFINITY, 10).unwrap();
        assert_eq!(idx.next_batch(6), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(idx.peek(), Some(0));
        assert_eq!(idx.active_count(), 6);
        assert_eq!(idx.visits(3), Some(0));
    }

    #[test]
    fn updates_reorder_descending() {
        let mut idx = PriorityIndex::new(5, 0.0, 100).unwrap();
        idx.update(&[0, 1, 2, 3, 4], &[1.0, 5.0, 3.0, 5.0, -2.0])
            .unwrap();
        assert_eq!(idx.next_batch(5), vec![1, 3, 2, 0, 4]);

        idx.update_one(4, 10.0).unwrap();
        idx.update_one(1, -1.0).unwrap();
        assert_eq!(idx.next_batch(5), vec![4, 3, 2, 0, 1]);
        assert_eq!(idx.visits(1), Some(2));
        assert_heap_consistent(&idx);
    }

    #[test]
    fn next_batch_is_a_pure_read() {
        let mut idx = PriorityIndex::new(4, 0.0, 100).unwrap();
        idx.update(&[2, 3], &[4.0, 8.0]).unwrap();
        let first = idx.next_batch(2);
        let second = idx.next_batch(2);
        assert_eq!(first, vec![3, 2]);
        assert_eq!(first, second);
        assert_eq!(idx.visits(3), Some(1));
    }

    #[test]
    fn k_larger_than_active_returns_all() {
        let idx = PriorityIndex::new(3, 1.0, 5).unwrap();
        assert_eq!(idx.next_batch(50).len(), 3);
        assert!(idx.next_batch(0).is_empty());
    }

    #[test]
    fn evicts_at_threshold() {
        let mut idx = PriorityIndex::new(5, 0.0, 2).unwrap();
        let v = idx.update_one(2, 9.0).unwrap();
        assert!(!v.evicted);
        assert_eq!(idx.next_batch(1), vec![2]);

        let v = idx.update_one(2, 9.0).unwrap();
        assert_eq!(
            v,
            Visit {
                id: 2,
                visits: 2,
                evicted: true
            }
        );
        assert_eq!(idx.visits(2), Some(2));
        assert_eq!(idx.active_count(), 4);
        assert_eq!(idx.evicted_count(), 1);
        assert!(!idx.is_active(2));
        assert!(!idx.next_batch(4).contains(&2));

        let err = idx.update_one(2, 1.0).unwrap_err();
        assert_eq!(err, Error::Evicted { id: 2, visits: 2 });
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_heap_consistent(&idx);
    }

    #[test]
    fn unknown_id_is_a_lookup_error() {
        let mut idx = PriorityIndex::new(3, 0.0, 2).unwrap();
        let err = idx.update_one(3, 1.0).unwrap_err();
        assert_eq!(err, Error::UnknownId { id: 3, size: 3 });
        assert!(!idx.is_active(3));
    }

    #[test]
    fn nan_priority_leaves_id_untouched() {
        let mut idx = PriorityIndex::new(3, 0.0, 5).unwrap();
        let err = idx.update_one(1, f64::NAN).unwrap_err();
        assert_eq!(err, Error::UndefinedPriority { id: 1 });
        assert_eq!(idx.visits(1), Some(0));
        assert_eq!(idx.priority(1), Some(0.0));
    }

    #[test]
    fn batch_update_stops_at_first_failure() {
        let mut idx = PriorityIndex::new(4, 0.0, 1).unwrap();
        // Threshold 1: the first occurrence of 1 evicts it, the second fails.
        let err = idx.update(&[0, 1, 1, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert_eq!(err, Error::Evicted { id: 1, visits: 1 });
        assert!(!idx.is_active(0));
        assert!(!idx.is_active(1));
        assert!(idx.is_active(2));
        assert_eq!(idx.visits(2), Some(0));
        assert_eq!(idx.next_batch(4), vec![2, 3]);
    }

    #[test]
    fn length_mismatch_applies_nothing() {
        let mut idx = PriorityIndex::new(3, 0.0, 5).unwrap();
        let err = idx.update(&[0, 1], &[1.0]).unwrap_err();
        assert_eq!(err, Error::LengthMismatch { ids: 2, priorities: 1 });
        assert_eq!(idx.visits(0), Some(0));
    }

    #[test]
    fn report_lists_evictions() {
        let mut idx = PriorityIndex::new(3, 0.0, 2).unwrap();
        let report = idx.update(&[0, 0, 1], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(report.applied, 3);
        assert_eq!(report.evicted, vec![0]);
    }

    #[test]
    fn signed_zeros_tie() {
        let mut idx = PriorityIndex::new(2, 1.0, 5).unwrap();
        idx.update(&[1, 0], &[-0.0, 0.0]).unwrap();
        assert_eq!(idx.next_batch(2), vec![0, 1]);
    }

    #[test]
    fn infinities_are_ordered() {
        let mut idx = PriorityIndex::new(3, 0.0, 5).unwrap();
        idx.update(&[0, 1, 2], &[f64::NEG_INFINITY, f64::INFINITY, 3.0])
            .unwrap();
        assert_eq!(idx.next_batch(3), vec![1, 2, 0]);
    }

    #[test]
    fn evicting_everything_empties_the_index() {
        let mut idx = PriorityIndex::new(4, 0.0, 1).unwrap();
        let report = idx.update(&[3, 1, 0, 2], &[1.0; 4]).unwrap();
        assert_eq!(report.evicted, vec![3, 1, 0, 2]);
        assert_eq!(idx.active_count(), 0);
        assert!(idx.next_batch(4).is_empty());
        assert_eq!(idx.peek(), None);
    }

    #[test]
    fn heap_stays_consistent_under_churn() {
        let mut idx = PriorityIndex::new(64, f64::INFINITY, 6).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..400 {
            let id = rng.random_range(0..64);
            // Coarse priorities so ties between ids keep happening.
            let priority = f64::from(rng.random_range(-20i32..20));
            if idx.is_active(id) {
                idx.update_one(id, priority).unwrap();
            }
            assert_heap_consistent(&idx);
        }
    }
}
