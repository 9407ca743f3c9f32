//! Free-list pool for snapshots so steady-state capture does not allocate.
//!
//! The pool has no lock of its own. The tracker keeps it inside the same
//! mutex that guards the snapshot buffer, which is the only place snapshots
//! are obtained or returned.

use crate::snapshot::Snapshot;

pub struct SnapshotPool {
    free: Vec<Snapshot>,
    capacity: usize,
}

impl SnapshotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Pops a pooled snapshot, allocating a fresh one when the pool is empty.
    /// The caller resets it before use.
    pub fn obtain(&mut self) -> Snapshot {
        self.free.pop().unwrap_or_default()
    }

    /// Returns a snapshot to the pool; surplus beyond capacity is dropped.
    pub fn give_back(&mut self, snapshot: Snapshot) {
        if self.free.len() < self.capacity {
            self.free.push(snapshot);
        }
    }

    pub fn pooled(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obtain_beyond_capacity_allocates() {
        let mut pool = SnapshotPool::new(2);
        let a = pool.obtain();
        let b = pool.obtain();
        let c = pool.obtain();
        assert_eq!(pool.pooled(), 0);
        pool.give_back(a);
        pool.give_back(b);
        pool.give_back(c);
        assert_eq!(pool.pooled(), 2);
    }

    #[test]
    fn reuses_returned_snapshots() {
        let mut pool = SnapshotPool::new(4);
        let mut s = pool.obtain();
        s.reset(3);
        s.x[1] = 99;
        pool.give_back(s);
        let reused = pool.obtain();
        assert_eq!(reused.pointer_count(), 3);
    }
}
