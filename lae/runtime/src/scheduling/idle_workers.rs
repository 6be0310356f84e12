//! Idle Workers - Least-Fatigue-First Priority Queue
//!
//! A worker's fatigue only changes while it runs a task, and a running
//! worker is never in this queue, so the fatigue captured at insertion
//! stays accurate for as long as the entry is queued.

use super::worker::FatigueWorker;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

struct IdleEntry {
    fatigue: f64,
    seq: u64,
    worker: Arc<FatigueWorker>,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    // BinaryHeap pops the greatest entry: lowest fatigue, then earliest insert
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fatigue
            .total_cmp(&self.fatigue)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct IdleState {
    heap: BinaryHeap<IdleEntry>,
    next_seq: u64,
    closed: bool,
}

/// Blocking min-priority queue of idle workers, keyed by fatigue
#[derive(Default)]
pub struct IdleWorkers {
    state: Mutex<IdleState>,
    available: Condvar,
}

impl IdleWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `worker` idle
    pub fn push(&self, worker: Arc<FatigueWorker>) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(IdleEntry {
            fatigue: worker.fatigue(),
            seq,
            worker,
        });
        drop(state);
        self.available.notify_one();
    }

    /// Take the least fatigued idle worker, waiting until one is available.
    ///
    /// Returns `None` once the queue is closed.
    pub fn pop(&self) -> Option<Arc<FatigueWorker>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(entry) = state.heap.pop() {
                return Some(entry.worker);
            }
            self.available.wait(&mut state);
        }
    }

    /// Take the least fatigued idle worker if one is available now
    #[cfg(test)]
    pub fn try_pop(&self) -> Option<Arc<FatigueWorker>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.heap.pop().map(|entry| entry.worker)
    }

    /// Wake every waiting `pop` and refuse further takes
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }
}
