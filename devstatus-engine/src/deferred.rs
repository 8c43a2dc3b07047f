//! Deferred-task queue.
//!
//! Delayed effects are kept here with their ready time instead of being
//! handed to a free-running timer. Whoever owns the queue decides when to
//! drain it, so deferred work is ordered with every other mutation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::matcher::DeferredEffect;

/// A delayed effect and the environment it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredTask {
    /// Environment selected when the originating event arrived
    pub env_id: String,
    pub effect: DeferredEffect,
}

struct Slot<T> {
    ready_at: Instant,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    // Reversed: BinaryHeap is a max-heap and we want the earliest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Tasks ordered by ready time, ties in insertion order.
pub struct DeferredQueue<T> {
    heap: BinaryHeap<Slot<T>>,
    next_seq: u64,
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, ready_at: Instant, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Slot {
            ready_at,
            seq,
            task,
        });
    }

    /// Ready time of the earliest task.
    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|slot| slot.ready_at)
    }

    /// Remove and return every task ready at `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|slot| slot.ready_at <= now) {
            if let Some(slot) = self.heap.pop() {
                due.push(slot.task);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop everything still pending.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
