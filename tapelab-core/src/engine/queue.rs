//! Min-ordered event store.
//!
//! A binary heap keyed by `(timestamp, kind_priority, sequence)`. The
//! sequence counter makes the pop order deterministic and FIFO within a
//! nanosecond: events pushed earlier dispatch earlier.

use crate::domain::Event;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Sequenced {
    ts: i64,
    priority: u8,
    seq: u64,
    event: Event,
}

impl Sequenced {
    fn key(&self) -> (i64, u8, u64) {
        (self.ts, self.priority, self.seq)
    }
}

impl PartialEq for Sequenced {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Sequenced {}

impl PartialOrd for Sequenced {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sequenced {
    /// Reversed so the `BinaryHeap` max-heap pops the smallest key first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Priority queue over [`Event`] with deterministic tie-breaking.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Sequenced>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Sequenced {
            ts: event.timestamp(),
            priority: event.kind_priority(),
            seq,
            event,
        });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|s| s.event)
    }

    /// Ordering key of the front event, if any.
    pub fn peek_key(&self) -> Option<(i64, u8, u64)> {
        self.heap.peek().map(Sequenced::key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
