//! Two-stream merge by ascending timestamp.

use super::EventSource;
use crate::domain::Event;

/// Merges two timestamp-ordered sources into one. Ties go to the first
/// source; the event queue's kind priority settles cross-kind ordering.
pub struct MergedStream<A, B> {
    a: A,
    b: B,
    head_a: Option<Event>,
    head_b: Option<Event>,
}

impl<A: EventSource, B: EventSource> MergedStream<A, B> {
    pub fn new(mut a: A, mut b: B) -> Self {
        let head_a = a.next_event();
        let head_b = b.next_event();
        Self {
            a,
            b,
            head_a,
            head_b,
        }
    }
}

impl<A: EventSource, B: EventSource> EventSource for MergedStream<A, B> {
    fn next_event(&mut self) -> Option<Event> {
        match (&self.head_a, &self.head_b) {
            (Some(ea), Some(eb)) => {
                if ea.timestamp() <= eb.timestamp() {
                    let out = self.head_a.take();
                    self.head_a = self.a.next_event();
                    out
                } else {
                    let out = self.head_b.take();
                    self.head_b = self.b.next_event();
                    out
                }
            }
            (Some(_), None) => {
                let out = self.head_a.take();
                self.head_a = self.a.next_event();
                out
            }
            (None, Some(_)) => {
                let out = self.head_b.take();
                self.head_b = self.b.next_event();
                out
            }
            (None, None) => None,
        }
    }
}
