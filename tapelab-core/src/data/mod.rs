//! Data sources — row streams mapped into events.
//!
//! A source yields events in non-decreasing timestamp order; the controller
//! drains it lazily into the event queue. The SQLite source reads the
//! persisted tick database; the synthetic source hand-builds the test
//! scenarios.

pub mod merge;
pub mod sqlite;
pub mod synthetic;

pub use merge::MergedStream;
pub use sqlite::{SideRule, SqliteTickSource};
pub use synthetic::TestScenario;

use crate::domain::Event;
use std::collections::VecDeque;

/// A finite, timestamp-ordered stream of events.
pub trait EventSource {
    fn next_event(&mut self) -> Option<Event>;
}

/// In-memory source over a pre-built event sequence.
pub struct VecSource {
    events: VecDeque<Event>,
}

impl VecSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl EventSource for VecSource {
    fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }
}
