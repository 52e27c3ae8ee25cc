use chrono::prelude::*;
use serde::Serialize;

/// A decoded payload. No schema is enforced on its fields.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A record stamped with the time it was ingested.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub record: Record,
}

/// Events collected during one tick, in arrival order.
///
/// A batch is filled by a single watcher and moved into the sink once the
/// tick is done; the sink receives it by value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventBatch {
    events: Vec<Event>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: DateTime<Utc>, record: Record) {
        self.events.push(Event { time, record });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }
}

impl IntoIterator for EventBatch {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Source of ingestion timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
