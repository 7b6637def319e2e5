//! # Datastream: named, versioned, latest-value channel.
//!
//! A [`Datastream`] holds the most recently pushed [`Record`] and a version
//! counter incremented on every push. Handles are cheap to clone; every clone
//! refers to the same slot.
//!
//! ## Architecture
//! ```text
//! push(record) ──► write lock ──► version += 1, value = record
//!                                 └─► for each registered event:
//!                                       ready = predicate(value)
//!                                       ready ⇒ wake waiters
//! get() ─────────► read lock ──► Option<Arc<Record>>  (None = never pushed)
//! ```
//!
//! ## Rules
//! - Version and value are updated under one lock: a reader never pairs a
//!   version with another push's value.
//! - Event predicates are evaluated inside the same critical section, in push
//!   order: O(subscribers) per push, no subscriber cap.
//! - Single writer per stream is a convention, not enforced.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::datastreams::event::{Event, EventShared};
use crate::datastreams::predicate::Predicate;
use crate::error::DatastreamError;

/// Module-defined key/value record carried by a datastream.
pub type Record = serde_json::Map<String, Value>;

/// Version and value read together.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Number of pushes so far.
    pub version: u64,
    /// Latest value (`None` = unset).
    pub value: Option<Arc<Record>>,
}

struct State {
    version: u64,
    value: Option<Arc<Record>>,
    events: Vec<Arc<EventShared>>,
}

struct Inner {
    name: Arc<str>,
    state: RwLock<State>,
}

/// Named latest-value slot shared between tasks.
#[derive(Clone)]
pub struct Datastream {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Datastream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Datastream")
            .field("name", &self.inner.name)
            .field("version", &state.version)
            .field("events", &state.events.len())
            .finish()
    }
}

impl Datastream {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: Arc::from(name),
                state: RwLock::new(State {
                    version: 0,
                    value: None,
                    events: Vec::new(),
                }),
            }),
        }
    }

    /// Stream name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` if both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Datastream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replaces the value, bumps the version and re-evaluates every event.
    ///
    /// Returns the new version.
    pub fn push(&self, record: Record) -> u64 {
        let record = Arc::new(record);
        let mut state = self.inner.state.write();
        state.version += 1;
        state.value = Some(Arc::clone(&record));

        for ev in &state.events {
            ev.evaluate(Some(&record));
        }
        tracing::trace!(
            stream = %self.inner.name,
            version = state.version,
            events = state.events.len(),
            "push"
        );
        state.version
    }

    /// Pushes a JSON value; fails unless it is an object.
    pub fn push_value(&self, value: Value) -> Result<u64, DatastreamError> {
        match value {
            Value::Object(record) => Ok(self.push(record)),
            _ => Err(DatastreamError::NotARecord {
                stream: self.name().to_string(),
            }),
        }
    }

    /// Serializes `value` and pushes it; `T` must serialize to a map.
    pub fn push_as<T: Serialize>(&self, value: &T) -> Result<u64, DatastreamError> {
        let value = serde_json::to_value(value).map_err(|source| DatastreamError::Codec {
            stream: self.name().to_string(),
            source,
        })?;
        self.push_value(value)
    }

    /// Latest value, or `None` if nothing was pushed yet.
    pub fn get(&self) -> Option<Arc<Record>> {
        self.inner.state.read().value.clone()
    }

    /// Latest value decoded as `T`, or `Ok(None)` if unset.
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DatastreamError> {
        let Some(record) = self.get() else {
            return Ok(None);
        };
        serde_json::from_value(Value::Object(Record::clone(&record)))
            .map(Some)
            .map_err(|source| DatastreamError::Codec {
                stream: self.name().to_string(),
                source,
            })
    }

    /// Version and value read under one lock.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.read();
        Snapshot {
            version: state.version,
            value: state.value.clone(),
        }
    }

    /// Number of pushes so far.
    pub fn version(&self) -> u64 {
        self.inner.state.read().version
    }

    /// Number of live events bound to this stream.
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.read().events.len()
    }

    /// Registers an event; its predicate is evaluated now and on every push.
    pub fn set_event(&self, predicate: Predicate) -> Event {
        let shared = Arc::new(EventShared::new(predicate));
        {
            let mut state = self.inner.state.write();
            shared.evaluate(state.value.as_deref());
            state.events.push(Arc::clone(&shared));
        }
        tracing::debug!(stream = %self.inner.name, predicate = ?shared.predicate, "event set");
        Event::new(shared, self.clone())
    }

    /// Unregisters `event`. Idempotent; pending and later waits fail.
    pub fn drop_event(&self, event: &Event) {
        let shared = event.shared();
        {
            let mut state = self.inner.state.write();
            state.events.retain(|ev| !Arc::ptr_eq(ev, shared));
        }
        if shared.active.swap(false, Ordering::AcqRel) {
            shared.ready.store(false, Ordering::Release);
            shared.notify.notify_waiters();
            tracing::debug!(stream = %self.inner.name, predicate = ?shared.predicate, "event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    #[test]
    fn test_unset_stream_reads_none() {
        let ds = Datastream::new("claw_control");
        assert!(ds.get().is_none());
        assert_eq!(ds.version(), 0);
        assert_eq!(ds.get_as::<Value>().unwrap(), None);
    }

    #[test]
    fn test_version_counts_pushes() {
        let ds = Datastream::new("claw_control");
        let before = ds.version();
        for i in 0..5 {
            ds.push(record(json!({ "elevator_pos": i })));
        }
        assert_eq!(ds.version(), before + 5);
        assert_eq!(ds.get().unwrap()["elevator_pos"], json!(4));

        let snap = ds.snapshot();
        assert_eq!(snap.version, 5);
        assert_eq!(snap.value.unwrap()["elevator_pos"], json!(4));
    }

    #[test]
    fn test_push_value_rejects_non_records() {
        let ds = Datastream::new("tick");
        let err = ds.push_value(json!(3)).unwrap_err();
        assert_eq!(err.as_label(), "datastream_not_a_record");
        assert_eq!(ds.version(), 0);
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Control {
            claw_open: bool,
            elevator_pos: f64,
            wrist_pos: f64,
        }
        let ds = Datastream::new("claw_control");
        let c = Control {
            claw_open: true,
            elevator_pos: 1.0,
            wrist_pos: -45.0,
        };
        ds.push_as(&c).unwrap();
        assert_eq!(ds.get_as::<Control>().unwrap(), Some(c));
    }

    #[test]
    fn test_dropped_event_is_not_evaluated() {
        let ds = Datastream::new("gamemode");
        let ev = ds.set_event(Predicate::is_true("enabled"));
        assert_eq!(ev.evaluations(), 1);

        ds.push(record(json!({"enabled": true})));
        assert_eq!(ev.evaluations(), 2);
        assert!(ev.is_ready());

        ev.drop_event();
        assert_eq!(ds.subscriber_count(), 0);
        ds.push(record(json!({"enabled": true})));
        ds.push(record(json!({"enabled": false})));
        assert_eq!(ev.evaluations(), 2);
        assert!(!ev.is_ready());
        assert!(!ev.is_active());
    }
}
