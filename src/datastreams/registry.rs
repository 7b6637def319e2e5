//! # Datastream registry.
//!
//! Owned lookup from name to [`Datastream`]. The runtime creates one registry
//! and hands it to every module context; nothing is global, so tests build
//! their own.
//!
//! ## Rules
//! - The first `get(name)` creates an unset stream (version 0).
//! - Later calls return the identical instance (`Datastream::ptr_eq`).
//! - Lookups never fail; growth is one entry per distinct name.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::datastreams::datastream::Datastream;

/// Process-scoped set of datastreams.
#[derive(Default)]
pub struct DatastreamRegistry {
    streams: RwLock<HashMap<String, Datastream>>,
}

impl DatastreamRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stream called `name`, creating it on first use.
    pub fn get(&self, name: &str) -> Datastream {
        if let Some(ds) = self.streams.read().get(name) {
            return ds.clone();
        }
        let mut streams = self.streams.write();
        streams
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(stream = name, "datastream created");
                Datastream::new(name)
            })
            .clone()
    }

    /// Returns `true` if a stream called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.streams.read().contains_key(name)
    }

    /// Returns sorted list of stream names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of streams.
    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    /// Returns `true` if no stream was requested yet.
    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_is_idempotent() {
        let reg = DatastreamRegistry::new();
        let a = reg.get("gamemode");
        a.push_value(json!({"enabled": true})).unwrap();

        let b = reg.get("gamemode");
        assert!(a.ptr_eq(&b));
        assert_eq!(b.version(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_distinct_names_distinct_streams() {
        let reg = DatastreamRegistry::new();
        let a = reg.get("claw_control");
        let b = reg.get("claw_state");
        assert!(!a.ptr_eq(&b));
        assert_eq!(reg.names(), vec!["claw_control", "claw_state"]);
        assert!(reg.contains("claw_state"));
        assert!(!reg.contains("gamemode"));
    }
}
