//! Shared state: datastreams, events and predicates.
//!
//! ## Contents
//! - [`DatastreamRegistry`] name → stream lookup, created lazily
//! - [`Datastream`] latest-value, versioned slot with push/get
//! - [`Event`] predicate over a stream with async `wait`
//! - [`Predicate`] data-only condition evaluated on every push
//!
//! ## Quick reference
//! ```text
//! registry.get("gamemode") ──► Datastream ──set_event(pred)──► Event
//!        producer task ── push(record) ──┘                     │
//!        consumer task ◄──────────── wait() / get() ───────────┘
//! ```

mod datastream;
mod event;
mod predicate;
mod registry;

pub use datastream::{Datastream, Record, Snapshot};
pub use event::Event;
pub use predicate::Predicate;
pub use registry::DatastreamRegistry;
