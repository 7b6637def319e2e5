//! # Event: live predicate over a datastream.
//!
//! An [`Event`] is created by [`Datastream::set_event`] and stays registered
//! until [`Event::drop_event`]. The stream re-evaluates the predicate on every
//! push and stores the result in a `ready` flag; `wait` suspends until that
//! flag is set.
//!
//! ## Wait protocol
//! ```text
//! wait():
//!   loop {
//!     notified = notify.notified(); enable()   ◄── registered before the check
//!     dropped?  → Err(Dropped)
//!     ready?    → Ok(())                        ◄── already true: no suspension
//!     notified.await                            ◄── woken by a push that set ready
//!   }
//! ```
//!
//! ## Rules
//! - Level-triggered: `wait` returns as long as the predicate holds on the
//!   latest value; callers wanting edges keep their own "last seen" state.
//! - Registering the waiter before checking `ready` closes the missed-wakeup
//!   window between a push and the suspension.
//! - Clones share one registration; all waiters are released together.
//! - After a drop, `wait` fails fast with [`EventError::Dropped`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

use crate::datastreams::Record;
use crate::datastreams::datastream::Datastream;
use crate::datastreams::predicate::Predicate;
use crate::error::EventError;

/// State shared between an event, its clones and its datastream.
pub(crate) struct EventShared {
    pub(crate) predicate: Predicate,
    pub(crate) ready: AtomicBool,
    pub(crate) active: AtomicBool,
    pub(crate) notify: Notify,
    evaluations: AtomicU64,
}

impl EventShared {
    pub(crate) fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            ready: AtomicBool::new(false),
            active: AtomicBool::new(true),
            notify: Notify::new(),
            evaluations: AtomicU64::new(0),
        }
    }

    /// Called by the datastream under its write lock.
    pub(crate) fn evaluate(&self, record: Option<&Record>) {
        let ready = self.predicate.evaluate(record);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.ready.store(ready, Ordering::Release);
        if ready {
            self.notify.notify_waiters();
        }
    }
}

/// Predicate over a datastream with async wait.
#[derive(Clone)]
pub struct Event {
    shared: Arc<EventShared>,
    stream: Datastream,
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("stream", &self.stream.name())
            .field("predicate", &self.shared.predicate)
            .field("ready", &self.is_ready())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Event {
    pub(crate) fn new(shared: Arc<EventShared>, stream: Datastream) -> Self {
        Self { shared, stream }
    }

    pub(crate) fn shared(&self) -> &Arc<EventShared> {
        &self.shared
    }

    /// Suspends until the predicate holds on the latest value.
    ///
    /// Returns immediately if it already holds.
    pub async fn wait(&self) -> Result<(), EventError> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.shared.active.load(Ordering::Acquire) {
                return Err(EventError::Dropped {
                    stream: self.stream.name().to_string(),
                });
            }
            if self.shared.ready.load(Ordering::Acquire) {
                return Ok(());
            }
            notified.await;
        }
    }

    /// Unregisters the event from its datastream.
    pub fn drop_event(&self) {
        self.stream.drop_event(self);
    }

    /// Result of the last evaluation.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// `false` once dropped.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Number of times the predicate was evaluated.
    pub fn evaluations(&self) -> u64 {
        self.shared.evaluations.load(Ordering::Relaxed)
    }

    /// The bound predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.shared.predicate
    }

    /// The bound datastream.
    pub fn stream(&self) -> &Datastream {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_true() {
        let ds = Datastream::new("gamemode");
        ds.push(record(json!({"enabled": true, "mode": "teleop"})));

        let ev = ds.set_event(Predicate::is_true("enabled"));
        // A ready event completes on its first poll.
        let fut = ev.wait();
        tokio::pin!(fut);
        let polled = futures::poll!(fut.as_mut());
        assert!(matches!(polled, std::task::Poll::Ready(Ok(()))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_suspends_until_predicate_holds() {
        let ds = Datastream::new("gamemode");
        ds.push(record(json!({"enabled": false, "mode": "disabled"})));
        let ev = ds.set_event(Predicate::is_true("enabled"));

        let woke = Arc::new(AtomicBool::new(false));
        let waiter = {
            let ev = ev.clone();
            let woke = woke.clone();
            tokio::spawn(async move {
                ev.wait().await.unwrap();
                woke.store(true, Ordering::SeqCst);
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!woke.load(Ordering::SeqCst));

        ds.push(record(json!({"enabled": true, "mode": "teleop"})));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();
        assert!(woke.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_waiters_released_together() {
        let ds = Datastream::new("tick");
        let ev = ds.set_event(Predicate::Present("t".into()));
        let released = Arc::new(AtomicUsize::new(0));

        let mut joins = Vec::new();
        for _ in 0..3 {
            let ev = ev.clone();
            let released = released.clone();
            joins.push(tokio::spawn(async move {
                ev.wait().await.unwrap();
                released.fetch_add(1, Ordering::SeqCst);
            }));
        }
        tokio::task::yield_now().await;
        assert_eq!(released.load(Ordering::SeqCst), 0);

        ds.push(record(json!({"t": 1})));
        for j in joins {
            tokio::time::timeout(Duration::from_secs(1), j)
                .await
                .expect("released")
                .unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_independent_events_on_one_stream() {
        let ds = Datastream::new("gamemode");
        let enabled = ds.set_event(Predicate::is_true("enabled"));
        let teleop = ds.set_event(Predicate::equals("mode", "teleop"));

        ds.push(record(json!({"enabled": true, "mode": "autonomous"})));
        assert!(enabled.is_ready());
        assert!(!teleop.is_ready());

        ds.push(record(json!({"enabled": false, "mode": "teleop"})));
        assert!(!enabled.is_ready());
        assert!(teleop.is_ready());

        teleop.drop_event();
        ds.push(record(json!({"enabled": true, "mode": "teleop"})));
        assert!(enabled.is_ready());
        assert_eq!(ds.subscriber_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_pending_waiters_with_error() {
        let ds = Datastream::new("gamemode");
        let ev = ds.set_event(Predicate::is_true("enabled"));

        let waiter = {
            let ev = ev.clone();
            tokio::spawn(async move { ev.wait().await })
        };
        tokio::task::yield_now().await;

        ev.drop_event();
        let res = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();
        assert_eq!(
            res,
            Err(EventError::Dropped {
                stream: "gamemode".into()
            })
        );
        assert!(ev.wait().await.is_err());
    }
}
