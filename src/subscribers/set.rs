//! # Non-blocking notice fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`]: distributes notices to multiple subscribers
//! without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(notice)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_notice()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_notice()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_notice()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**
//! - **Overflow**: notice dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: slow/panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**
//!
//! Workers use `catch_unwind` with `AssertUnwindSafe`: a subscriber panicking
//! while holding a lock on shared state may leave that state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::notices::{Bus, Notice, NoticeKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Notice>>,
}

/// Fan-out coordinator for multiple notice subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Notice>>(cap);
            let s = Arc::clone(&sub);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(n) = rx.recv().await {
                    let fut = s.on_notice(n.as_ref());

                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let info = panic_message(&*panic_err);
                        bus_for_worker.publish(Notice::subscriber_panicked(s.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits a notice to all subscribers (clones it once into an `Arc`).
    pub fn emit(&self, notice: &Notice) {
        self.emit_arc(Arc::new(notice.clone()));
    }

    /// Emits a pre-allocated `Arc<Notice>` to all subscribers.
    ///
    /// Overflow notices that themselves overflow are not re-published.
    pub fn emit_arc(&self, notice: Arc<Notice>) {
        let is_overflow = matches!(notice.kind, NoticeKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&notice)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus
                    .publish(Notice::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Drops every queue and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Recorder {
        seen: Mutex<Vec<NoticeKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_notice(&self, n: &Notice) {
            self.seen.lock().push(n.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_notice(&self, _n: &Notice) {
            panic!("subscriber exploded");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn test_fan_out_and_panic_isolation() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let set = SubscriberSet::new(vec![rec.clone(), Arc::new(Panicker)], bus);

        set.emit(&Notice::new(NoticeKind::TaskStarting));
        set.emit(&Notice::new(NoticeKind::TaskStopped));

        let panicked = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic notice published")
            .unwrap();
        assert_eq!(panicked.kind, NoticeKind::SubscriberPanicked);
        assert_eq!(panicked.reason.as_deref(), Some("subscriber exploded"));

        set.shutdown().await;
        assert_eq!(
            *rec.seen.lock(),
            vec![NoticeKind::TaskStarting, NoticeKind::TaskStopped]
        );
    }
}
