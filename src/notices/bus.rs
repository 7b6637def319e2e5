//! # Notice bus for broadcasting runtime notices.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing from multiple sources (actors, registry, referees).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Consumers:
//!   Actor 1  ──┐
//!   Actor 2  ──┼──────► Bus ───┬──► subscriber_listener ────► SubscriberSet
//!   Referee  ──┤  (broadcast)  └──► TaskRegistry listener (add requests, cleanup)
//!   Registry ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: a single ring buffer stores recent notices for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: notices are lost if nobody listens at send time.

use tokio::sync::broadcast;

use super::notice::Notice;

/// Broadcast channel for runtime notices.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Notice>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Notice>(capacity);
        Self { tx }
    }

    /// Publishes a notice to all active receivers.
    ///
    /// If there are no receivers, the notice is dropped.
    pub fn publish(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }

    /// Creates a new receiver that will observe subsequent notices.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notices::NoticeKind;

    #[tokio::test]
    async fn test_receivers_see_notices_sent_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Notice::new(NoticeKind::TaskAdded));

        let mut rx = bus.subscribe();
        bus.publish(Notice::new(NoticeKind::TaskRemoved).with_task("t"));
        let n = rx.recv().await.unwrap();
        assert_eq!(n.kind, NoticeKind::TaskRemoved);
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_oldest() {
        let bus = Bus::new(1);
        let mut rx = bus.subscribe();
        bus.publish(Notice::new(NoticeKind::TaskStarting));
        bus.publish(Notice::new(NoticeKind::TaskStopped));
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().kind, NoticeKind::TaskStopped);
    }
}
