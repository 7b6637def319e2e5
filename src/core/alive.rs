//! # Task liveness tracker with sequence-based ordering.
//!
//! Maintains which tasks are currently running, using notice sequence numbers
//! to reject out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! Scheduler ──► Bus ──► subscriber_listener() ──► AliveTracker::update()
//!                                                         │
//!                                                         ▼
//!                                              HashMap<String, TaskState>
//!                                                  (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - Only `TaskStarting` / `TaskStopped` / `TaskFailed` / `TaskDead` change alive state
//! - `TaskRemoved` forgets a stopped task, so generated task names do not pile up
//! - Reads (`snapshot`, `is_alive`) are **eventually consistent**
//! - Notices with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::notices::{Notice, NoticeKind};

#[derive(Debug, Clone)]
struct TaskState {
    last_seq: u64,
    alive: bool,
}

/// Tracker of running tasks, used to name stuck tasks on shutdown.
pub(crate) struct AliveTracker {
    state: RwLock<HashMap<String, TaskState>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies `n` if it is newer than the last notice seen for its task.
    ///
    /// ```text
    /// update(TaskStopped, seq=100)  → alive=false, last_seq=100
    /// update(TaskStarting, seq=99)  → rejected (stale)
    /// ```
    pub(crate) async fn update(&self, n: &Notice) -> bool {
        let Some(name) = n.task.as_deref() else {
            return false;
        };
        let alive = match n.kind {
            NoticeKind::TaskStarting => true,
            NoticeKind::TaskStopped | NoticeKind::TaskFailed | NoticeKind::TaskDead => false,
            NoticeKind::TaskRemoved => return self.forget(name, n.seq).await,
            _ => return false,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(TaskState {
            last_seq: 0,
            alive: false,
        });
        if n.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = n.seq;
        entry.alive = alive;
        true
    }

    /// Drops the entry of a stopped task. A task that restarted under the
    /// same name after `seq` is kept.
    async fn forget(&self, name: &str, seq: u64) -> bool {
        let mut state = self.state.write().await;
        match state.get(name) {
            Some(ts) if !ts.alive && ts.last_seq < seq => {
                state.remove(name);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    /// Sorted names of tasks currently believed alive.
    pub(crate) async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ts)| ts.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    pub(crate) async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .is_some_and(|ts| ts.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_notice_is_rejected() {
        let tracker = AliveTracker::new();
        let starting = Notice::new(NoticeKind::TaskStarting).with_task("arm.loop");
        let stopped = Notice::new(NoticeKind::TaskStopped).with_task("arm.loop");

        assert!(tracker.update(&stopped).await);
        assert!(!tracker.update(&starting).await);
        assert!(!tracker.is_alive("arm.loop").await);
    }

    #[tokio::test]
    async fn test_snapshot_lists_running_tasks_sorted() {
        let tracker = AliveTracker::new();
        for name in ["b", "a", "c"] {
            tracker
                .update(&Notice::new(NoticeKind::TaskStarting).with_task(name))
                .await;
        }
        tracker
            .update(&Notice::new(NoticeKind::TaskDead).with_task("c"))
            .await;
        assert_eq!(tracker.snapshot().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_removed_tasks_are_forgotten() {
        let tracker = AliveTracker::new();
        for i in 0..50 {
            let name = format!("worker{i}");
            for kind in [NoticeKind::TaskStarting, NoticeKind::TaskStopped, NoticeKind::TaskRemoved] {
                tracker.update(&Notice::new(kind).with_task(name.as_str())).await;
            }
        }
        assert_eq!(tracker.len().await, 0);
    }

    #[tokio::test]
    async fn test_removal_of_old_run_keeps_restarted_task() {
        let tracker = AliveTracker::new();
        let stopped = Notice::new(NoticeKind::TaskStopped).with_task("arm.loop");
        let removed = Notice::new(NoticeKind::TaskRemoved).with_task("arm.loop");
        let restarted = Notice::new(NoticeKind::TaskStarting).with_task("arm.loop");

        tracker.update(&stopped).await;
        tracker.update(&restarted).await;
        assert!(!tracker.update(&removed).await);
        assert!(tracker.is_alive("arm.loop").await);
    }
}
