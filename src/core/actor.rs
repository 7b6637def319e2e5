//! # TaskActor: single-task driver.
//!
//! Drives one [`Task`] through its single run:
//!
//! ```text
//! TaskStarting → [task body] → TaskStopped (Ok / Canceled)
//!                            → TaskFailed  (Err)
//!                            → TaskDead    (panic)
//! ```
//!
//! There is no restart: a task whose body ends, for whatever reason, is done,
//! and the registry removes it. Other tasks are unaffected.

use tokio_util::sync::CancellationToken;

use crate::core::runner::{RunOutcome, run_once};
use crate::notices::{Bus, Notice, NoticeKind};
use crate::tasks::TaskRef;

/// Drives a single task to completion.
pub(crate) struct TaskActor {
    bus: Bus,
    task: TaskRef,
}

impl TaskActor {
    pub(crate) fn new(bus: Bus, task: TaskRef) -> Self {
        Self { bus, task }
    }

    /// Runs the task once under `token`.
    ///
    /// If `token` is already cancelled the body is never started.
    pub(crate) async fn run(self, token: CancellationToken) -> RunOutcome {
        if token.is_cancelled() {
            self.bus
                .publish(Notice::new(NoticeKind::TaskStopped).with_task(self.task.name()));
            return RunOutcome::Canceled;
        }
        self.bus
            .publish(Notice::new(NoticeKind::TaskStarting).with_task(self.task.name()));
        run_once(self.task.as_ref(), &token, &self.bus).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;

    #[tokio::test]
    async fn test_starting_precedes_terminal_notice() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let task: TaskRef = TaskFn::arc("once", |_ctx: CancellationToken| async move {
            Ok::<(), TaskError>(())
        });

        let out = TaskActor::new(bus, task).run(CancellationToken::new()).await;
        assert_eq!(out, RunOutcome::Completed);
        assert_eq!(rx.recv().await.unwrap().kind, NoticeKind::TaskStarting);
        assert_eq!(rx.recv().await.unwrap().kind, NoticeKind::TaskStopped);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_runs_body() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        token.cancel();
        let task: TaskRef = TaskFn::arc("late", |_ctx: CancellationToken| async move {
            Err::<(), _>(TaskError::fail("should not run"))
        });

        let out = TaskActor::new(bus, task).run(token).await;
        assert_eq!(out, RunOutcome::Canceled);
        assert_eq!(rx.recv().await.unwrap().kind, NoticeKind::TaskStopped);
    }
}
