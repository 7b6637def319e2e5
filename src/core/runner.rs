//! # Run a task body exactly once.
//!
//! Executes one [`Task`] with a child cancellation token and publishes the
//! terminal lifecycle notice to [`Bus`].
//!
//! ## Notice flow
//!
//! ```text
//! Success:
//!   task.spawn() → Ok(()) → publish TaskStopped
//!
//! Cancellation (the task observed shutdown on its token):
//!   task.spawn() → Err(Canceled) → publish TaskStopped
//!
//! Failure:
//!   task.spawn() → Err(Fail/Hardware/...) → publish TaskFailed
//!
//! Panic:
//!   task.spawn() panics → publish TaskDead
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal notice
//! - A failed or panicking body is never re-run
//! - Cancellation is cooperative: the body decides when to observe the token

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    notices::{Bus, Notice, NoticeKind},
    subscribers::panic_message,
    tasks::Task,
};

/// How a single run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed,
    Canceled,
    Failed,
    Panicked,
}

/// Executes `task` once, publishing lifecycle notices to `bus`.
pub(crate) async fn run_once<T: Task + ?Sized>(
    task: &T,
    parent: &CancellationToken,
    bus: &Bus,
) -> RunOutcome {
    let child = parent.child_token();
    let res = std::panic::AssertUnwindSafe(task.spawn(child))
        .catch_unwind()
        .await;

    match res {
        Ok(Ok(())) => {
            publish_stopped(bus, task.name());
            RunOutcome::Completed
        }
        Ok(Err(TaskError::Canceled)) => {
            publish_stopped(bus, task.name());
            RunOutcome::Canceled
        }
        Ok(Err(e)) => {
            tracing::warn!(target: "loopvisor", task = task.name(), error = %e, label = e.as_label(), "task failed");
            bus.publish(
                Notice::new(NoticeKind::TaskFailed)
                    .with_task(task.name())
                    .with_reason(e.to_string()),
            );
            RunOutcome::Failed
        }
        Err(panic) => {
            let info = panic_message(&*panic);
            tracing::error!(target: "loopvisor", task = task.name(), panic = %info, "task panicked");
            bus.publish(
                Notice::new(NoticeKind::TaskDead)
                    .with_task(task.name())
                    .with_reason(info),
            );
            RunOutcome::Panicked
        }
    }
}

fn publish_stopped(bus: &Bus, name: &str) {
    bus.publish(Notice::new(NoticeKind::TaskStopped).with_task(name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{TaskFn, TaskRef};

    async fn next_kind(rx: &mut tokio::sync::broadcast::Receiver<Notice>) -> NoticeKind {
        rx.recv().await.expect("notice").kind
    }

    #[tokio::test]
    async fn test_failure_is_reported_once() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let task: TaskRef = TaskFn::arc("bad", |_ctx: CancellationToken| async move {
            Err::<(), _>(TaskError::fail("boom"))
        });

        let out = run_once(task.as_ref(), &CancellationToken::new(), &bus).await;
        assert_eq!(out, RunOutcome::Failed);
        let n = rx.recv().await.unwrap();
        assert_eq!(n.kind, NoticeKind::TaskFailed);
        assert!(n.reason.as_deref().unwrap_or_default().contains("boom"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_panic_becomes_task_dead() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let task: TaskRef = TaskFn::arc("explodes", |_ctx: CancellationToken| async move {
            if true {
                panic!("kaboom");
            }
            Ok::<(), TaskError>(())
        });

        let out = run_once(task.as_ref(), &CancellationToken::new(), &bus).await;
        assert_eq!(out, RunOutcome::Panicked);
        assert_eq!(next_kind(&mut rx).await, NoticeKind::TaskDead);
    }

    #[tokio::test]
    async fn test_observed_cancellation_is_a_clean_stop() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        token.cancel();
        let task: TaskRef = TaskFn::arc("waits", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(TaskError::Canceled)
        });

        let out = run_once(task.as_ref(), &token, &bus).await;
        assert_eq!(out, RunOutcome::Canceled);
        assert_eq!(next_kind(&mut rx).await, NoticeKind::TaskStopped);
    }
}
