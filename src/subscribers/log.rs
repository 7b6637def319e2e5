//! # LogWriter: notices as `tracing` events
//!
//! A subscriber that renders every [`Notice`] as a structured `tracing`
//! event. Task failures and deaths log at `error`, overflow and grace
//! problems at `warn`, everything else at `info`/`debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  loopvisor: task starting task="claw.teleop_loop"
//! ERROR loopvisor: task failed task="claw.run_loop" reason="device motor:7 failed: ..."
//! INFO  loopvisor: referee neutralized module="claw" handles=8
//! WARN  loopvisor: grace exceeded
//! ```

use async_trait::async_trait;

use crate::notices::{Notice, NoticeKind};
use crate::subscribers::Subscribe;

/// Notice writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_notice(&self, n: &Notice) {
        let task = n.task.as_deref().unwrap_or("-");
        let module = n.module.as_deref().unwrap_or("-");
        let reason = n.reason.as_deref().unwrap_or("-");

        match n.kind {
            NoticeKind::TaskStarting => tracing::info!(target: "loopvisor", task, "task starting"),
            NoticeKind::TaskStopped => tracing::info!(target: "loopvisor", task, "task stopped"),
            NoticeKind::TaskFailed => {
                tracing::error!(target: "loopvisor", task, reason, "task failed")
            }
            NoticeKind::TaskDead => tracing::error!(target: "loopvisor", task, reason, "task died"),
            NoticeKind::TaskAddRequested => {
                tracing::debug!(target: "loopvisor", task, "task add requested")
            }
            NoticeKind::TaskAdded => tracing::debug!(target: "loopvisor", task, "task added"),
            NoticeKind::TaskRemoved => tracing::debug!(target: "loopvisor", task, "task removed"),
            NoticeKind::ModuleInitialized => {
                tracing::info!(target: "loopvisor", module, "module initialized")
            }
            NoticeKind::RefereeNeutralized => tracing::info!(
                target: "loopvisor",
                module,
                handles = n.handles.unwrap_or(0),
                "referee neutralized"
            ),
            NoticeKind::RefereeReleased => tracing::info!(
                target: "loopvisor",
                module,
                handles = n.handles.unwrap_or(0),
                "referee released"
            ),
            NoticeKind::ShutdownRequested => {
                tracing::info!(target: "loopvisor", "shutdown requested")
            }
            NoticeKind::AllStoppedWithin => {
                tracing::info!(target: "loopvisor", "all tasks stopped within grace")
            }
            NoticeKind::GraceExceeded => tracing::warn!(target: "loopvisor", "grace exceeded"),
            NoticeKind::SubscriberOverflow => tracing::warn!(
                target: "loopvisor",
                subscriber = task,
                reason,
                "subscriber overflow"
            ),
            NoticeKind::SubscriberPanicked => tracing::error!(
                target: "loopvisor",
                subscriber = task,
                reason,
                "subscriber panicked"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
