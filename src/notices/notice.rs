//! # Runtime notices emitted by the scheduler, task actors and referees.
//!
//! The [`NoticeKind`] enum classifies notices across four categories:
//! - **Lifecycle**: task execution flow (starting, stopped, failed, dead)
//! - **Management**: task registration (add requests and confirmations, removal)
//! - **Safety**: referee transitions (neutralized, released)
//! - **Shutdown**: shutdown requested, all stopped, grace exceeded
//!
//! The [`Notice`] struct carries metadata such as timestamps, task or module
//! name and reasons.
//!
//! ## Ordering guarantees
//! Each notice has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when notices are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use loopvisor::{Notice, NoticeKind};
//!
//! let n = Notice::new(NoticeKind::TaskFailed)
//!     .with_task("claw.run_loop")
//!     .with_reason("boom");
//!
//! assert_eq!(n.kind, NoticeKind::TaskFailed);
//! assert_eq!(n.task.as_deref(), Some("claw.run_loop"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for notice ordering.
static NOTICE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    // === Subscriber notices ===
    /// Subscriber panicked during notice processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped a notice (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Shutdown notices ===
    /// Shutdown requested (OS signal or explicit call).
    ShutdownRequested,

    /// All tasks stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some tasks did not stop in time.
    GraceExceeded,

    // === Module notices ===
    /// A module finished `init`.
    ///
    /// Sets:
    /// - `module`: module name
    ModuleInitialized,

    // === Task lifecycle notices ===
    /// Task body is about to run.
    ///
    /// Sets:
    /// - `task`: task name
    TaskStarting,

    /// Task body returned `Ok` or observed cancellation.
    ///
    /// Sets:
    /// - `task`: task name
    TaskStopped,

    /// Task body returned an error.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: error message
    TaskFailed,

    /// Task body panicked.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: "task_panic"
    TaskDead,

    // === Task management notices ===
    /// A task was scheduled while running. Informational; the spec itself
    /// travels to the registry over its own channel.
    ///
    /// Sets:
    /// - `task`: task name
    TaskAddRequested,

    /// Task was registered and its actor spawned.
    TaskAdded,

    /// Task was removed from the registry after it finished.
    TaskRemoved,

    // === Safety notices ===
    /// A referee neutralized its handles.
    ///
    /// Sets:
    /// - `module`: owning module
    /// - `handles`: number of live handles
    RefereeNeutralized,

    /// A referee released its handles to task control.
    ///
    /// Sets:
    /// - `module`: owning module
    /// - `handles`: number of live handles
    RefereeReleased,
}

/// Runtime notice with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`NoticeKind`]
#[derive(Clone)]
pub struct Notice {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Notice classification.
    pub kind: NoticeKind,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Name of the module, if applicable.
    pub module: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of handles affected by a referee transition.
    pub handles: Option<u32>,
}

impl std::fmt::Debug for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notice")
            .field("seq", &self.seq)
            .field("kind", &self.kind)
            .field("task", &self.task)
            .field("module", &self.module)
            .field("reason", &self.reason)
            .field("handles", &self.handles)
            .finish()
    }
}

impl Notice {
    /// Creates a new notice of the given kind with current timestamp and next sequence number.
    pub fn new(kind: NoticeKind) -> Self {
        Self {
            seq: NOTICE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            module: None,
            reason: None,
            handles: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a module name.
    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attaches a handle count.
    #[inline]
    pub fn with_handles(mut self, n: usize) -> Self {
        self.handles = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow notice.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Notice::new(NoticeKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic notice.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Notice::new(NoticeKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
