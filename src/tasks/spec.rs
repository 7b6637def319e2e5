//! # Task specification.
//!
//! [`TaskSpec`] bundles a task with the name of the module that owns it. It is
//! what modules hand to `ModuleContext::add_task` and what
//! [`Scheduler::schedule`](crate::Scheduler::schedule) accepts.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::TaskRef;
use crate::tasks::task_fn::TaskFn;

/// Specification for running a task under the scheduler.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use loopvisor::{TaskSpec, TaskError};
///
/// let spec = TaskSpec::from_fn("claw.run_loop", |_ctx: CancellationToken| async move {
///     Ok::<(), TaskError>(())
/// })
/// .with_module("claw");
///
/// assert_eq!(spec.name(), "claw.run_loop");
/// assert_eq!(spec.module(), Some("claw"));
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    task: TaskRef,
    module: Option<Arc<str>>,
}

impl TaskSpec {
    /// Creates a specification for `task`.
    pub fn new(task: TaskRef) -> Self {
        Self { task, module: None }
    }

    /// Creates a specification from a closure (see [`TaskFn`]).
    pub fn from_fn<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self::new(TaskFn::arc(name, f))
    }

    /// Returns a new spec owned by `module`.
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Returns reference to the task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Convenience: returns the task name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Owning module, if any.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name())
            .field("module", &self.module)
            .finish()
    }
}
