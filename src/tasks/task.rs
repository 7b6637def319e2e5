//! # Task abstraction.
//!
//! A [`Task`] has a stable name and produces the future that the scheduler
//! drives. The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable
//! for sharing across the runtime.
//!
//! A task receives a [`CancellationToken`] that fires on runtime shutdown; it
//! should observe it at its suspension points and return promptly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// # Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// # Cooperative unit of control logic.
///
/// The body runs on the scheduler's single thread. Between suspension points
/// (`sleep`, `yield_now`, `Event::wait`) it runs uninterrupted, so a body that
/// never suspends starves every other task.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use loopvisor::{BoxTaskFuture, Task};
///
/// struct Demo;
///
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Ok(());
///             }
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates the future the scheduler will drive to completion.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
