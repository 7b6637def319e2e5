//! # Task abstractions and specifications.
//!
//! - [`Task`] - trait for cooperative, cancelable task bodies
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskSpec`] - task plus owning module
//! - [`sleep`], [`yield_now`] - the two suspension points besides `Event::wait`

mod spec;
mod task;
mod task_fn;

pub use spec::TaskSpec;
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;

/// Suspends the calling task for the given duration (timer suspension point).
pub use tokio::time::sleep;

/// Gives up the current turn so other runnable tasks progress.
pub use tokio::task::yield_now;
