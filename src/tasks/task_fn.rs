//! # Closure-backed tasks.
//!
//! Most control loops are a closure over a few datastreams and handles.
//! [`TaskFn`] turns `Fn(CancellationToken) -> impl Future` into a [`Task`];
//! the closure is called once when the scheduler starts the task, so anything
//! the body needs is cloned out of the captures first.
//!
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use loopvisor::{DatastreamRegistry, TaskError, TaskFn, TaskRef};
//!
//! let streams = DatastreamRegistry::new();
//! let heartbeat = streams.get("heartbeat");
//!
//! let t: TaskRef = TaskFn::arc("heartbeat", move |ctx: CancellationToken| {
//!     let heartbeat = heartbeat.clone();
//!     async move {
//!         while !ctx.is_cancelled() {
//!             heartbeat.push_value(serde_json::json!({ "alive": true }))?;
//!             loopvisor::sleep(Duration::from_millis(100)).await;
//!         }
//!         Ok::<(), TaskError>(())
//!     }
//! });
//! assert_eq!(t.name(), "heartbeat");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// A named closure run as a task.
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    body: F,
}

impl<F> fmt::Debug for TaskFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskFn").field(&self.name).finish()
    }
}

impl<F> TaskFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// [`TaskFn::new`] wrapped in an `Arc`, ready to be used as a [`TaskRef`](crate::TaskRef).
    pub fn arc(name: impl Into<Cow<'static, str>>, body: F) -> Arc<Self> {
        Arc::new(Self::new(name, body))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.body)(ctx))
    }
}
