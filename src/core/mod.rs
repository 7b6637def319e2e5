//! Runtime core: task scheduling and lifecycle.
//!
//! The only public API from this module is [`Scheduler`] (and its builder),
//! which drives tasks cooperatively, tracks their lifecycle and performs
//! graceful shutdown.
//!
//! Internal modules:
//! - [`runner`]: runs a task body once, catching panics and publishing the terminal notice;
//! - [`actor`]: publishes `TaskStarting` and drives the runner;
//! - [`registry`]: owns running tasks, rejects duplicate names, cleans up finished ones;
//! - [`alive`]: tracks which tasks are running for stuck-task reports;
//! - [`scheduler`]: orchestrates the above and handles shutdown;
//! - [`shutdown`]: OS signal handling.

mod actor;
mod alive;
mod builder;
mod registry;
mod runner;
mod scheduler;
mod shutdown;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
