//! # Scheduler: cooperative single-threaded task driver.
//!
//! The [`Scheduler`] owns the notice bus, the [`SubscriberSet`], the task
//! registry and the runtime cancellation token. It drives every registered
//! task on **one** thread: a task body runs uninterrupted until it reaches a
//! suspension point (`sleep`, `yield_now`, `Event::wait`), at which point the
//! next runnable task gets its turn.
//!
//! ## Key responsibilities
//! - refuse to run outside a current-thread tokio runtime
//! - subscribe to the [`Bus`] and **fan-out** notices via [`SubscriberSet`]
//! - register tasks (initial list and [`Scheduler::schedule`] at runtime)
//! - handle OS termination signals and [`Scheduler::shutdown`]
//! - graceful shutdown with a configurable [`Config::grace`]
//!
//! ## High-level architecture
//! ```text
//! run(Vec<TaskSpec>):
//!   - check runtime flavor == CurrentThread
//!   - subscriber_listener(): Bus ─► AliveTracker::update + SubscriberSet::emit
//!   - registry.spawn_listener(): add channel ─► spawn; Bus ─► TaskStopped / ...
//!   - registry.spawn_and_register(spec) for each initial spec
//!
//!   select! {
//!     all tasks finished           → Ok(())
//!     OS signal | shutdown()       → ShutdownRequested
//!                                    runtime_token.cancel()
//!                                    wait_all_with_grace(cfg.grace):
//!                                      ├─ all joined → AllStoppedWithin, Ok(())
//!                                      └─ timeout    → GraceExceeded, Err(stuck)
//!   }
//! ```
//!
//! ## Fairness
//! Runnable tasks are served in FIFO order by the current-thread runtime, so a
//! ready task is never skipped indefinitely. Tasks suspended on an event or a
//! timer consume no CPU until woken.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{alive::AliveTracker, builder::SchedulerBuilder, registry::TaskRegistry, shutdown},
    error::RuntimeError,
    notices::{Bus, Notice, NoticeKind},
    subscribers::SubscriberSet,
    tasks::TaskSpec,
};

/// Drives tasks cooperatively on a single thread and coordinates shutdown.
pub struct Scheduler {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    alive: Arc<AliveTracker>,
    registry: Arc<TaskRegistry>,
    runtime_token: CancellationToken,
    /// Specs scheduled before `run`; `None` once started.
    queued: Mutex<Option<Vec<TaskSpec>>>,
}

impl Scheduler {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        alive: Arc<AliveTracker>,
        registry: Arc<TaskRegistry>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            alive,
            registry,
            runtime_token,
            queued: Mutex::new(Some(Vec::new())),
        }
    }

    /// Creates a builder. [`SchedulerBuilder::build`] must run inside a tokio runtime.
    pub fn builder(cfg: Config) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Runs the given tasks until either:
    /// - every task has finished, or
    /// - shutdown was requested (signal or [`Scheduler::shutdown`]).
    ///
    /// Returns [`RuntimeError::NotSingleThreaded`] on a multi-thread runtime,
    /// and [`RuntimeError::AlreadyStarted`] on a second call.
    pub async fn run(&self, tasks: Vec<TaskSpec>) -> Result<(), RuntimeError> {
        if Handle::current().runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(RuntimeError::NotSingleThreaded);
        }
        let queued = {
            let mut queued = self.queued.lock();
            if queued.is_none() {
                return Err(RuntimeError::AlreadyStarted);
            }
            self.subscriber_listener();
            self.registry.spawn_listener();
            queued.take().unwrap_or_default()
        };

        for spec in tasks.into_iter().chain(queued) {
            self.registry.spawn_and_register(spec).await;
        }
        self.drive_shutdown().await
    }

    /// Adds a task to the run set.
    ///
    /// Before `run` the spec is queued and started with the initial tasks.
    /// Afterwards registration is asynchronous; a name already in use is
    /// rejected with a `TaskFailed` notice. Once shutdown began the task is
    /// not started and a `TaskFailed` notice with reason
    /// `"runtime_shutting_down"` is published instead.
    pub fn schedule(&self, spec: TaskSpec) {
        let mut queued = self.queued.lock();
        if let Some(queue) = queued.as_mut() {
            queue.push(spec);
            return;
        }
        drop(queued);

        let name = spec.name().to_string();
        self.bus
            .publish(Notice::new(NoticeKind::TaskAddRequested).with_task(name.clone()));
        if self.runtime_token.is_cancelled() || !self.registry.request_add(spec) {
            tracing::warn!(target: "loopvisor", task = %name, "task scheduled during shutdown, not started");
            self.bus.publish(
                Notice::new(NoticeKind::TaskFailed)
                    .with_task(name)
                    .with_reason("runtime_shutting_down"),
            );
        }
    }

    /// Requests graceful shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Returns `true` once shutdown was requested.
    pub fn is_shutting_down(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Sorted names of currently registered tasks.
    pub async fn list(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Owning module of a registered task, if any.
    pub async fn module_of(&self, task: &str) -> Option<String> {
        self.registry.module_of(task).await
    }

    /// Returns `true` while `task` is running its body.
    pub async fn is_alive(&self, task: &str) -> bool {
        self.alive.is_alive(task).await
    }

    /// Notice bus shared by every runtime component.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token cancelled when shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.runtime_token.clone()
    }

    /// Forwards bus notices to the alive tracker and the subscriber set.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let alive = Arc::clone(&self.alive);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(n) => {
                        alive.update(&n).await;
                        set.emit(&n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "loopvisor", skipped, "subscriber listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    async fn drive_shutdown(&self) -> Result<(), RuntimeError> {
        let signal = async {
            if self.cfg.handle_signals {
                shutdown::signal_or_never().await
            } else {
                std::future::pending::<&'static str>().await
            }
        };

        tokio::select! {
            name = signal => {
                tracing::info!(target: "loopvisor", signal = name, "termination signal received");
                self.bus.publish(Notice::new(NoticeKind::ShutdownRequested).with_reason(name));
                self.runtime_token.cancel();
                self.wait_all_with_grace().await
            }
            _ = self.runtime_token.cancelled() => {
                self.bus.publish(Notice::new(NoticeKind::ShutdownRequested));
                self.wait_all_with_grace().await
            }
            _ = self.registry.wait_empty() => Ok(()),
        }
    }

    /// Waits up to [`Config::grace`] for every task to stop.
    async fn wait_all_with_grace(&self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.registry.join_all()).await {
            Ok(()) => {
                self.bus.publish(Notice::new(NoticeKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let mut stuck = self.registry.unfinished().await;
                stuck.extend(self.alive.snapshot().await);
                stuck.sort_unstable();
                stuck.dedup();
                self.registry.abort_all().await;

                self.bus.publish(
                    Notice::new(NoticeKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}
