//! # Task registry: notice-driven task lifecycle manager.
//!
//! The registry owns every running task. Its listener serves two inputs:
//! - the add channel (`request_add`) → spawns an actor and registers it
//! - the [`Bus`]: `TaskStopped` / `TaskFailed` / `TaskDead` → removes the finished task
//!
//! ## Architecture
//! ```text
//! request_add(spec) ──► mpsc ──┐
//!                              ▼  (drained first)
//!                    TaskRegistry listener ──► spawn_and_register(spec)
//!                              ▲
//! Bus ─────────────────────────┘
//!         ├─► TaskStopped(name)      → cleanup_task(name)
//!         ├─► TaskFailed(name)       → cleanup_task(name)
//!         └─► TaskDead(name)         → cleanup_task(name)
//! ```
//!
//! ## Rules
//! - Add requests never go through the broadcast bus, so a lagging listener
//!   loses terminal notices (recovered by reaping) but never a spec
//! - Task names are unique among registered tasks; a duplicate is rejected
//!   with `TaskFailed(reason = "task_already_exists")`
//! - The registry lock is held across spawn + insert, so cleanup for a task
//!   that finishes immediately always observes its entry
//! - Waiters on [`TaskRegistry::wait_empty`] are woken when the last task leaves
//! - A join abandoned midway (grace timeout) aborts the task it was joining

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, RwLock, broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::actor::TaskActor;
use crate::core::runner::RunOutcome;
use crate::notices::{Bus, Notice, NoticeKind};
use crate::tasks::TaskSpec;

/// Handle to a running task actor.
struct Entry {
    spec: TaskSpec,
    join: JoinHandle<RunOutcome>,
}

/// Aborts the actor when dropped before the join completed.
struct AbortOnDrop(JoinHandle<RunOutcome>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Notice-driven registry of running tasks.
pub(crate) struct TaskRegistry {
    tasks: RwLock<HashMap<String, Entry>>,
    bus: Bus,
    runtime_token: CancellationToken,
    drained: Notify,
    adds: mpsc::UnboundedSender<TaskSpec>,
    adds_rx: Mutex<Option<mpsc::UnboundedReceiver<TaskSpec>>>,
    /// Task taken out of the map by `join_all` and not joined yet.
    joining: Mutex<Option<String>>,
}

impl TaskRegistry {
    pub(crate) fn new(bus: Bus, runtime_token: CancellationToken) -> Arc<Self> {
        let (adds, adds_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tasks: RwLock::new(HashMap::new()),
            bus,
            runtime_token,
            drained: Notify::new(),
            adds,
            adds_rx: Mutex::new(Some(adds_rx)),
            joining: Mutex::new(None),
        })
    }

    /// Hands `spec` to the listener. Returns `false` once the listener is gone.
    pub(crate) fn request_add(&self, spec: TaskSpec) -> bool {
        self.adds.send(spec).is_ok()
    }

    /// Spawns the listener. Only the first call has an effect.
    ///
    /// The listener exits when the runtime token is cancelled; from then on
    /// the scheduler joins the remaining tasks itself. Pending add requests
    /// are served before bus notices, so a task scheduled right before its
    /// parent finishes is registered before the parent is cleaned up.
    pub(crate) fn spawn_listener(self: &Arc<Self>) {
        let Some(mut adds) = self.adds_rx.lock().take() else {
            return;
        };
        let mut rx = self.bus.subscribe();
        let rt = self.runtime_token.clone();
        let me = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = rt.cancelled() => break,
                    Some(spec) = adds.recv() => {
                        me.spawn_and_register(spec).await;
                    }
                    msg = rx.recv() => match msg {
                        Ok(n) => me.handle_notice(&n).await,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(target: "loopvisor", skipped, "task registry lagged");
                            me.reap_finished().await;
                        }
                    }
                }
            }
        });
    }

    async fn handle_notice(&self, n: &Notice) {
        match n.kind {
            NoticeKind::TaskStopped | NoticeKind::TaskFailed | NoticeKind::TaskDead => {
                if let Some(name) = &n.task {
                    self.cleanup_task(name).await;
                }
            }
            _ => {}
        }
    }

    /// Sorted names of registered tasks.
    pub(crate) async fn list(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Sorted names of registered tasks whose actor is still running.
    pub(crate) async fn unfinished(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut names: Vec<String> = tasks
            .iter()
            .filter(|(_, e)| !e.join.is_finished())
            .map(|(n, _)| n.clone())
            .collect();
        names.extend(self.joining.lock().clone());
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Owning module of a registered task.
    pub(crate) async fn module_of(&self, name: &str) -> Option<String> {
        let tasks = self.tasks.read().await;
        tasks
            .get(name)
            .and_then(|e| e.spec.module().map(str::to_string))
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Resolves once no task is registered.
    pub(crate) async fn wait_empty(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty().await {
                return;
            }
            notified.await;
        }
    }

    /// Spawns an actor for `spec` and registers it under its name.
    ///
    /// Returns `false` if a task with that name is already registered.
    pub(crate) async fn spawn_and_register(&self, spec: TaskSpec) -> bool {
        let name = spec.name().to_string();
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&name) {
            drop(tasks);
            tracing::warn!(target: "loopvisor", task = %name, "duplicate task name rejected");
            self.bus.publish(
                Notice::new(NoticeKind::TaskFailed)
                    .with_task(name)
                    .with_reason("task_already_exists"),
            );
            return false;
        }

        let actor = TaskActor::new(self.bus.clone(), Arc::clone(spec.task()));
        let token = self.runtime_token.child_token();
        let join = tokio::spawn(actor.run(token));
        tasks.insert(name.clone(), Entry { spec, join });
        drop(tasks);

        self.bus
            .publish(Notice::new(NoticeKind::TaskAdded).with_task(name));
        true
    }

    /// Removes a finished task.
    async fn cleanup_task(&self, name: &str) {
        if let Some(entry) = self.take_entry(name).await {
            self.join_and_report(name, entry.join).await;
        }
    }

    /// Removes every entry whose actor already ended (used after a lag).
    async fn reap_finished(&self) {
        let finished: Vec<(String, Entry)> = {
            let mut tasks = self.tasks.write().await;
            let names: Vec<String> = tasks
                .iter()
                .filter(|(_, e)| e.join.is_finished())
                .map(|(n, _)| n.clone())
                .collect();
            names
                .into_iter()
                .filter_map(|n| tasks.remove_entry(&n))
                .collect()
        };
        for (name, entry) in finished {
            self.join_and_report(&name, entry.join).await;
        }
        self.notify_if_empty().await;
    }

    /// Joins every remaining task, one at a time, removing each after it ends.
    pub(crate) async fn join_all(&self) {
        loop {
            let next = {
                let mut tasks = self.tasks.write().await;
                let key = tasks.keys().next().cloned();
                key.and_then(|k| tasks.remove_entry(&k))
            };
            match next {
                Some((name, entry)) => {
                    *self.joining.lock() = Some(name.clone());
                    self.join_and_report(&name, entry.join).await;
                    *self.joining.lock() = None;
                }
                None => break,
            }
        }
        self.drained.notify_waiters();
    }

    /// Aborts whatever is still registered.
    ///
    /// The task `join_all` was waiting on when it got cancelled is aborted by
    /// that join being dropped.
    pub(crate) async fn abort_all(&self) {
        *self.joining.lock() = None;
        let entries: Vec<(String, Entry)> = self.tasks.write().await.drain().collect();
        for (name, entry) in entries {
            entry.join.abort();
            tracing::warn!(target: "loopvisor", task = %name, "task aborted after grace");
        }
        self.drained.notify_waiters();
    }

    async fn take_entry(&self, name: &str) -> Option<Entry> {
        let taken = self.tasks.write().await.remove(name);
        if taken.is_some() {
            self.notify_if_empty().await;
        }
        taken
    }

    async fn notify_if_empty(&self) {
        if self.is_empty().await {
            self.drained.notify_waiters();
        }
    }

    /// Awaits the actor and emits `TaskRemoved`.
    ///
    /// Panics are caught inside the actor; a `JoinError` here means the
    /// actor itself was aborted or panicked outside the body.
    async fn join_and_report(&self, name: &str, join: JoinHandle<RunOutcome>) {
        let mut join = AbortOnDrop(join);
        if let Err(err) = (&mut join.0).await {
            if err.is_panic() {
                self.bus.publish(
                    Notice::new(NoticeKind::TaskDead)
                        .with_task(name)
                        .with_reason("actor_panic"),
                );
            }
        }
        self.bus
            .publish(Notice::new(NoticeKind::TaskRemoved).with_task(name));
    }
}
