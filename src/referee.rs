//! # Referee: per-module safety supervisor.
//!
//! Every module owns exactly one [`Referee`]. The referee watches the
//! module's device handles and decides whether the module's tasks may drive
//! them:
//!
//! ```text
//! gamemode { enabled: false } ──► neutralize(): hold every handle, write its neutral command
//! gamemode { enabled: true  } ──► release():    re-enable disabled controllers,
//!                                                 task writes reach the devices again
//! ```
//!
//! ## Rules
//! - A handle must be watched before it is used; unwatched handles refuse I/O.
//! - Handles start held. Nothing a task writes reaches an actuator until the
//!   referee releases it.
//! - A referee only ever touches its own module's handles.
//! - The referee keeps `Weak` references; dropping a handle silently
//!   removes it from the watch list.
//! - On runtime shutdown every referee neutralizes, whatever the gamemode.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    datastreams::Datastream,
    error::{HardwareError, TaskError},
    gamemode::GameMode,
    hardware::Handle,
    notices::{Bus, Notice, NoticeKind},
    tasks::TaskSpec,
};

/// Safety supervisor for one module's device handles.
pub struct Referee {
    module: Arc<str>,
    cfg: Config,
    watched: Mutex<Vec<Weak<Handle>>>,
    held: AtomicBool,
    bus: Option<Bus>,
}

impl std::fmt::Debug for Referee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Referee")
            .field("module", &self.module)
            .field("held", &self.is_held())
            .field("watched", &self.watched.lock().len())
            .finish()
    }
}

impl Referee {
    /// Creates a held referee for `module` using the neutral policies in `cfg`.
    pub fn new(module: impl Into<Arc<str>>, cfg: &Config) -> Self {
        Self {
            module: module.into(),
            cfg: cfg.clone(),
            watched: Mutex::new(Vec::new()),
            held: AtomicBool::new(true),
            bus: None,
        }
    }

    /// Publishes transitions as notices on `bus`.
    pub(crate) fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Owning module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Registers `handle` and returns it, making it usable.
    ///
    /// If the referee is currently released, the handle is released too;
    /// otherwise it stays held until the next [`Referee::release`].
    pub fn watch(&self, handle: Arc<Handle>) -> Arc<Handle> {
        handle.mark_watched();
        if !self.is_held() {
            if let Err(err) = handle.release(self.cfg.neutral_for(handle.kind())) {
                tracing::error!(module = %self.module, handle = %handle.id(), error = %err, "release on watch failed");
            }
        }
        let mut watched = self.watched.lock();
        if !watched
            .iter()
            .any(|w| std::ptr::eq(w.as_ptr(), Arc::as_ptr(&handle)))
        {
            watched.push(Arc::downgrade(&handle));
        }
        tracing::debug!(module = %self.module, handle = %handle.id(), "handle watched");
        handle
    }

    /// Live watched handles. Dropped handles are pruned.
    pub fn watched(&self) -> Vec<Arc<Handle>> {
        let mut watched = self.watched.lock();
        watched.retain(|w| w.strong_count() > 0);
        watched.iter().filter_map(Weak::upgrade).collect()
    }

    /// Returns `true` while task writes are suppressed.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Holds every watched handle and writes its neutral command.
    ///
    /// Every handle is visited even if one fails; the first failure is
    /// returned. Returns the number of live handles.
    pub fn neutralize(&self) -> Result<usize, HardwareError> {
        self.held.store(true, Ordering::Release);
        let handles = self.watched();
        let mut first_err = None;
        for handle in &handles {
            let policy = self.cfg.neutral_for(handle.kind());
            if let Err(err) = handle.hold(policy) {
                tracing::error!(module = %self.module, handle = %handle.id(), error = %err, "neutralize failed");
                first_err.get_or_insert(err);
            }
        }
        tracing::debug!(module = %self.module, handles = handles.len(), "referee neutralized");
        self.publish(NoticeKind::RefereeNeutralized, handles.len());
        match first_err {
            Some(err) => Err(err),
            None => Ok(handles.len()),
        }
    }

    /// Lets task writes through again, re-enabling handles whose policy
    /// disabled them.
    ///
    /// Every handle is visited even if one fails; a failed handle stays held
    /// and the first failure is returned. Returns the number of live handles.
    pub fn release(&self) -> Result<usize, HardwareError> {
        let handles = self.watched();
        let mut first_err = None;
        for handle in &handles {
            let policy = self.cfg.neutral_for(handle.kind());
            if let Err(err) = handle.release(policy) {
                tracing::error!(module = %self.module, handle = %handle.id(), error = %err, "release failed");
                first_err.get_or_insert(err);
            }
        }
        self.held.store(false, Ordering::Release);
        tracing::debug!(module = %self.module, handles = handles.len(), "referee released");
        self.publish(NoticeKind::RefereeReleased, handles.len());
        match first_err {
            Some(err) => Err(err),
            None => Ok(handles.len()),
        }
    }

    /// Task that follows the gamemode stream: release once enabled,
    /// neutralize once disabled. Named `"<module>.referee"`.
    ///
    /// A neutralize failure ends the task with the hardware error; the
    /// handles stay held.
    pub fn supervise(self: &Arc<Self>, gamemode: &Datastream) -> TaskSpec {
        let disabled = gamemode.set_event(GameMode::disabled_predicate());
        let enabled = gamemode.set_event(GameMode::enabled_predicate());
        let referee = Arc::clone(self);

        TaskSpec::from_fn(
            format!("{}.referee", self.module),
            move |ctx: CancellationToken| {
                let referee = Arc::clone(&referee);
                let disabled = disabled.clone();
                let enabled = enabled.clone();
                async move {
                    let res: Result<(), TaskError> = async {
                        if referee.is_held() {
                            referee.neutralize()?;
                        }
                        loop {
                            let (event, held) = if referee.is_held() {
                                (&enabled, true)
                            } else {
                                (&disabled, false)
                            };
                            tokio::select! {
                                _ = ctx.cancelled() => return Ok::<(), TaskError>(()),
                                r = event.wait() => r?,
                            }
                            if held {
                                referee.release()?;
                            } else {
                                referee.neutralize()?;
                            }
                        }
                    }
                    .await;
                    disabled.drop_event();
                    enabled.drop_event();
                    res
                }
            },
        )
        .with_module(Arc::clone(&self.module))
    }

    fn publish(&self, kind: NoticeKind, handles: usize) {
        if let Some(bus) = &self.bus {
            bus.publish(
                Notice::new(kind)
                    .with_module(Arc::clone(&self.module))
                    .with_handles(handles),
            );
        }
    }
}
