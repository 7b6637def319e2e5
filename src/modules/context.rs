//! # Module initialization context.
//!
//! A [`ModuleContext`] is handed to [`Module::init`](crate::Module::init). It
//! gives the module its datastreams, its hardware, its referee and a place to
//! put the tasks it wants scheduled. Everything is injected by the runtime;
//! nothing is reached through globals.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::Config,
    datastreams::{Datastream, DatastreamRegistry},
    error::ModuleError,
    hardware::{Handle, HandleId, HandleKind, HardwareProvider},
    referee::Referee,
    tasks::TaskSpec,
    telemetry::Telemetry,
};

/// What a module sees while it initializes.
pub struct ModuleContext<'a> {
    name: Arc<str>,
    cfg: &'a Config,
    datastreams: &'a DatastreamRegistry,
    hardware: &'a Arc<dyn HardwareProvider>,
    telemetry: &'a Arc<dyn Telemetry>,
    referee: Arc<Referee>,
    tasks: Vec<TaskSpec>,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(
        name: Arc<str>,
        cfg: &'a Config,
        datastreams: &'a DatastreamRegistry,
        hardware: &'a Arc<dyn HardwareProvider>,
        telemetry: &'a Arc<dyn Telemetry>,
        referee: Arc<Referee>,
    ) -> Self {
        Self {
            name,
            cfg,
            datastreams,
            hardware,
            telemetry,
            referee,
            tasks: Vec::new(),
        }
    }

    /// Name of the module being initialized.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        self.cfg
    }

    /// Looks up (or creates) the datastream called `name`.
    pub fn datastream(&self, name: &str) -> Datastream {
        self.datastreams.get(name)
    }

    /// The well-known gamemode datastream.
    pub fn gamemode(&self) -> Datastream {
        self.datastreams.get(&self.cfg.gamemode_stream)
    }

    /// Pushes a default value into `stream` so readers never see it unset.
    ///
    /// Returns the new version.
    pub fn push_default<T: Serialize>(&self, stream: &str, value: &T) -> Result<u64, ModuleError> {
        self.datastream(stream)
            .push_as(value)
            .map_err(|source| ModuleError::Datastream {
                module: self.name.to_string(),
                source,
            })
    }

    /// Opens a device handle. It must be watched before use.
    pub fn open(&self, kind: HandleKind, channel: u32) -> Result<Arc<Handle>, ModuleError> {
        Handle::open(Arc::clone(self.hardware), HandleId::new(kind, channel)).map_err(|source| {
            ModuleError::Hardware {
                module: self.name.to_string(),
                source,
            }
        })
    }

    /// Opens a device handle and registers it with this module's referee.
    pub fn open_watched(
        &self,
        kind: HandleKind,
        channel: u32,
    ) -> Result<Arc<Handle>, ModuleError> {
        Ok(self.referee.watch(self.open(kind, channel)?))
    }

    /// This module's referee.
    pub fn referee(&self) -> &Arc<Referee> {
        &self.referee
    }

    /// Queues a task; it is scheduled once every module finished `init`.
    pub fn add_task(&mut self, spec: TaskSpec) {
        self.tasks.push(spec.with_module(Arc::clone(&self.name)));
    }

    /// Publishes `handle` to the telemetry sink under `label`.
    pub fn publish_telemetry(&self, label: &str, handle: &Handle) {
        self.telemetry.publish(&self.name, label, handle);
    }

    /// Telemetry sink, for tasks that publish periodically.
    pub fn telemetry(&self) -> Arc<dyn Telemetry> {
        Arc::clone(self.telemetry)
    }

    /// Shorthand for [`ModuleError::Init`] attributed to this module.
    pub fn fail(&self, error: impl Into<String>) -> ModuleError {
        ModuleError::Init {
            module: self.name.to_string(),
            error: error.into(),
        }
    }

    pub(crate) fn into_tasks(self) -> Vec<TaskSpec> {
        self.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HardwareError, TaskError};
    use crate::hardware::SimProvider;
    use crate::modules::{Module, ModuleSlot, ModuleState};
    use crate::telemetry::NullTelemetry;
    use tokio_util::sync::CancellationToken;

    struct Claw {
        inits: usize,
    }

    impl Module for Claw {
        fn name(&self) -> &str {
            "claw"
        }

        fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
            self.inits += 1;
            let motor = ctx.open_watched(HandleKind::Motor, 7)?;
            ctx.push_default("claw.control", &serde_json::json!({ "power": 0.0 }))?;
            ctx.publish_telemetry("Claw motor", &motor);
            ctx.add_task(TaskSpec::from_fn("claw.run_loop", |_ctx: CancellationToken| async move {
                Ok::<(), TaskError>(())
            }));
            Ok(())
        }
    }

    struct Fixture {
        cfg: Config,
        streams: DatastreamRegistry,
        hardware: Arc<dyn HardwareProvider>,
        telemetry: Arc<dyn Telemetry>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cfg: Config::default(),
                streams: DatastreamRegistry::new(),
                hardware: SimProvider::new(),
                telemetry: Arc::new(NullTelemetry),
            }
        }

        fn ctx(&self, name: &str) -> ModuleContext<'_> {
            let referee = Arc::new(Referee::new(name, &self.cfg));
            ModuleContext::new(
                name.into(),
                &self.cfg,
                &self.streams,
                &self.hardware,
                &self.telemetry,
                referee,
            )
        }
    }

    #[test]
    fn test_init_runs_once() {
        let fx = Fixture::new();
        let mut slot = ModuleSlot::new(Box::new(Claw { inits: 0 }));

        let mut ctx = fx.ctx("claw");
        slot.init(&mut ctx).unwrap();
        assert_eq!(slot.state(), ModuleState::Initialized);
        let tasks = ctx.into_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].module(), Some("claw"));

        let mut again = fx.ctx("claw");
        let err = slot.init(&mut again).unwrap_err();
        assert!(matches!(err, ModuleError::AlreadyInitialized { .. }));
    }

    #[test]
    fn test_defaults_are_visible_before_any_task_runs() {
        let fx = Fixture::new();
        let mut slot = ModuleSlot::new(Box::new(Claw { inits: 0 }));
        slot.init(&mut fx.ctx("claw")).unwrap();

        let control = fx.streams.get("claw.control");
        assert_eq!(control.version(), 1);
        assert_eq!(control.get().unwrap()["power"], serde_json::json!(0.0));
    }

    #[test]
    fn test_opened_handles_are_watched_and_held() {
        let fx = Fixture::new();
        let ctx = fx.ctx("claw");
        let motor = ctx.open_watched(HandleKind::Motor, 1).unwrap();
        assert!(motor.is_watched());
        assert!(motor.is_held());
        assert_eq!(ctx.referee().watched().len(), 1);

        let err = ctx.open(HandleKind::Motor, 1).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::Hardware {
                source: HardwareError::AlreadyOpen { .. },
                ..
            }
        ));
    }
}
