//! # Runtime: modules, datastreams, hardware and scheduler in one place.
//!
//! The [`Runtime`] owns everything a robot program needs and wires it
//! together without globals:
//!
//! ```text
//! RuntimeBuilder
//!   ├─ Config
//!   ├─ HardwareProvider ──────────────┐
//!   ├─ Telemetry                      │
//!   ├─ Subscribers ──► Scheduler      │
//!   └─ Modules                        ▼
//!                         ModuleContext { datastreams, hardware, referee, telemetry }
//!
//! Runtime::run():
//!   1. init every module once (in registration order)      → ModuleInitialized
//!   2. schedule "<module>.referee" + the module's own tasks
//!   3. Scheduler::run(...)
//!   4. neutralize every referee, whatever the outcome
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use loopvisor::{Config, Runtime, SimProvider};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Runtime::builder(Config::default(), SimProvider::new()).build();
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    config::Config,
    core::Scheduler,
    datastreams::DatastreamRegistry,
    error::{ModuleError, RuntimeError},
    hardware::HardwareProvider,
    modules::{Module, ModuleContext, ModuleSlot, ModuleState},
    notices::{Notice, NoticeKind},
    referee::Referee,
    subscribers::Subscribe,
    telemetry::{NullTelemetry, Telemetry},
};

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    cfg: Config,
    hardware: Arc<dyn HardwareProvider>,
    telemetry: Arc<dyn Telemetry>,
    datastreams: Arc<DatastreamRegistry>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    modules: Vec<Box<dyn Module>>,
}

impl RuntimeBuilder {
    /// Sets the telemetry sink (default: [`NullTelemetry`]).
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Uses an existing datastream registry instead of a fresh one.
    pub fn with_datastreams(mut self, datastreams: Arc<DatastreamRegistry>) -> Self {
        self.datastreams = datastreams;
        self
    }

    /// Sets notice subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Registers a module. Modules initialize in registration order.
    pub fn with_module(mut self, module: impl Module) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Builds the runtime. Must be called inside a tokio runtime.
    pub fn build(self) -> Runtime {
        let scheduler = Arc::new(
            Scheduler::builder(self.cfg.clone())
                .with_subscribers(self.subscribers)
                .build(),
        );
        Runtime {
            cfg: self.cfg,
            hardware: self.hardware,
            telemetry: self.telemetry,
            datastreams: self.datastreams,
            scheduler,
            modules: Mutex::new(self.modules.into_iter().map(ModuleSlot::new).collect()),
            referees: Mutex::new(Vec::new()),
        }
    }
}

/// Owner of modules, datastreams, hardware and the scheduler.
pub struct Runtime {
    cfg: Config,
    hardware: Arc<dyn HardwareProvider>,
    telemetry: Arc<dyn Telemetry>,
    datastreams: Arc<DatastreamRegistry>,
    scheduler: Arc<Scheduler>,
    modules: Mutex<Vec<ModuleSlot>>,
    referees: Mutex<Vec<Arc<Referee>>>,
}

impl Runtime {
    /// Starts building a runtime over `hardware`.
    pub fn builder(cfg: Config, hardware: Arc<dyn HardwareProvider>) -> RuntimeBuilder {
        RuntimeBuilder {
            cfg,
            hardware,
            telemetry: Arc::new(NullTelemetry),
            datastreams: Arc::new(DatastreamRegistry::new()),
            subscribers: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// The datastream registry shared with every module.
    pub fn datastreams(&self) -> &Arc<DatastreamRegistry> {
        &self.datastreams
    }

    /// The scheduler, for adding tasks or requesting shutdown.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Lifecycle state of a registered module.
    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.modules
            .lock()
            .iter()
            .find(|m| m.name() == name)
            .map(ModuleSlot::state)
    }

    /// Referee of an initialized module.
    pub fn referee(&self, module: &str) -> Option<Arc<Referee>> {
        self.referees
            .lock()
            .iter()
            .find(|r| r.module() == module)
            .cloned()
    }

    /// Initializes every module that has not been initialized yet.
    ///
    /// Returns how many modules ran `init`. The first failure stops the pass;
    /// modules before it stay initialized.
    pub fn initialize(&self) -> Result<usize, ModuleError> {
        let mut modules = self.modules.lock();
        let mut seen = HashSet::new();
        for slot in modules.iter() {
            if !seen.insert(slot.name().to_string()) {
                return Err(ModuleError::Duplicate {
                    module: slot.name().to_string(),
                });
            }
        }

        let mut count = 0;
        for slot in modules
            .iter_mut()
            .filter(|m| m.state() == ModuleState::Uninitialized)
        {
            self.init_slot(slot)?;
            count += 1;
        }
        Ok(count)
    }

    /// Initializes one module by name.
    ///
    /// Fails with [`ModuleError::AlreadyInitialized`] if it already ran.
    pub fn initialize_module(&self, name: &str) -> Result<(), ModuleError> {
        let mut modules = self.modules.lock();
        let slot = modules
            .iter_mut()
            .find(|m| m.name() == name)
            .ok_or_else(|| ModuleError::Unknown {
                module: name.to_string(),
            })?;
        self.init_slot(slot)
    }

    fn init_slot(&self, slot: &mut ModuleSlot) -> Result<(), ModuleError> {
        let name: Arc<str> = Arc::from(slot.name());
        let referee = Arc::new(
            Referee::new(Arc::clone(&name), &self.cfg).with_bus(self.scheduler.bus().clone()),
        );
        let mut ctx = ModuleContext::new(
            Arc::clone(&name),
            &self.cfg,
            &self.datastreams,
            &self.hardware,
            &self.telemetry,
            Arc::clone(&referee),
        );
        if let Err(err) = slot.init(&mut ctx) {
            tracing::error!(module = %name, error = %err, label = err.as_label(), "module init failed");
            return Err(err);
        }

        let gamemode = self.datastreams.get(&self.cfg.gamemode_stream);
        self.scheduler.schedule(referee.supervise(&gamemode));
        for spec in ctx.into_tasks() {
            self.scheduler.schedule(spec);
        }
        self.referees.lock().push(referee);

        tracing::info!(module = %name, "module initialized");
        self.scheduler
            .bus()
            .publish(Notice::new(NoticeKind::ModuleInitialized).with_module(name));
        Ok(())
    }

    /// Initializes the modules, then drives every task until completion or
    /// shutdown. Every referee neutralizes before this returns.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        self.initialize()?;
        let res = self.scheduler.run(Vec::new()).await;
        self.neutralize_all();
        res
    }

    /// Requests graceful shutdown.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Neutralizes every module's handles.
    pub fn neutralize_all(&self) {
        for referee in self.referees.lock().iter() {
            if let Err(err) = referee.neutralize() {
                tracing::error!(module = referee.module(), error = %err, "shutdown neutralize failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskSpec;
    use crate::gamemode::{GAMEMODE_STREAM, GameMode, Mode};
    use crate::hardware::{Command, Handle, HandleId, HandleKind, SimProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Named(&'static str, Vec<Arc<Handle>>);

    impl Named {
        fn new(name: &'static str) -> Self {
            Self(name, Vec::new())
        }
    }

    impl Module for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
            let channel = u32::try_from(self.0.len()).map_err(|_| ctx.fail("name too long"))?;
            self.1.push(ctx.open_watched(HandleKind::Motor, channel)?);
            Ok(())
        }
    }

    struct Broken;

    impl Module for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
            Err(ctx.fail("sensor missing"))
        }
    }

    fn cfg() -> Config {
        Config {
            handle_signals: false,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_module_names_are_rejected() {
        let rt = Runtime::builder(cfg(), SimProvider::new())
            .with_module(Named::new("arm"))
            .with_module(Named::new("arm"))
            .build();
        assert!(matches!(
            rt.initialize(),
            Err(ModuleError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_second_init_is_rejected() {
        let rt = Runtime::builder(cfg(), SimProvider::new())
            .with_module(Named::new("arm"))
            .build();
        assert_eq!(rt.initialize().unwrap(), 1);
        assert_eq!(rt.initialize().unwrap(), 0);
        assert_eq!(rt.module_state("arm"), Some(ModuleState::Initialized));
        assert!(matches!(
            rt.initialize_module("arm"),
            Err(ModuleError::AlreadyInitialized { .. })
        ));
        assert!(matches!(
            rt.initialize_module("leg"),
            Err(ModuleError::Unknown { .. })
        ));
    }

    #[tokio::test]
    async fn test_init_failure_aborts_run() {
        let rt = Runtime::builder(cfg(), SimProvider::new())
            .with_module(Broken)
            .build();
        let err = rt.run().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Module(ModuleError::Init { .. })));
        assert_eq!(rt.module_state("broken"), Some(ModuleState::Uninitialized));
    }

    #[tokio::test]
    async fn test_shutdown_neutralizes_every_module() {
        let sim = SimProvider::new();
        let rt = Arc::new(
            Runtime::builder(cfg(), sim.clone())
                .with_module(Named::new("arm"))
                .build(),
        );
        let gamemode = rt.datastreams().get("gamemode");
        crate::gamemode::GameMode::enabled(crate::gamemode::Mode::Teleop)
            .push_to(&gamemode)
            .unwrap();

        let stopper = Arc::clone(&rt);
        rt.scheduler()
            .schedule(TaskSpec::from_fn("stopper", move |_ctx: CancellationToken| {
                let rt = Arc::clone(&stopper);
                async move {
                    crate::tasks::sleep(std::time::Duration::from_millis(10)).await;
                    let motor = rt.referee("arm").unwrap().watched().remove(0);
                    assert!(!motor.is_held());
                    motor.set(0.7)?;
                    rt.shutdown();
                    Ok::<(), TaskError>(())
                }
            }));
        rt.run().await.unwrap();

        let id = HandleId::new(HandleKind::Motor, 3);
        assert_eq!(sim.last_command(id), Some(Command::Output(0.0)));
        assert!(rt.referee("arm").unwrap().is_held());
    }

    /// Waits for teleop, then counts how often it got to run.
    struct Teleop {
        woke: Arc<AtomicUsize>,
    }

    impl Module for Teleop {
        fn name(&self) -> &str {
            "teleop"
        }

        fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
            ctx.push_default("teleop.control", &serde_json::json!({ "power": 0.0 }))?;
            let teleop = ctx.gamemode().set_event(GameMode::mode_predicate(Mode::Teleop));
            let woke = Arc::clone(&self.woke);
            ctx.add_task(TaskSpec::from_fn("teleop.loop", move |ctx: CancellationToken| {
                let (teleop, woke) = (teleop.clone(), Arc::clone(&woke));
                async move {
                    tokio::select! {
                        _ = ctx.cancelled() => {}
                        r = teleop.wait() => {
                            r?;
                            woke.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    Ok::<(), TaskError>(())
                }
            }));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_teleop_task_wakes_only_after_gamemode_switch() {
        let woke = Arc::new(AtomicUsize::new(0));
        let rt = Arc::new(
            Runtime::builder(cfg(), SimProvider::new())
                .with_module(Teleop {
                    woke: Arc::clone(&woke),
                })
                .build(),
        );

        let driver = {
            let (rt, woke) = (Arc::clone(&rt), Arc::clone(&woke));
            TaskSpec::from_fn("driver", move |_ctx: CancellationToken| {
                let (rt, woke) = (Arc::clone(&rt), Arc::clone(&woke));
                async move {
                    let gamemode = rt.datastreams().get(GAMEMODE_STREAM);
                    let control = rt.datastreams().get("teleop.control");
                    assert_eq!(control.version(), 1);

                    GameMode::disabled().push_to(&gamemode)?;
                    crate::tasks::sleep(Duration::from_millis(10)).await;
                    assert_eq!(woke.load(Ordering::SeqCst), 0);

                    GameMode::enabled(Mode::Teleop).push_to(&gamemode)?;
                    crate::tasks::sleep(Duration::from_millis(10)).await;
                    assert_eq!(woke.load(Ordering::SeqCst), 1);
                    rt.shutdown();
                    Ok::<(), TaskError>(())
                }
            })
        };
        rt.scheduler().schedule(driver);
        rt.run().await.unwrap();
        assert_eq!(woke.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_task_leaves_others_running() {
        let rt = Arc::new(Runtime::builder(cfg(), SimProvider::new()).build());
        let mut rx = rt.scheduler().bus().subscribe();
        let ticks = Arc::new(AtomicUsize::new(0));

        let bad = TaskSpec::from_fn("bad", |_ctx: CancellationToken| async move {
            crate::tasks::yield_now().await;
            Err::<(), _>(TaskError::fail("sensor unplugged"))
        });
        let good = {
            let ticks = Arc::clone(&ticks);
            TaskSpec::from_fn("good", move |_ctx: CancellationToken| {
                let ticks = Arc::clone(&ticks);
                async move {
                    for _ in 0..5 {
                        crate::tasks::sleep(Duration::from_millis(2)).await;
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok::<(), TaskError>(())
                }
            })
        };
        rt.scheduler().schedule(bad);
        rt.scheduler().schedule(good);
        rt.run().await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        let mut failed = Vec::new();
        while let Ok(n) = rx.try_recv() {
            if n.kind == NoticeKind::TaskFailed {
                failed.push(n.task.as_deref().map(str::to_string));
            }
        }
        assert_eq!(failed, vec![Some("bad".to_string())]);
    }

    /// A wrist whose motor develops a fault mid-run, next to a healthy loop.
    struct Wrist {
        sim: Arc<SimProvider>,
        ticks: Arc<AtomicUsize>,
        handles: Vec<Arc<Handle>>,
    }

    impl Module for Wrist {
        fn name(&self) -> &str {
            "wrist"
        }

        fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
            let motor = ctx.open_watched(HandleKind::Motor, 9)?;
            let (drive_motor, sim) = (Arc::clone(&motor), Arc::clone(&self.sim));
            ctx.add_task(TaskSpec::from_fn("wrist.drive", move |_ctx: CancellationToken| {
                let (motor, sim) = (Arc::clone(&drive_motor), Arc::clone(&sim));
                async move {
                    crate::tasks::sleep(Duration::from_millis(5)).await;
                    motor.set(0.2)?;
                    sim.set_faulty(motor.id(), true);
                    motor.set(0.4)?;
                    Ok::<(), TaskError>(())
                }
            }));

            let ticks = Arc::clone(&self.ticks);
            ctx.add_task(TaskSpec::from_fn("wrist.ticker", move |_ctx: CancellationToken| {
                let ticks = Arc::clone(&ticks);
                async move {
                    for _ in 0..5 {
                        crate::tasks::sleep(Duration::from_millis(4)).await;
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok::<(), TaskError>(())
                }
            }));
            self.handles.push(motor);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hardware_fault_fails_only_the_writing_task() {
        let sim = SimProvider::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let rt = Arc::new(
            Runtime::builder(cfg(), sim.clone())
                .with_module(Wrist {
                    sim: sim.clone(),
                    ticks: Arc::clone(&ticks),
                    handles: Vec::new(),
                })
                .build(),
        );
        let mut rx = rt.scheduler().bus().subscribe();
        GameMode::enabled(Mode::Teleop)
            .push_to(&rt.datastreams().get(GAMEMODE_STREAM))
            .unwrap();

        let stopper = Arc::clone(&rt);
        rt.scheduler()
            .schedule(TaskSpec::from_fn("stopper", move |_ctx: CancellationToken| {
                let rt = Arc::clone(&stopper);
                async move {
                    crate::tasks::sleep(Duration::from_millis(40)).await;
                    rt.shutdown();
                    Ok::<(), TaskError>(())
                }
            }));
        rt.run().await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        let id = HandleId::new(HandleKind::Motor, 9);
        assert_eq!(sim.last_command(id), Some(Command::Output(0.2)));

        let mut failed = Vec::new();
        while let Ok(n) = rx.try_recv() {
            if n.kind == NoticeKind::TaskFailed {
                failed.push((n.task.clone(), n.reason.clone()));
            }
        }
        assert_eq!(failed.len(), 1);
        let (task, reason) = &failed[0];
        assert_eq!(task.as_deref(), Some("wrist.drive"));
        let reason = reason.as_deref().unwrap_or_default();
        assert!(reason.contains("motor:9"), "{reason}");
        assert!(reason.contains("simulated fault"), "{reason}");
    }

    #[tokio::test]
    async fn test_referees_are_isolated_between_modules() {
        let sim = SimProvider::new();
        let rt = Runtime::builder(cfg(), sim.clone())
            .with_module(Named::new("arm"))
            .with_module(Named::new("claw"))
            .build();
        assert_eq!(rt.initialize().unwrap(), 2);

        let arm = rt.referee("arm").unwrap();
        let claw = rt.referee("claw").unwrap();
        arm.release().unwrap();
        claw.release().unwrap();
        let claw_motor = claw.watched().remove(0);
        claw_motor.set(0.5).unwrap();

        arm.neutralize().unwrap();
        assert!(arm.is_held());
        assert!(!claw.is_held());
        assert!(!claw_motor.is_held());
        assert_eq!(
            sim.last_command(HandleId::new(HandleKind::Motor, 4)),
            Some(Command::Output(0.5))
        );
    }
}
