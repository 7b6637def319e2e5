//! # loopvisor
//!
//! **Loopvisor** is a cooperative runtime for periodic control loops, in the
//! style of a robot program: modules publish intents into named
//! **datastreams**, tasks wake on **events** computed from those streams, and
//! a per-module **referee** keeps actuators neutral whenever the robot is
//! disabled.
//!
//! Everything runs on a single thread. A task body runs uninterrupted until
//! it reaches a suspension point ([`sleep`], [`yield_now`], [`Event::wait`]).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐   ┌──────────────┐
//!  │  Module A    │   │  Module B    │   init(ctx) once:
//!  │  (arm)       │   │  (claw)      │   open + watch handles,
//!  └──────┬───────┘   └──────┬───────┘   push defaults, add tasks
//!         ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime                                                          │
//! │  - DatastreamRegistry (name → Datastream, created on first use)   │
//! │  - HardwareProvider   (open / read / write by HandleId)           │
//! │  - Referee per module (holds Weak<Handle>, follows "gamemode")    │
//! │  - Scheduler          (single-threaded, FIFO, graceful shutdown)  │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//!  │ arm.referee  │   │ arm.teleop   │   │ claw.run     │      │
//!  └┬─────────────┘   └┬─────────────┘   └┬─────────────┘      │
//!   │ Event::wait      │ sleep(20ms)      │ Event::wait        │
//!   ▼                  ▼                  ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    Bus (broadcast notices)                        │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                        AliveTracker + SubscriberSet
//!                                   │
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  metrics  custom
//! ```
//!
//! ### Datastreams and events
//! ```text
//! push(record) ──► version += 1, value = record
//!              └─► for each event: ready = predicate(value)
//!                                  ready → wake every waiter
//! ```
//!
//! ## Features
//! | Area             | Description                                                  | Key types                                   |
//! |------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Datastreams**  | Named, versioned key/value records shared by tasks.          | [`DatastreamRegistry`], [`Datastream`]      |
//! | **Events**       | Level-triggered predicates over a stream.                    | [`Event`], [`Predicate`]                    |
//! | **Scheduling**   | Cooperative single-threaded task driver.                     | [`Scheduler`], [`TaskSpec`], [`TaskFn`]     |
//! | **Modules**      | One-shot initialization of robot subsystems.                 | [`Module`], [`ModuleContext`], [`Runtime`]  |
//! | **Safety**       | Per-module referee and gated device handles.                 | [`Referee`], [`Handle`], [`NeutralPolicy`]  |
//! | **Observability**| Lifecycle notices, subscribers, telemetry.                   | [`Subscribe`], [`Notice`], [`Telemetry`]    |
//! | **Errors**       | Typed errors with stable labels.                             | [`TaskError`], [`RuntimeError`]             |
//! | **Configuration**| Centralized runtime settings.                                | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use loopvisor::{Config, DatastreamRegistry, Predicate, Scheduler, TaskError, TaskSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let streams = DatastreamRegistry::new();
//!     let ticks = streams.get("ticks");
//!     let tick = ticks.set_event(Predicate::is_true("tick"));
//!
//!     let producer = {
//!         let ticks = ticks.clone();
//!         TaskSpec::from_fn("producer", move |_ctx: CancellationToken| {
//!             let ticks = ticks.clone();
//!             async move {
//!                 loopvisor::sleep(Duration::from_millis(10)).await;
//!                 ticks.push_value(serde_json::json!({ "tick": true }))?;
//!                 Ok::<(), TaskError>(())
//!             }
//!         })
//!     };
//!     let consumer = TaskSpec::from_fn("consumer", move |_ctx: CancellationToken| {
//!         let tick = tick.clone();
//!         async move {
//!             tick.wait().await?;
//!             Ok::<(), TaskError>(())
//!         }
//!     });
//!
//!     let scheduler = Scheduler::builder(Config::default()).build();
//!     scheduler.run(vec![producer, consumer]).await?;
//!     assert_eq!(ticks.version(), 1);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod datastreams;
mod error;
mod gamemode;
mod hardware;
mod modules;
mod notices;
mod referee;
mod runtime;
mod subscribers;
mod tasks;
mod telemetry;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Scheduler, SchedulerBuilder};
pub use datastreams::{Datastream, DatastreamRegistry, Event, Predicate, Record, Snapshot};
pub use error::{
    DatastreamError, EventError, HardwareError, ModuleError, RuntimeError, TaskError,
};
pub use gamemode::{GAMEMODE_STREAM, GameMode, Mode};
pub use hardware::{
    Command, Handle, HandleId, HandleKind, HardwareProvider, NeutralPolicy, SimChannel,
    SimProvider, WriteOutcome,
};
pub use modules::{Module, ModuleContext, ModuleState};
pub use notices::{Bus, Notice, NoticeKind};
pub use referee::Referee;
pub use runtime::{Runtime, RuntimeBuilder};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef, TaskSpec, sleep, yield_now};
pub use telemetry::{LogTelemetry, NullTelemetry, Telemetry};

// Optional: expose the built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
