//! # Example: claw
//!
//! A claw module on simulated hardware: a claw motor with a limit switch, an
//! elevator and a wrist, each driven through a closed-loop controller.
//!
//! Demonstrates how to:
//! - open handles and register every one of them with the module's referee;
//! - push control defaults so readers never see an unset stream;
//! - gate a teleop loop on `mode == "teleop"` and a run loop on `enabled`;
//! - drive the gamemode from a separate task and watch the referee
//!   neutralize and release the handles ([`LogWriter`] prints the transitions).
//!
//! ## Flow
//! ```text
//! driver:   disabled ──1s──► teleop ──2s──► disabled ──0.5s──► shutdown
//!
//! claw.teleop_loop: wait(teleop) → read joystick → push claw_control → sleep(30ms)
//! claw.run_loop:    wait(enabled) → read claw_control → write motor + setpoints
//!                                  → push claw_state → sleep(200ms)
//! claw.referee:     wait(enabled) → release; wait(disabled) → neutralize
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example claw --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use loopvisor::{
    Datastream, Event, GameMode, Handle, HandleKind, LogTelemetry, LogWriter, Mode, Module,
    ModuleContext, ModuleError, Runtime, SimProvider, TaskError, TaskSpec,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct ClawData {
    claw_open: bool,
    elevator_pos: f64,
    wrist_pos: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Joystick {
    claw_open: bool,
    claw_close: bool,
    elevator_up: bool,
    elevator_down: bool,
    wrist_up: bool,
    wrist_down: bool,
}

#[derive(Default)]
struct Claw {
    handles: Vec<Arc<Handle>>,
}

struct Devices {
    claw_motor: Arc<Handle>,
    elevator_pid: Arc<Handle>,
    wrist_pid: Arc<Handle>,
}

impl Module for Claw {
    fn name(&self) -> &str {
        "claw"
    }

    fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        let claw_motor = ctx.open_watched(HandleKind::Motor, 7)?;
        let claw_contact = ctx.open_watched(HandleKind::DigitalInput, 5)?;
        let elevator_motor = ctx.open_watched(HandleKind::Motor, 5)?;
        let elevator_pot = ctx.open_watched(HandleKind::AnalogInput, 2)?;
        let wrist_motor = ctx.open_watched(HandleKind::Motor, 6)?;
        let wrist_pot = ctx.open_watched(HandleKind::AnalogInput, 3)?;
        let elevator_pid = ctx.open_watched(HandleKind::Controller, 0)?;
        let wrist_pid = ctx.open_watched(HandleKind::Controller, 1)?;

        for (label, handle) in [
            ("Claw Motor", &claw_motor),
            ("Claw Limit Switch", &claw_contact),
            ("Elevator Motor", &elevator_motor),
            ("Elevator Pot", &elevator_pot),
            ("Elevator PID", &elevator_pid),
            ("Wrist Motor", &wrist_motor),
            ("Wrist Pot", &wrist_pot),
            ("Wrist PID", &wrist_pid),
        ] {
            ctx.publish_telemetry(label, handle);
        }

        ctx.push_default("claw_control", &ClawData::default())?;
        ctx.push_default("claw_state", &ClawData::default())?;

        let control = ctx.datastream("claw_control");
        let state = ctx.datastream("claw_state");
        let joystick = ctx.datastream("joystick");
        let gamemode = ctx.gamemode();

        let teleop = gamemode.set_event(GameMode::mode_predicate(Mode::Teleop));
        ctx.add_task(teleop_loop(teleop, joystick, control.clone(), state.clone()));

        let enabled = gamemode.set_event(GameMode::enabled_predicate());
        let devices = Arc::new(Devices {
            claw_motor: Arc::clone(&claw_motor),
            elevator_pid: Arc::clone(&elevator_pid),
            wrist_pid: Arc::clone(&wrist_pid),
        });
        ctx.add_task(run_loop(enabled, control, state, devices));

        self.handles = vec![
            claw_motor,
            claw_contact,
            elevator_motor,
            elevator_pot,
            wrist_motor,
            wrist_pot,
            elevator_pid,
            wrist_pid,
        ];
        Ok(())
    }
}

/// Turns joystick buttons into claw targets while in teleop.
fn teleop_loop(
    teleop: Event,
    joystick: Datastream,
    control: Datastream,
    state: Datastream,
) -> TaskSpec {
    TaskSpec::from_fn("claw.teleop_loop", move |ctx: CancellationToken| {
        let (teleop, joystick, control, state) =
            (teleop.clone(), joystick.clone(), control.clone(), state.clone());
        async move {
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    r = teleop.wait() => r?,
                }
                let mut target: ClawData = state.get_as()?.unwrap_or_default();
                let buttons: Joystick = joystick.get_as()?.unwrap_or_default();

                if buttons.claw_close {
                    target.claw_open = false;
                } else if buttons.claw_open {
                    target.claw_open = true;
                }
                if buttons.elevator_up {
                    target.elevator_pos = 1.0;
                } else if buttons.elevator_down {
                    target.elevator_pos = 0.0;
                }
                if buttons.wrist_up {
                    target.wrist_pos = -45.0;
                } else if buttons.wrist_down {
                    target.wrist_pos = 0.0;
                }

                control.push_as(&target)?;
                loopvisor::sleep(Duration::from_millis(30)).await;
            }
            teleop.drop_event();
            Ok::<(), TaskError>(())
        }
    })
}

/// Applies the latest control targets to the hardware while enabled.
fn run_loop(
    enabled: Event,
    control: Datastream,
    state: Datastream,
    devices: Arc<Devices>,
) -> TaskSpec {
    TaskSpec::from_fn("claw.run_loop", move |ctx: CancellationToken| {
        let (enabled, control, state, devices) = (
            enabled.clone(),
            control.clone(),
            state.clone(),
            Arc::clone(&devices),
        );
        async move {
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    r = enabled.wait() => r?,
                }
                let target: ClawData = control.get_as()?.unwrap_or_default();

                devices
                    .claw_motor
                    .set(if target.claw_open { -1.0 } else { 1.0 })?;
                devices.elevator_pid.set_setpoint(target.elevator_pos)?;
                devices.wrist_pid.set_setpoint(target.wrist_pos)?;
                state.push_as(&target)?;

                loopvisor::sleep(Duration::from_millis(200)).await;
            }
            enabled.drop_event();
            Ok::<(), TaskError>(())
        }
    })
}

/// Plays a short match: disabled, teleop with a few button presses, disabled.
fn driver(runtime: Arc<Runtime>, gamemode: Datastream, joystick: Datastream) -> TaskSpec {
    TaskSpec::from_fn("driver", move |_ctx: CancellationToken| {
        let (runtime, gamemode, joystick) =
            (Arc::clone(&runtime), gamemode.clone(), joystick.clone());
        async move {
            GameMode::disabled().push_to(&gamemode)?;
            loopvisor::sleep(Duration::from_secs(1)).await;

            GameMode::enabled(Mode::Teleop).push_to(&gamemode)?;
            joystick.push_as(&Joystick {
                claw_open: true,
                elevator_up: true,
                ..Joystick::default()
            })?;
            loopvisor::sleep(Duration::from_secs(1)).await;
            joystick.push_as(&Joystick {
                claw_close: true,
                wrist_up: true,
                ..Joystick::default()
            })?;
            loopvisor::sleep(Duration::from_secs(1)).await;

            GameMode::disabled().push_to(&gamemode)?;
            loopvisor::sleep(Duration::from_millis(500)).await;

            let state = runtime.datastreams().get("claw_state");
            println!("final claw state: {:?}", state.get_as::<ClawData>()?);
            runtime.shutdown();
            Ok::<(), TaskError>(())
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let runtime = Arc::new(
        Runtime::builder(loopvisor::Config::default(), SimProvider::new())
            .with_telemetry(Arc::new(LogTelemetry))
            .with_subscribers(vec![Arc::new(LogWriter::new())])
            .with_module(Claw::default())
            .build(),
    );

    let gamemode = runtime.datastreams().get(loopvisor::GAMEMODE_STREAM);
    let joystick = runtime.datastreams().get("joystick");
    runtime
        .scheduler()
        .schedule(driver(Arc::clone(&runtime), gamemode, joystick));

    runtime.run().await?;
    Ok(())
}
