//! # Hardware provider interface and logical identifiers.
//!
//! Handles are constructed by logical identifier (kind + channel/port number).
//! There is no wire format: providers are in-process objects.

use std::fmt;

use crate::error::HardwareError;

/// Kind of device behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Speed controller driving a motor (`Command::Output`).
    Motor,
    /// Closed-loop controller (`Command::Setpoint`, `Enable`, `Disable`).
    Controller,
    /// Digital input such as a limit switch.
    DigitalInput,
    /// Analog input such as a potentiometer.
    AnalogInput,
}

impl HandleKind {
    /// Returns `true` for kinds that accept commands.
    pub fn is_actuator(self) -> bool {
        matches!(self, HandleKind::Motor | HandleKind::Controller)
    }

    /// Neutral policy used when the config has no override for this kind.
    pub fn default_neutral(self) -> NeutralPolicy {
        match self {
            HandleKind::Motor => NeutralPolicy::Zero,
            HandleKind::Controller => NeutralPolicy::Disable,
            HandleKind::DigitalInput | HandleKind::AnalogInput => NeutralPolicy::Untouched,
        }
    }

    /// Returns a short stable label (snake_case).
    pub fn as_label(self) -> &'static str {
        match self {
            HandleKind::Motor => "motor",
            HandleKind::Controller => "controller",
            HandleKind::DigitalInput => "digital_input",
            HandleKind::AnalogInput => "analog_input",
        }
    }
}

/// Logical identifier of a device: kind plus channel/port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    /// Device kind.
    pub kind: HandleKind,
    /// Channel or port number.
    pub channel: u32,
}

impl HandleId {
    /// Creates a new identifier.
    pub const fn new(kind: HandleKind, channel: u32) -> Self {
        Self { kind, channel }
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_label(), self.channel)
    }
}

/// Command written to an actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Open-loop output in `[-1.0, 1.0]`.
    Output(f64),
    /// Closed-loop target.
    Setpoint(f64),
    /// Enable a closed-loop controller.
    Enable,
    /// Disable a closed-loop controller.
    Disable,
}

/// What the referee writes to a handle when neutralizing it.
///
/// Whatever the policy, task writes are suppressed while the handle is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralPolicy {
    /// Write `Command::Output(0.0)`.
    Zero,
    /// Write `Command::Disable`.
    Disable,
    /// Re-write the last command applied while the window was open, if any.
    HoldLast,
    /// Write nothing (sensors).
    Untouched,
}

/// Narrow I/O interface implemented by the platform layer.
///
/// Calls are synchronous and must not suspend: they run inside a task turn.
pub trait HardwareProvider: Send + Sync + 'static {
    /// Claims the device behind `id`.
    fn open(&self, id: HandleId) -> Result<(), HardwareError>;

    /// Reads the current measurement of a sensor or controller.
    fn read(&self, id: HandleId) -> Result<f64, HardwareError>;

    /// Writes a command to an actuator.
    fn write(&self, id: HandleId, command: Command) -> Result<(), HardwareError>;
}
