//! # Gated device handle.
//!
//! A [`Handle`] is owned by the module that opened it (`Arc<Handle>`); its
//! referee keeps only a `Weak` reference. Every read and write goes through a
//! small gate:
//!
//! - **watched**: set once by `Referee::watch`; unwatched handles refuse I/O.
//! - **held**: set by the referee while the operating window is closed; task
//!   writes are suppressed and the neutral command stays on the wire.
//!
//! Handles start **held**: nothing a task writes reaches an actuator until the
//! referee releases it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HardwareError;
use crate::hardware::provider::{Command, HandleId, HandleKind, HardwareProvider, NeutralPolicy};

/// Result of a task-issued write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The command reached the provider.
    Applied,
    /// The referee holds the handle; the command was dropped.
    Suppressed,
}

#[derive(Debug)]
struct Gate {
    watched: bool,
    held: bool,
    /// Last command applied while released.
    last: Option<Command>,
}

/// Device handle routed through the referee gate.
pub struct Handle {
    id: HandleId,
    provider: Arc<dyn HardwareProvider>,
    gate: Mutex<Gate>,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gate = self.gate.lock();
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("watched", &gate.watched)
            .field("held", &gate.held)
            .finish()
    }
}

impl Handle {
    /// Claims the device through `provider` and returns an unwatched, held handle.
    pub fn open(
        provider: Arc<dyn HardwareProvider>,
        id: HandleId,
    ) -> Result<Arc<Self>, HardwareError> {
        provider.open(id)?;
        Ok(Arc::new(Self {
            id,
            provider,
            gate: Mutex::new(Gate {
                watched: false,
                held: true,
                last: None,
            }),
        }))
    }

    /// Logical identifier.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Device kind.
    pub fn kind(&self) -> HandleKind {
        self.id.kind
    }

    /// Returns `true` once a referee watches this handle.
    pub fn is_watched(&self) -> bool {
        self.gate.lock().watched
    }

    /// Returns `true` while the referee holds the handle neutral.
    pub fn is_held(&self) -> bool {
        self.gate.lock().held
    }

    /// Reads the current measurement. Allowed while held.
    pub fn read(&self) -> Result<f64, HardwareError> {
        if !self.gate.lock().watched {
            return Err(HardwareError::Unwatched { id: self.id });
        }
        self.provider.read(self.id)
    }

    /// Reads a digital input as a boolean (`> 0.5`).
    pub fn read_bool(&self) -> Result<bool, HardwareError> {
        self.read().map(|v| v > 0.5)
    }

    /// Writes a command unless the referee holds the handle.
    pub fn write(&self, command: Command) -> Result<WriteOutcome, HardwareError> {
        let mut gate = self.gate.lock();
        if !gate.watched {
            return Err(HardwareError::Unwatched { id: self.id });
        }
        if gate.held {
            tracing::trace!(handle = %self.id, ?command, "write suppressed by referee");
            return Ok(WriteOutcome::Suppressed);
        }
        self.provider.write(self.id, command)?;
        gate.last = Some(command);
        Ok(WriteOutcome::Applied)
    }

    /// Shorthand for `write(Command::Output(value))`.
    pub fn set(&self, value: f64) -> Result<WriteOutcome, HardwareError> {
        self.write(Command::Output(value))
    }

    /// Shorthand for `write(Command::Setpoint(value))`.
    pub fn set_setpoint(&self, value: f64) -> Result<WriteOutcome, HardwareError> {
        self.write(Command::Setpoint(value))
    }

    pub(crate) fn mark_watched(&self) {
        self.gate.lock().watched = true;
    }

    /// Holds the handle and applies `policy`. Idempotent.
    pub(crate) fn hold(&self, policy: NeutralPolicy) -> Result<(), HardwareError> {
        let mut gate = self.gate.lock();
        gate.held = true;
        let neutral = match policy {
            NeutralPolicy::Zero => Some(Command::Output(0.0)),
            NeutralPolicy::Disable => Some(Command::Disable),
            NeutralPolicy::HoldLast => gate.last,
            NeutralPolicy::Untouched => None,
        };
        if let Some(cmd) = neutral {
            self.provider.write(self.id, cmd)?;
        }
        Ok(())
    }

    /// Lifts the hold and undoes what `policy` did on the way in: a
    /// disabled controller is enabled again. No-op if not held.
    ///
    /// The handle stays held if the undo write fails.
    pub(crate) fn release(&self, policy: NeutralPolicy) -> Result<(), HardwareError> {
        let mut gate = self.gate.lock();
        if !gate.held {
            return Ok(());
        }
        if policy == NeutralPolicy::Disable {
            self.provider.write(self.id, Command::Enable)?;
        }
        gate.held = false;
        Ok(())
    }
}
