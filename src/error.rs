//! Error types used by the loopvisor runtime, its modules and tasks.
//!
//! - [`RuntimeError`]: errors raised by the runtime itself (startup, shutdown).
//! - [`TaskError`]: errors that terminate a single task.
//! - [`ModuleError`]: errors raised while initializing a module.
//! - [`HardwareError`]: failures surfaced by the hardware provider or the referee gate.
//! - [`DatastreamError`]: typed push/get conversion failures.
//! - [`EventError`]: misuse of a dropped event.
//!
//! Every enum provides `as_label` (stable snake_case string for logs).

use std::time::Duration;
use thiserror::Error;

use crate::hardware::HandleId;

/// # Errors produced by the loopvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some tasks remained stuck.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of tasks that did not stop in time.
        stuck: Vec<String>,
    },

    /// The scheduler was started outside a current-thread tokio runtime.
    #[error("scheduler requires a current-thread runtime")]
    NotSingleThreaded,

    /// `run` was called on a scheduler that already ran.
    #[error("scheduler already started")]
    AlreadyStarted,

    /// A module failed during `init`.
    #[error(transparent)]
    Module(#[from] ModuleError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use loopvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NotSingleThreaded.as_label(), "runtime_not_single_threaded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::NotSingleThreaded => "runtime_not_single_threaded",
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::Module(_) => "runtime_module_failed",
        }
    }
}

/// # Errors that terminate a task.
///
/// A task returning any of these is removed from the scheduler and reported
/// on the notice bus; other tasks are unaffected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task logic failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A hardware read/write failed inside the task body.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// A typed datastream conversion failed.
    #[error(transparent)]
    Datastream(#[from] DatastreamError),

    /// The task waited on an event that was already dropped.
    #[error(transparent)]
    Event(#[from] EventError),

    /// Task observed runtime shutdown and exited.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use loopvisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Hardware(_) => "task_hardware",
            TaskError::Datastream(_) => "task_datastream",
            TaskError::Event(_) => "task_event",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }
}

/// # Errors raised while initializing a module.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ModuleError {
    /// `init` was requested for a module that already ran it.
    #[error("module {module} already initialized")]
    AlreadyInitialized {
        /// Module name.
        module: String,
    },

    /// No module is registered under this name.
    #[error("unknown module {module}")]
    Unknown {
        /// Module name.
        module: String,
    },

    /// Two modules registered under the same name.
    #[error("module {module} registered twice")]
    Duplicate {
        /// Module name.
        module: String,
    },

    /// Opening or watching hardware failed.
    #[error("module {module}: {source}")]
    Hardware {
        /// Module name.
        module: String,
        /// The hardware failure.
        #[source]
        source: HardwareError,
    },

    /// Pushing a default record failed.
    #[error("module {module}: {source}")]
    Datastream {
        /// Module name.
        module: String,
        /// The conversion failure.
        #[source]
        source: DatastreamError,
    },

    /// Any other init failure reported by the module itself.
    #[error("module {module} failed to initialize: {error}")]
    Init {
        /// Module name.
        module: String,
        /// The reported message.
        error: String,
    },
}

impl ModuleError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ModuleError::AlreadyInitialized { .. } => "module_already_initialized",
            ModuleError::Unknown { .. } => "module_unknown",
            ModuleError::Duplicate { .. } => "module_duplicate",
            ModuleError::Hardware { .. } => "module_hardware",
            ModuleError::Datastream { .. } => "module_datastream",
            ModuleError::Init { .. } => "module_init_failed",
        }
    }
}

/// # Hardware failures.
///
/// Raised by a [`HardwareProvider`](crate::HardwareProvider) or by the referee
/// gate on a [`Handle`](crate::Handle).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// The handle was used before being registered with a referee.
    #[error("handle {id} used before being watched by a referee")]
    Unwatched {
        /// The offending handle.
        id: HandleId,
    },

    /// The provider does not know this handle.
    #[error("unknown handle {id}")]
    UnknownHandle {
        /// The offending handle.
        id: HandleId,
    },

    /// The handle was already opened.
    #[error("handle {id} already open")]
    AlreadyOpen {
        /// The offending handle.
        id: HandleId,
    },

    /// The operation makes no sense for this kind of handle (e.g. reading a motor).
    #[error("unsupported operation {op} on {id}")]
    Unsupported {
        /// The offending handle.
        id: HandleId,
        /// Operation name.
        op: &'static str,
    },

    /// The device itself reported a failure.
    #[error("device {id} failed: {error}")]
    Device {
        /// The offending handle.
        id: HandleId,
        /// Provider-specific message.
        error: String,
    },
}

impl HardwareError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HardwareError::Unwatched { .. } => "hardware_unwatched",
            HardwareError::UnknownHandle { .. } => "hardware_unknown_handle",
            HardwareError::AlreadyOpen { .. } => "hardware_already_open",
            HardwareError::Unsupported { .. } => "hardware_unsupported",
            HardwareError::Device { .. } => "hardware_device",
        }
    }
}

/// # Typed datastream conversion failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DatastreamError {
    /// The value does not serialize to a key/value record.
    #[error("datastream {stream}: value is not a record")]
    NotARecord {
        /// Stream name.
        stream: String,
    },

    /// Serialization or deserialization failed.
    #[error("datastream {stream}: {source}")]
    Codec {
        /// Stream name.
        stream: String,
        /// The serde failure.
        #[source]
        source: serde_json::Error,
    },
}

impl DatastreamError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DatastreamError::NotARecord { .. } => "datastream_not_a_record",
            DatastreamError::Codec { .. } => "datastream_codec",
        }
    }
}

/// # Event misuse.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// `wait` was called on (or was pending when) the event got dropped.
    #[error("event on datastream {stream} was dropped")]
    Dropped {
        /// Stream the event was bound to.
        stream: String,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::Dropped { .. } => "event_dropped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{HandleId, HandleKind};

    #[test]
    fn test_labels_are_stable() {
        let id = HandleId::new(HandleKind::Motor, 7);
        assert_eq!(
            HardwareError::Unwatched { id }.as_label(),
            "hardware_unwatched"
        );
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        let err: TaskError = EventError::Dropped {
            stream: "gamemode".into(),
        }
        .into();
        assert_eq!(err.as_label(), "task_event");
    }

    #[test]
    fn test_hardware_error_message_names_handle() {
        let id = HandleId::new(HandleKind::AnalogInput, 2);
        let msg = HardwareError::Unwatched { id }.to_string();
        assert!(msg.contains("analog_input:2"), "{msg}");
    }
}
