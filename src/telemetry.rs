//! # Telemetry sink.
//!
//! Modules publish their device handles under a label so an outside observer
//! (dashboard, log) can follow them. Publishing is fire-and-forget: a sink
//! never fails the caller and must not suspend.
//!
//! - [`LogTelemetry`] renders each publish as a `tracing` event.
//! - [`NullTelemetry`] discards everything (the runtime default).

use crate::hardware::{Handle, HandleKind};

/// Fire-and-forget telemetry sink.
pub trait Telemetry: Send + Sync + 'static {
    /// Publishes `handle` for `module` under `label`.
    fn publish(&self, module: &str, label: &str, handle: &Handle);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn publish(&self, _module: &str, _label: &str, _handle: &Handle) {}
}

/// Sink that logs every publish at `debug` under the `loopvisor::telemetry` target.
///
/// Sensors and controllers log their current value; motors only log their
/// gate state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn publish(&self, module: &str, label: &str, handle: &Handle) {
        let value = match handle.kind() {
            HandleKind::Motor => None,
            _ => handle.read().ok(),
        };
        tracing::debug!(
            target: "loopvisor::telemetry",
            module,
            label,
            handle = %handle.id(),
            held = handle.is_held(),
            value = ?value,
            "telemetry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{HandleId, SimProvider};
    use std::sync::Arc;

    #[test]
    fn test_sinks_never_fail_on_unwatched_handles() {
        let sim = SimProvider::new();
        let id = HandleId::new(HandleKind::AnalogInput, 3);
        sim.set_measurement(id, 1.5);
        let handle = Handle::open(sim.clone(), id).unwrap();

        let sinks: Vec<Arc<dyn Telemetry>> = vec![Arc::new(LogTelemetry), Arc::new(NullTelemetry)];
        for sink in sinks {
            sink.publish("arm", "Wrist", &handle);
        }
        assert!(!handle.is_watched());
    }
}
