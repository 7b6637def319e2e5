//! # In-memory hardware provider.
//!
//! [`SimProvider`] records every command and serves measurements set by the
//! caller. Used by tests and demos; a device can be marked faulty to exercise
//! failure propagation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HardwareError;
use crate::hardware::provider::{Command, HandleId, HandleKind, HardwareProvider};

/// Recorded state of one simulated device.
#[derive(Debug, Clone, Default)]
pub struct SimChannel {
    /// Value returned by `read`.
    pub measurement: f64,
    /// Last command written.
    pub last_command: Option<Command>,
    /// Number of writes received.
    pub writes: u64,
    /// When set, every read/write fails with `HardwareError::Device`.
    pub faulty: bool,
    /// Set once the device was claimed through `open`.
    pub opened: bool,
}

/// In-memory [`HardwareProvider`].
#[derive(Debug, Default)]
pub struct SimProvider {
    channels: Mutex<HashMap<HandleId, SimChannel>>,
}

impl SimProvider {
    /// Creates an empty provider.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the value returned by subsequent reads of `id`.
    pub fn set_measurement(&self, id: HandleId, value: f64) {
        self.channels.lock().entry(id).or_default().measurement = value;
    }

    /// Marks `id` faulty (or healthy again).
    pub fn set_faulty(&self, id: HandleId, faulty: bool) {
        self.channels.lock().entry(id).or_default().faulty = faulty;
    }

    /// Returns a copy of the recorded state of `id`.
    pub fn channel(&self, id: HandleId) -> Option<SimChannel> {
        self.channels.lock().get(&id).cloned()
    }

    /// Returns the last command written to `id`.
    pub fn last_command(&self, id: HandleId) -> Option<Command> {
        self.channels.lock().get(&id).and_then(|c| c.last_command)
    }
}

impl HardwareProvider for SimProvider {
    fn open(&self, id: HandleId) -> Result<(), HardwareError> {
        let mut channels = self.channels.lock();
        let ch = channels.entry(id).or_default();
        if ch.opened {
            return Err(HardwareError::AlreadyOpen { id });
        }
        ch.opened = true;
        Ok(())
    }

    fn read(&self, id: HandleId) -> Result<f64, HardwareError> {
        let channels = self.channels.lock();
        let ch = channels
            .get(&id)
            .ok_or(HardwareError::UnknownHandle { id })?;
        if ch.faulty {
            return Err(HardwareError::Device {
                id,
                error: "simulated fault".into(),
            });
        }
        if id.kind == HandleKind::Motor {
            return Err(HardwareError::Unsupported { id, op: "read" });
        }
        Ok(ch.measurement)
    }

    fn write(&self, id: HandleId, command: Command) -> Result<(), HardwareError> {
        if !id.kind.is_actuator() {
            return Err(HardwareError::Unsupported { id, op: "write" });
        }
        let mut channels = self.channels.lock();
        let ch = channels
            .get_mut(&id)
            .ok_or(HardwareError::UnknownHandle { id })?;
        if ch.faulty {
            return Err(HardwareError::Device {
                id,
                error: "simulated fault".into(),
            });
        }
        ch.last_command = Some(command);
        ch.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_handle() {
        let sim = SimProvider::new();
        let id = HandleId::new(HandleKind::AnalogInput, 3);
        assert_eq!(sim.read(id), Err(HardwareError::UnknownHandle { id }));
    }

    #[test]
    fn test_faulty_device_fails_reads() {
        let sim = SimProvider::new();
        let id = HandleId::new(HandleKind::AnalogInput, 3);
        sim.open(id).unwrap();
        sim.set_measurement(id, 0.7);
        assert_eq!(sim.read(id), Ok(0.7));

        sim.set_faulty(id, true);
        assert!(matches!(sim.read(id), Err(HardwareError::Device { .. })));
    }

    #[test]
    fn test_sensors_reject_writes() {
        let sim = SimProvider::new();
        let id = HandleId::new(HandleKind::DigitalInput, 5);
        sim.open(id).unwrap();
        assert!(matches!(
            sim.write(id, Command::Output(1.0)),
            Err(HardwareError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_double_open_is_rejected() {
        let sim = SimProvider::new();
        let id = HandleId::new(HandleKind::Motor, 7);
        sim.open(id).unwrap();
        assert_eq!(sim.open(id), Err(HardwareError::AlreadyOpen { id }));
    }
}
