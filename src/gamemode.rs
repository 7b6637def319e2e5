//! # Gamemode record.
//!
//! Every module agrees on one well-known datastream (default name
//! [`GAMEMODE_STREAM`]) carrying `{ "enabled": bool, "mode": "..." }`.
//! [`GameMode`] is the typed view of that record; modules that prefer raw
//! records can keep using [`Predicate`]s on the field names directly.

use serde::{Deserialize, Serialize};

use crate::datastreams::{Datastream, Predicate};
use crate::error::DatastreamError;

/// Default name of the gamemode datastream.
pub const GAMEMODE_STREAM: &str = "gamemode";

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Nothing may move.
    Disabled,
    /// Driver control.
    Teleop,
    /// Autonomous routine.
    Autonomous,
    /// Test mode.
    Test,
}

impl Mode {
    /// Wire name (`"teleop"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Disabled => "disabled",
            Mode::Teleop => "teleop",
            Mode::Autonomous => "autonomous",
            Mode::Test => "test",
        }
    }
}

/// Typed gamemode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMode {
    /// Active operating window.
    pub enabled: bool,
    /// Current mode.
    pub mode: Mode,
}

impl GameMode {
    /// `{ enabled: false, mode: "disabled" }`.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            mode: Mode::Disabled,
        }
    }

    /// `{ enabled: true, mode }`.
    pub const fn enabled(mode: Mode) -> Self {
        Self {
            enabled: true,
            mode,
        }
    }

    /// Pushes this record to `stream`.
    pub fn push_to(&self, stream: &Datastream) -> Result<u64, DatastreamError> {
        stream.push_as(self)
    }

    /// Holds while the operating window is open.
    pub fn enabled_predicate() -> Predicate {
        Predicate::is_true("enabled")
    }

    /// Holds while the window is closed, including before the first push.
    pub fn disabled_predicate() -> Predicate {
        !Self::enabled_predicate()
    }

    /// Holds while `mode` is active.
    pub fn mode_predicate(mode: Mode) -> Predicate {
        Predicate::equals("mode", mode.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastreams::DatastreamRegistry;

    #[test]
    fn test_wire_format() {
        let v = serde_json::to_value(GameMode::enabled(Mode::Teleop)).unwrap();
        assert_eq!(v, serde_json::json!({"enabled": true, "mode": "teleop"}));
    }

    #[test]
    fn test_predicates_follow_pushes() {
        let reg = DatastreamRegistry::new();
        let gm = reg.get(GAMEMODE_STREAM);
        let disabled = gm.set_event(GameMode::disabled_predicate());
        let teleop = gm.set_event(GameMode::mode_predicate(Mode::Teleop));
        assert!(disabled.is_ready());
        assert!(!teleop.is_ready());

        GameMode::enabled(Mode::Teleop).push_to(&gm).unwrap();
        assert!(!disabled.is_ready());
        assert!(teleop.is_ready());
        assert_eq!(
            gm.get_as::<GameMode>().unwrap(),
            Some(GameMode::enabled(Mode::Teleop))
        );
    }
}
