//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the runtime.
//!
//! Config is used in two ways:
//! 1. **Runtime creation**: `Runtime::builder(config, hardware)`
//! 2. **Referee creation**: neutral policies are looked up per handle kind
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for tasks on shutdown
//! - `bus_capacity = 0` → clamped to 1

use std::collections::HashMap;
use std::time::Duration;

use crate::gamemode::GAMEMODE_STREAM;
use crate::hardware::{HandleKind, NeutralPolicy};

/// Global configuration for the runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait for tasks to stop after shutdown is requested
/// - `bus_capacity`: notice bus ring buffer size (min 1)
/// - `gamemode_stream`: name of the well-known gamemode datastream
/// - `handle_signals`: treat SIGINT/SIGTERM/SIGQUIT as a shutdown request
/// - `neutral`: per-kind overrides of the referee's neutral policy
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for tasks to exit once shutdown is requested.
    ///
    /// If exceeded, `Scheduler::run` returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the notice bus broadcast channel ring buffer.
    ///
    /// Receivers lagging by more than `bus_capacity` notices skip the oldest.
    pub bus_capacity: usize,

    /// Datastream carrying the `{ enabled, mode }` record every referee watches.
    pub gamemode_stream: String,

    /// Whether `Scheduler::run` also stops on OS termination signals.
    pub handle_signals: bool,

    /// Per-kind overrides for what "neutral" means.
    ///
    /// Kinds not present fall back to [`HandleKind::default_neutral`].
    pub neutral: HashMap<HandleKind, NeutralPolicy>,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the neutral policy the referee applies to handles of `kind`.
    #[inline]
    pub fn neutral_for(&self, kind: HandleKind) -> NeutralPolicy {
        self.neutral
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_neutral())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `gamemode_stream = "gamemode"`
    /// - `handle_signals = true`
    /// - `neutral = {}` (kind defaults: motors to zero, controllers disabled, sensors untouched)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            gamemode_stream: GAMEMODE_STREAM.to_string(),
            handle_signals: true,
            neutral: HashMap::new(),
        }
    }
}
