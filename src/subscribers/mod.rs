//! # Notice subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by the scheduler.
//!
//! ## Architecture
//! ```text
//! Notice flow:
//!   TaskActor ── publish(Notice) ──► Bus ──► scheduler listener ──► SubscriberSet
//!                                                                      │
//!                                                          ┌───────────┼──────────┐
//!                                                          ▼           ▼          ▼
//!                                                      LogWriter    Metrics    Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react (logging, telemetry, alerts)
//! - **Stateful subscribers** - maintain state from notices

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
