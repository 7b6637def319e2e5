//! Runtime notices: types and broadcast bus.
//!
//! This module groups the notice **data model** and the **bus** used to
//! publish/subscribe to notices emitted by the scheduler, task registry, task
//! actors, referees and subscriber workers.
//!
//! ## Contents
//! - [`NoticeKind`], [`Notice`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler`, `TaskRegistry`, task actors, `Referee`,
//!   `Runtime` (module init), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the scheduler's subscriber listener (fans out to
//!   `SubscriberSet` and updates `AliveTracker`) and `TaskRegistry`.

mod bus;
mod notice;

pub use bus::Bus;
pub use notice::{Notice, NoticeKind};
