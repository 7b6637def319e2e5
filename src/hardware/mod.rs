//! Hardware capability facade.
//!
//! The runtime never talks to devices directly. A [`HardwareProvider`] does the
//! actual I/O; modules hold [`Handle`]s, which route every read and write
//! through the referee gate:
//!
//! ```text
//! task ──► Handle::write(cmd) ──► gate (watched? held?) ──► HardwareProvider::write
//!                                   ▲
//! Referee::neutralize/release ──────┘  (override wins while held)
//! ```
//!
//! ## Contents
//! - [`HandleId`], [`HandleKind`], [`Command`] logical identifiers and commands
//! - [`HardwareProvider`] the narrow I/O interface implemented outside the core
//! - [`Handle`] owned, gated device handle
//! - [`NeutralPolicy`] what "safe" means for a kind of handle
//! - [`SimProvider`] in-memory provider for tests and demos

mod handle;
mod provider;
mod sim;

pub use handle::{Handle, WriteOutcome};
pub use provider::{Command, HandleId, HandleKind, HardwareProvider, NeutralPolicy};
pub use sim::{SimChannel, SimProvider};
