//! # Modules: named bundles of handles, datastreams and tasks.
//!
//! - [`Module`] - capability interface implemented by robot subsystems
//! - [`ModuleContext`] - what a module sees during `init`
//! - [`ModuleState`] - `Uninitialized → Initialized`, never back
//!
//! Modules are registered explicitly on the runtime builder; there is no
//! discovery.

mod context;
mod module;

pub use context::ModuleContext;
pub(crate) use module::ModuleSlot;
pub use module::{Module, ModuleState};
