//! # Module capability interface.
//!
//! A [`Module`] is initialized exactly once. During [`Module::init`] it opens
//! its hardware, registers every handle with its referee, obtains datastreams,
//! pushes defaults and adds its tasks. None of those tasks run before `init`
//! returns.
//!
//! ## Example
//! ```rust
//! use loopvisor::{HandleKind, Module, ModuleContext, ModuleError, TaskError, TaskSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Wrist;
//!
//! impl Module for Wrist {
//!     fn name(&self) -> &str { "wrist" }
//!
//!     fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
//!         let motor = ctx.open_watched(HandleKind::Motor, 4)?;
//!         ctx.add_task(TaskSpec::from_fn("wrist.hold", move |_ctx: CancellationToken| {
//!             let motor = motor.clone();
//!             async move {
//!                 motor.set(0.0)?;
//!                 Ok::<(), TaskError>(())
//!             }
//!         }));
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::ModuleError;
use crate::modules::context::ModuleContext;

/// Robot subsystem registered on the runtime.
pub trait Module: Send + 'static {
    /// Unique module name; prefixes its referee task (`"<name>.referee"`).
    fn name(&self) -> &str;

    /// One-shot initialization.
    fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError>;
}

/// Lifecycle of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered, `init` not yet run.
    Uninitialized,
    /// `init` returned `Ok`.
    Initialized,
}

/// A registered module and its lifecycle state.
pub(crate) struct ModuleSlot {
    module: Box<dyn Module>,
    state: ModuleState,
}

impl ModuleSlot {
    pub(crate) fn new(module: Box<dyn Module>) -> Self {
        Self {
            module,
            state: ModuleState::Uninitialized,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.module.name()
    }

    pub(crate) fn state(&self) -> ModuleState {
        self.state
    }

    /// Runs `init` once. A failed init leaves the module uninitialized.
    pub(crate) fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        if self.state == ModuleState::Initialized {
            return Err(ModuleError::AlreadyInitialized {
                module: self.name().to_string(),
            });
        }
        self.module.init(ctx)?;
        self.state = ModuleState::Initialized;
        Ok(())
    }
}
