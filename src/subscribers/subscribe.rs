//! # Notice subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging custom notice
//! handlers into the runtime.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `NoticeKind::SubscriberPanicked`)
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_notice()
//!                                    └─► panic caught → NoticeKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the notice **for this subscriber only** and publishes
//!   `NoticeKind::SubscriberOverflow`.
//! - Notices are processed sequentially (FIFO) per subscriber.
//! - Subscribers never block control tasks: telemetry failures cannot affect
//!   control-loop correctness.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use loopvisor::{Notice, NoticeKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_notice(&self, n: &Notice) {
//!         if matches!(n.kind, NoticeKind::TaskFailed) {
//!             // bump a counter, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

use async_trait::async_trait;

use crate::notices::Notice;

/// Notice subscriber for runtime observability.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single notice.
    ///
    /// Called from a dedicated worker task, not in the publisher context.
    async fn on_notice(&self, notice: &Notice);

    /// Returns the subscriber name used in overflow/panic notices.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (min 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
