use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{alive::AliveTracker, registry::TaskRegistry, scheduler::Scheduler};
use crate::{
    config::Config,
    notices::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Scheduler`] with optional notice subscribers.
pub struct SchedulerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets notice subscribers for observability.
    ///
    /// Subscribers receive runtime notices (task lifecycle, referee
    /// transitions, shutdown) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single notice subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the scheduler.
    ///
    /// Spawns the subscriber workers, so it must be called inside a tokio runtime.
    pub fn build(self) -> Scheduler {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let runtime_token = CancellationToken::new();
        let registry = TaskRegistry::new(bus.clone(), runtime_token.clone());
        let alive = Arc::new(AliveTracker::new());

        Scheduler::new_internal(self.cfg, bus, subs, alive, registry, runtime_token)
    }
}
