//! Manager configuration

/// Default number of items retained for backlog delivery
pub const DEFAULT_QUEUE_BOUND: usize = 1024;

/// Default capacity of the owning task's command channel
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Configuration options for a [`SubscriberManager`](super::SubscriberManager)
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Maximum number of items retained for slow subscribers (always >= 1)
    pub queue_bound: usize,

    /// Capacity of the command channel used by [`ManagerHandle`](super::ManagerHandle)
    ///
    /// Only publisher commands are bounded. Demand signals from subscriptions
    /// travel on a separate unbounded channel and are not limited by this
    /// value; a subscriber flooding `request` grows that channel until the
    /// manager's next turn.
    pub command_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            queue_bound: DEFAULT_QUEUE_BOUND,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl ManagerConfig {
    /// Set the queue bound
    ///
    /// A bound of 0 is coerced to 1.
    pub fn queue_bound(mut self, bound: usize) -> Self {
        self.queue_bound = bound.max(1);
        self
    }

    /// Set the command channel capacity (minimum 1)
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }
}
