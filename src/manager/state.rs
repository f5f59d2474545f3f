//! Per-subscriber state
//!
//! This module defines the counters the manager keeps for every registered
//! subscriber, and the key used to identify a subscriber in its table.

use std::sync::Arc;

use crate::subscriber::Subscriber;

/// Opaque identity of a registered subscriber
///
/// Derived from the address of the subscriber's `Arc` allocation, so
/// registering the same `Arc` twice yields the same key. An address can be
/// reused once the allocation is freed, so a key alone does not identify a
/// registration; subscriptions also carry a registration number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberKey(usize);

impl SubscriberKey {
    /// Key for a subscriber handle
    pub fn of<T>(subscriber: &Arc<dyn Subscriber<T>>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }
}

impl std::fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Demand counters for one subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberState {
    /// Remaining promised demand (saturates at `u64::MAX`)
    pub request: u64,
    /// Offset of the next unread item in the shared queue
    pub queue_position: usize,
}

/// Entry for a single subscriber in the manager's table
pub(super) struct SubscriberEntry<T> {
    pub subscriber: Arc<dyn Subscriber<T>>,
    pub state: SubscriberState,
    /// Unique per registration; signals carrying another value are stale
    pub registration: u64,
}

impl<T> SubscriberEntry<T> {
    pub fn new(subscriber: Arc<dyn Subscriber<T>>, registration: u64) -> Self {
        Self {
            subscriber,
            state: SubscriberState::default(),
            registration,
        }
    }
}
