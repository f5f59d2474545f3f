//! Subscription handle
//!
//! A [`Subscription`] is issued once per registration and is the only way a
//! subscriber signals demand back to its manager. Calls are forwarded as
//! [`DemandSignal`]s over an unbounded channel that the manager drains, so a
//! subscriber may call [`Subscription::request`] from inside its own
//! `on_next` without re-entering the manager.
//!
//! Every signal carries the registration number its subscription was issued
//! under. The manager ignores signals whose number does not match the live
//! registration, so a handle kept past cancel, a terminal signal or a
//! re-registration never drives anyone else's demand.
//!
//! The signal channel is unbounded: `request` never blocks or fails, and
//! signals queue up until the manager's next turn. A subscriber requesting
//! in a tight loop from another task grows that queue without limit, so
//! request in batches rather than one item at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use super::state::SubscriberKey;

/// Demand signal forwarded from a subscription to its manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandSignal {
    /// Subscriber asks for `n` more items
    Request {
        key: SubscriberKey,
        registration: u64,
        n: u64,
    },
    /// Subscriber withdraws
    Cancel { key: SubscriberKey, registration: u64 },
}

/// Capability handle for one registered subscriber
#[derive(Debug)]
pub struct Subscription {
    key: SubscriberKey,
    registration: u64,
    signals: mpsc::UnboundedSender<DemandSignal>,
    cancelled: AtomicBool,
}

impl Subscription {
    pub(super) fn new(
        key: SubscriberKey,
        registration: u64,
        signals: mpsc::UnboundedSender<DemandSignal>,
    ) -> Self {
        Self {
            key,
            registration,
            signals,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Key of the subscriber this subscription was issued for
    pub fn key(&self) -> SubscriberKey {
        self.key
    }

    /// Registration number this subscription was issued under
    pub fn registration(&self) -> u64 {
        self.registration
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Ask for `n` more items
    ///
    /// Does nothing once cancelled or when `n` is zero.
    pub fn request(&self, n: u64) {
        if n == 0 || self.is_cancelled() {
            return;
        }
        self.forward(DemandSignal::Request {
            key: self.key,
            registration: self.registration,
            n,
        });
    }

    /// Withdraw from the manager
    ///
    /// Idempotent: only the first call is forwarded.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.forward(DemandSignal::Cancel {
            key: self.key,
            registration: self.registration,
        });
    }

    fn forward(&self, signal: DemandSignal) {
        // The manager may already be gone; there is nobody left to signal.
        if self.signals.send(signal).is_err() {
            tracing::trace!(subscriber = %self.key, ?signal, "Manager dropped, signal discarded");
        }
    }
}
