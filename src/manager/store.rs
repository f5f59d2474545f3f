//! Subscriber manager implementation
//!
//! Owns the subscriber table, the shared backlog queue and the aggregate
//! demand counters, and decides for every published item who gets it now and
//! who has to catch up from the queue later.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::stats::{DeliveryCounters, ManagerStats};
use crate::subscriber::Subscriber;

use super::config::ManagerConfig;
use super::state::{SubscriberEntry, SubscriberKey, SubscriberState};
use super::subscription::{DemandSignal, Subscription};

/// Terminal signal broadcast to every subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Complete,
    Error,
}

/// Demand accounting for one publisher and its subscribers
///
/// Not synchronized: a manager must be owned by a single thread of control.
/// Wrap it in a mutex or hand it to [`ManagerHandle`](super::ManagerHandle)
/// to share it.
pub struct SubscriberManager<T> {
    /// Registered subscribers and their counters
    subscribers: HashMap<SubscriberKey, SubscriberEntry<T>>,

    /// Backlog shared by all subscribers, oldest first
    queue: VecDeque<T>,

    /// Maximum queue length (>= 1)
    queue_bound: usize,

    /// Minimum `request` over subscribers; never above the true minimum
    min_request: u64,

    /// Maximum `request` over subscribers; never below the true maximum
    max_request: u64,

    /// Sender cloned into every issued subscription
    signal_tx: mpsc::UnboundedSender<DemandSignal>,

    /// Pending demand signals from subscriptions
    signal_rx: mpsc::UnboundedReceiver<DemandSignal>,

    /// Registration number handed to the next subscriber
    next_registration: u64,

    /// Configuration
    config: ManagerConfig,

    /// Lifetime counters
    counters: DeliveryCounters,
}

impl<T: Clone + Send + 'static> SubscriberManager<T> {
    /// Create a new manager with default configuration
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a new manager retaining at most `queue_bound` items (minimum 1)
    pub fn with_queue_bound(queue_bound: usize) -> Self {
        Self::with_config(ManagerConfig::default().queue_bound(queue_bound))
    }

    /// Create a new manager with custom configuration
    pub fn with_config(config: ManagerConfig) -> Self {
        let queue_bound = config.queue_bound.max(1);
        let config = ManagerConfig {
            queue_bound,
            command_capacity: config.command_capacity.max(1),
        };
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        Self {
            subscribers: HashMap::new(),
            queue: VecDeque::with_capacity(queue_bound.min(1024)),
            queue_bound,
            min_request: 0,
            max_request: 0,
            signal_tx,
            signal_rx,
            next_registration: 0,
            config,
            counters: DeliveryCounters::default(),
        }
    }

    /// Get the manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Aggregate minimum demand
    pub fn min_request(&self) -> u64 {
        self.min_request
    }

    /// Aggregate maximum demand
    pub fn max_request(&self) -> u64 {
        self.max_request
    }

    /// Maximum number of retained items
    pub fn queue_bound(&self) -> usize {
        self.queue_bound
    }

    /// Number of retained items
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Counters for one subscriber, if registered
    pub fn subscriber_state(&self, key: &SubscriberKey) -> Option<SubscriberState> {
        self.subscribers.get(key).map(|entry| entry.state)
    }

    /// Retained items, oldest first
    pub fn queued(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }

    /// Snapshot of gauges and lifetime counters
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            subscriber_count: self.subscribers.len(),
            queue_size: self.queue.len(),
            queue_bound: self.queue_bound,
            min_request: self.min_request,
            max_request: self.max_request,
            counters: self.counters,
        }
    }

    /// Register a subscriber and hand it its subscription
    ///
    /// Registering an already registered subscriber is a protocol violation:
    /// it receives `on_error`, and its state is then reset as if it had just
    /// joined.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber<T>>) -> SubscriberKey {
        self.process_signals();

        let key = SubscriberKey::of(&subscriber);

        if let Some(existing) = self.subscribers.get(&key) {
            tracing::warn!(subscriber = %key, "Subscriber registered twice");
            self.counters.duplicate_registrations += 1;
            existing.subscriber.on_error();
        }

        let registration = self.next_registration;
        self.next_registration += 1;
        self.subscribers.insert(
            key,
            SubscriberEntry::new(Arc::clone(&subscriber), registration),
        );

        // A newcomer starts with zero demand.
        self.min_request = 0;

        tracing::debug!(
            subscriber = %key,
            subscribers = self.subscribers.len(),
            queue_size = self.queue.len(),
            "Subscriber added"
        );

        subscriber.on_subscribe(Subscription::new(
            key,
            registration,
            self.signal_tx.clone(),
        ));

        self.process_signals();
        key
    }

    /// Distribute an item to subscribers
    ///
    /// Subscribers with demand get the item immediately; the rest find it in
    /// the backlog once they request more.
    pub fn publish(&mut self, item: T) {
        self.process_signals();
        self.distribute(item);
        self.process_signals();
    }

    /// Broadcast `on_complete` and reset to empty state
    pub fn complete(&mut self) {
        self.terminate(Terminal::Complete);
    }

    /// Broadcast `on_error` and reset to empty state
    pub fn error(&mut self) {
        self.terminate(Terminal::Error);
    }

    /// Add `n` to a subscriber's demand, serving its backlog first
    ///
    /// Unknown subscribers are ignored.
    pub fn request(&mut self, key: &SubscriberKey, n: u64) {
        if n == 0 {
            return;
        }

        let (remaining, was_at_head) = match self.subscribers.get_mut(key) {
            Some(entry) => {
                let state = &mut entry.state;
                if state.request == 0 && state.queue_position < self.queue.len() {
                    let start = state.queue_position;
                    let backlog = self.queue.len() - start;
                    let count = usize::try_from(n).map_or(backlog, |n| n.min(backlog));

                    for item in self.queue.range(start..start + count) {
                        entry.subscriber.on_next(item.clone());
                    }
                    entry.state.queue_position += count;
                    self.counters.backlog_deliveries += count as u64;

                    tracing::trace!(
                        subscriber = %key,
                        delivered = count,
                        backlog = backlog - count,
                        "Backlog delivered"
                    );

                    (n - count as u64, start == 0)
                } else {
                    (n, false)
                }
            }
            None => {
                tracing::trace!(subscriber = %key, "Request for unknown subscriber");
                return;
            }
        };

        if was_at_head {
            self.adjust_queue();
        }

        if remaining == 0 {
            return;
        }

        if let Some(entry) = self.subscribers.get_mut(key) {
            let previous = entry.state.request;
            entry.state.request = previous.saturating_add(remaining);
            self.max_request = self.max_request.max(entry.state.request);

            if previous == self.min_request {
                self.recompute_min_request();
            }
        }
    }

    /// Remove a subscriber
    ///
    /// Unknown subscribers are ignored. The aggregates are left as they are,
    /// so `min_request` may understate and `max_request` may overstate the
    /// remaining subscribers' demand until the next recompute.
    pub fn cancel(&mut self, key: &SubscriberKey) {
        let entry = match self.subscribers.remove(key) {
            Some(entry) => entry,
            None => {
                tracing::trace!(subscriber = %key, "Cancel for unknown subscriber");
                return;
            }
        };

        tracing::debug!(
            subscriber = %key,
            subscribers = self.subscribers.len(),
            "Subscriber removed"
        );

        let state = entry.state;
        if state.request == 0 && state.queue_position == 0 && !self.queue.is_empty() {
            self.adjust_queue();
        }
    }

    /// Apply every pending demand signal
    ///
    /// Called at the start and end of each publisher-facing operation.
    /// Returns the number of signals applied.
    pub fn process_signals(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            self.apply_signal(signal);
            applied += 1;
        }
        applied
    }

    /// Wait for the next demand signal
    ///
    /// Never returns `None` while the manager is alive, since it keeps a
    /// sender for issuing subscriptions.
    pub(super) async fn next_signal(&mut self) -> Option<DemandSignal> {
        self.signal_rx.recv().await
    }

    pub(super) fn apply_signal(&mut self, signal: DemandSignal) {
        let (key, registration) = match signal {
            DemandSignal::Request { key, registration, .. }
            | DemandSignal::Cancel { key, registration } => (key, registration),
        };

        let live = self
            .subscribers
            .get(&key)
            .map_or(false, |entry| entry.registration == registration);
        if !live {
            tracing::trace!(subscriber = %key, registration, "Stale signal ignored");
            return;
        }

        match signal {
            DemandSignal::Request { n, .. } => self.request(&key, n),
            DemandSignal::Cancel { .. } => self.cancel(&key),
        }
    }

    fn distribute(&mut self, item: T) {
        self.counters.items_published += 1;

        if self.subscribers.is_empty() {
            self.counters.items_dropped += 1;
            tracing::trace!("No subscribers, item dropped");
            return;
        }

        // Everyone has demand: deliver without touching the queue.
        if self.min_request > 0 {
            for entry in self.subscribers.values_mut() {
                entry.state.request = entry.state.request.saturating_sub(1);
                entry.subscriber.on_next(item.clone());
            }
            self.counters.direct_deliveries += self.subscribers.len() as u64;
            self.min_request -= 1;
            self.max_request = self.max_request.saturating_sub(1);
            return;
        }

        if self.queue.len() >= self.queue_bound {
            self.queue.pop_front();
            self.queue.push_back(item.clone());
            self.counters.items_evicted += 1;

            for entry in self.subscribers.values_mut() {
                if entry.state.request > 0 {
                    // Position stays put: with demand it already sits at the tail.
                    entry.state.request -= 1;
                    entry.subscriber.on_next(item.clone());
                    self.counters.direct_deliveries += 1;
                } else if entry.state.queue_position > 0 {
                    entry.state.queue_position -= 1;
                }
            }

            tracing::trace!(queue_size = self.queue.len(), "Queue full, head evicted");
            return;
        }

        self.queue.push_back(item.clone());
        let tail = self.queue.len();

        for entry in self.subscribers.values_mut() {
            if entry.state.request > 0 {
                entry.state.request -= 1;
                entry.state.queue_position = tail;
                entry.subscriber.on_next(item.clone());
                self.counters.direct_deliveries += 1;
            }
        }

        tracing::trace!(queue_size = tail, "Item queued");
    }

    /// Drop the queue prefix every subscriber has already consumed
    fn adjust_queue(&mut self) {
        let consumed = self
            .subscribers
            .values()
            .map(|entry| entry.state.queue_position)
            .min()
            .unwrap_or(self.queue.len())
            .min(self.queue.len());

        if consumed == 0 {
            return;
        }

        self.queue.drain(..consumed);
        for entry in self.subscribers.values_mut() {
            entry.state.queue_position -= consumed;
        }
        self.counters.items_compacted += consumed as u64;

        tracing::debug!(
            compacted = consumed,
            queue_size = self.queue.len(),
            "Queue compacted"
        );
    }

    fn recompute_min_request(&mut self) {
        if let Some(min) = self
            .subscribers
            .values()
            .map(|entry| entry.state.request)
            .min()
        {
            self.min_request = min;
        }
    }

    fn terminate(&mut self, terminal: Terminal) {
        self.process_signals();
        self.counters.terminal_signals += 1;

        tracing::info!(
            signal = ?terminal,
            subscribers = self.subscribers.len(),
            queue_size = self.queue.len(),
            "Terminal signal broadcast"
        );

        for entry in self.subscribers.values() {
            match terminal {
                Terminal::Complete => entry.subscriber.on_complete(),
                Terminal::Error => entry.subscriber.on_error(),
            }
        }

        self.subscribers.clear();
        self.queue.clear();
        self.min_request = 0;
        self.max_request = 0;

        // Signals raised during the broadcast name subscribers that are gone.
        self.process_signals();
    }
}

impl<T: Clone + Send + 'static> Default for SubscriberManager<T> {
    fn default() -> Self {
        Self::new()
    }
}
