//! Subscriber side of the protocol
//!
//! [`Subscriber`] is the callback capability set the manager drives.
//! [`ChannelSubscriber`] adapts it to a tokio channel for consumers that
//! would rather `recv().await` than implement callbacks.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::manager::Subscription;

/// Consumer registered with a [`SubscriberManager`](crate::manager::SubscriberManager)
///
/// Callbacks run on the manager's thread of control and should return
/// quickly. Items arrive in publish order, restricted to the items this
/// subscriber actually receives. After `on_complete` or `on_error` nothing
/// further is delivered until a new registration.
pub trait Subscriber<T>: Send + Sync + 'static {
    /// Called once per registration with the handle used to signal demand
    fn on_subscribe(&self, subscription: Subscription);

    /// Called for every delivered item
    fn on_next(&self, item: T);

    /// Terminal: the publisher finished
    fn on_complete(&self);

    /// Terminal: the publisher failed, or this subscriber was registered twice
    fn on_error(&self);
}

/// Events produced by a [`ChannelSubscriber`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberEvent<T> {
    /// Registration succeeded
    Subscribed,
    /// An item was delivered
    Next(T),
    /// Publisher completed
    Complete,
    /// Publisher failed
    Error,
}

/// Subscriber that forwards callbacks into an unbounded channel
///
/// # Example
/// ```no_run
/// use fanout_rs::manager::ManagerHandle;
/// use fanout_rs::subscriber::{ChannelSubscriber, SubscriberEvent};
/// use fanout_rs::ManagerConfig;
///
/// # async fn example() -> fanout_rs::error::Result<()> {
/// let (handle, _task) = ManagerHandle::<u64>::spawn(ManagerConfig::default());
/// let (subscriber, mut events) = ChannelSubscriber::<u64>::new();
/// handle.subscribe(subscriber.clone()).await?;
///
/// subscriber.request(10);
/// while let Some(event) = events.recv().await {
///     if let SubscriberEvent::Next(item) = event {
///         println!("got {}", item);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChannelSubscriber<T> {
    events: mpsc::UnboundedSender<SubscriberEvent<T>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<T: Send + 'static> ChannelSubscriber<T> {
    /// Create a new subscriber and the receiver for its events
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SubscriberEvent<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Arc::new(Self {
            events: tx,
            subscription: Mutex::new(None),
        });
        (subscriber, rx)
    }

    /// Ask for `n` more items (no-op before registration)
    pub fn request(&self, n: u64) {
        if let Ok(guard) = self.subscription.lock() {
            if let Some(subscription) = guard.as_ref() {
                subscription.request(n);
            }
        }
    }

    /// Withdraw from the manager (no-op before registration)
    pub fn cancel(&self) {
        if let Ok(guard) = self.subscription.lock() {
            if let Some(subscription) = guard.as_ref() {
                subscription.cancel();
            }
        }
    }

    /// Whether a subscription has been received
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn emit(&self, event: SubscriberEvent<T>) {
        // Receiver dropped means the consumer lost interest; nothing to do.
        let _ = self.events.send(event);
    }
}

impl<T: Send + 'static> Subscriber<T> for ChannelSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        if let Ok(mut guard) = self.subscription.lock() {
            *guard = Some(subscription);
        }
        self.emit(SubscriberEvent::Subscribed);
    }

    fn on_next(&self, item: T) {
        self.emit(SubscriberEvent::Next(item));
    }

    fn on_complete(&self) {
        self.emit(SubscriberEvent::Complete);
    }

    fn on_error(&self) {
        self.emit(SubscriberEvent::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_subscriber_events() {
        let (subscriber, mut rx) = ChannelSubscriber::<&'static str>::new();

        subscriber.on_next("a");
        subscriber.on_complete();
        subscriber.on_error();

        assert_eq!(rx.try_recv().unwrap(), SubscriberEvent::Next("a"));
        assert_eq!(rx.try_recv().unwrap(), SubscriberEvent::Complete);
        assert_eq!(rx.try_recv().unwrap(), SubscriberEvent::Error);
    }

    #[test]
    fn test_request_before_subscribe_is_noop() {
        let (subscriber, _rx) = ChannelSubscriber::<u32>::new();

        assert!(!subscriber.is_subscribed());
        subscriber.request(5);
        subscriber.cancel();
    }

    #[test]
    fn test_receiver_dropped() {
        let (subscriber, rx) = ChannelSubscriber::<u32>::new();
        drop(rx);

        // Must not panic
        subscriber.on_next(1);
    }
}
