//! Owning task for a subscriber manager
//!
//! [`SubscriberManager`] is single-owner. [`ManagerHandle`] moves it into a
//! tokio task and serializes every publisher call through a bounded command
//! channel, while demand signals from subscriptions on other tasks wake the
//! same loop.
//!
//! ```text
//!   ManagerHandle (clone) ──► [commands] ──┐
//!                                          ├──► task ──► SubscriberManager
//!   Subscription::request ──► [signals] ───┘
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::stats::ManagerStats;
use crate::subscriber::Subscriber;

use super::config::ManagerConfig;
use super::store::SubscriberManager;
use super::subscription::DemandSignal;

/// Command sent from a handle to the owning task
enum Command<T> {
    Subscribe(Arc<dyn Subscriber<T>>),
    Publish(T),
    Complete,
    Error,
    Stats(oneshot::Sender<ManagerStats>),
}

/// What woke the task up
enum Wakeup<T> {
    Command(Option<Command<T>>),
    Signal(Option<DemandSignal>),
}

/// Cloneable handle to a manager running in its own task
pub struct ManagerHandle<T> {
    commands: mpsc::Sender<Command<T>>,
}

impl<T> Clone for ManagerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ManagerHandle<T> {
    /// Spawn a manager task
    ///
    /// The task runs until every handle has been dropped.
    pub fn spawn(config: ManagerConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
        let manager = SubscriberManager::with_config(config);
        let task = tokio::spawn(run(manager, rx));

        (Self { commands: tx }, task)
    }

    /// Register a subscriber
    pub async fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<()> {
        self.send(Command::Subscribe(subscriber)).await
    }

    /// Publish an item
    pub async fn publish(&self, item: T) -> Result<()> {
        self.send(Command::Publish(item)).await
    }

    /// Signal completion to every subscriber
    pub async fn complete(&self) -> Result<()> {
        self.send(Command::Complete).await
    }

    /// Signal an error to every subscriber
    pub async fn error(&self) -> Result<()> {
        self.send(Command::Error).await
    }

    /// Snapshot of the manager's statistics
    ///
    /// Commands are applied in order, so the snapshot reflects every call made
    /// through this handle before it.
    pub async fn stats(&self) -> Result<ManagerStats> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stats(tx)).await?;
        rx.await.map_err(|_| Error::ManagerClosed)
    }

    async fn send(&self, command: Command<T>) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ManagerClosed)
    }
}

async fn run<T: Clone + Send + 'static>(
    mut manager: SubscriberManager<T>,
    mut commands: mpsc::Receiver<Command<T>>,
) {
    tracing::info!(
        queue_bound = manager.queue_bound(),
        "Subscriber manager task started"
    );

    loop {
        let wakeup = tokio::select! {
            command = commands.recv() => Wakeup::Command(command),
            signal = manager.next_signal() => Wakeup::Signal(signal),
        };

        match wakeup {
            Wakeup::Command(Some(command)) => match command {
                Command::Subscribe(subscriber) => {
                    manager.subscribe(subscriber);
                }
                Command::Publish(item) => manager.publish(item),
                Command::Complete => manager.complete(),
                Command::Error => manager.error(),
                Command::Stats(reply) => {
                    manager.process_signals();
                    // Caller may have stopped waiting
                    let _ = reply.send(manager.stats());
                }
            },
            Wakeup::Command(None) => break,
            Wakeup::Signal(Some(signal)) => {
                manager.apply_signal(signal);
                manager.process_signals();
            }
            Wakeup::Signal(None) => break,
        }
    }

    tracing::info!(
        subscribers = manager.subscriber_count(),
        queue_size = manager.queue_size(),
        "Subscriber manager task stopped"
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::subscriber::{ChannelSubscriber, SubscriberEvent};

    async fn next_event<T>(rx: &mut UnboundedReceiver<SubscriberEvent<T>>) -> SubscriberEvent<T> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("subscriber channel closed")
    }

    #[tokio::test]
    async fn test_publish_through_handle() {
        let (handle, _task) = ManagerHandle::<u32>::spawn(ManagerConfig::default());
        let (subscriber, mut events) = ChannelSubscriber::<u32>::new();

        assert_ok!(handle.subscribe(subscriber.clone()).await);
        assert_eq!(next_event(&mut events).await, SubscriberEvent::Subscribed);

        subscriber.request(2);
        assert_ok!(handle.publish(1).await);
        assert_ok!(handle.publish(2).await);
        assert_ok!(handle.publish(3).await);

        assert_eq!(next_event(&mut events).await, SubscriberEvent::Next(1));
        assert_eq!(next_event(&mut events).await, SubscriberEvent::Next(2));

        let stats = assert_ok!(handle.stats().await);
        assert_eq!(stats.subscriber_count, 1);
        assert_eq!(stats.queue_size, 1);
        assert_eq!(stats.counters.direct_deliveries, 2);
    }

    #[tokio::test]
    async fn test_request_from_consumer_task_drains_backlog() {
        let config = ManagerConfig::default().queue_bound(8);
        let (handle, _task) = ManagerHandle::<Bytes>::spawn(config);
        let (subscriber, mut events) = ChannelSubscriber::<Bytes>::new();

        assert_ok!(handle.subscribe(subscriber.clone()).await);
        for chunk in [&b"one"[..], &b"two"[..], &b"three"[..]] {
            assert_ok!(handle.publish(Bytes::copy_from_slice(chunk)).await);
        }
        assert_eq!(next_event(&mut events).await, SubscriberEvent::Subscribed);

        // Commands are applied in order, so everything is queued by now
        let stats = assert_ok!(handle.stats().await);
        assert_eq!(stats.queue_size, 3);

        // Demand arrives with no publisher command in flight
        let consumer = tokio::spawn(async move {
            subscriber.request(3);
            let mut received = Vec::new();
            while received.len() < 3 {
                if let SubscriberEvent::Next(item) = next_event(&mut events).await {
                    received.push(item);
                }
            }
            received
        });

        let received = consumer.await.unwrap();
        assert_eq!(
            received,
            vec![
                Bytes::from_static(b"one"),
                Bytes::from_static(b"two"),
                Bytes::from_static(b"three"),
            ]
        );

        let stats = assert_ok!(handle.stats().await);
        assert_eq!(stats.queue_size, 0);
        assert_eq!(stats.counters.backlog_deliveries, 3);
    }

    #[tokio::test]
    async fn test_complete_through_handle() {
        let (handle, _task) = ManagerHandle::<u32>::spawn(ManagerConfig::default());
        let (subscriber, mut events) = ChannelSubscriber::<u32>::new();

        assert_ok!(handle.subscribe(subscriber).await);
        assert_ok!(handle.complete().await);

        assert_eq!(next_event(&mut events).await, SubscriberEvent::Subscribed);
        assert_eq!(next_event(&mut events).await, SubscriberEvent::Complete);

        let stats = assert_ok!(handle.stats().await);
        assert_eq!(stats.subscriber_count, 0);
        assert_eq!(stats.counters.terminal_signals, 1);
    }

    #[tokio::test]
    async fn test_error_through_handle() {
        let (handle, _task) = ManagerHandle::<u32>::spawn(ManagerConfig::default());
        let (subscriber, mut events) = ChannelSubscriber::<u32>::new();

        assert_ok!(handle.subscribe(subscriber).await);
        assert_ok!(handle.error().await);

        assert_eq!(next_event(&mut events).await, SubscriberEvent::Subscribed);
        assert_eq!(next_event(&mut events).await, SubscriberEvent::Error);
    }

    #[tokio::test]
    async fn test_task_stops_when_handles_dropped() {
        let (handle, task) = ManagerHandle::<u32>::spawn(ManagerConfig::default());
        let other = handle.clone();

        drop(handle);
        assert_ok!(other.publish(1).await);
        drop(other);

        assert_ok!(tokio::time::timeout(Duration::from_secs(1), task).await);
    }

    #[tokio::test]
    async fn test_closed_manager() {
        let (handle, task) = ManagerHandle::<u32>::spawn(ManagerConfig::default());
        task.abort();
        let _ = task.await;

        assert_err!(handle.publish(1).await);
        assert_eq!(handle.stats().await, Err(Error::ManagerClosed));
    }
}
