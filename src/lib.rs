//! # fanout-rs
//!
//! Demand-accounting core for reactive publish/subscribe: one publisher, many
//! subscribers, each advertising how many items it is ready to receive.
//!
//! - [`manager::SubscriberManager`]: synchronous, single-owner core
//! - [`manager::ManagerHandle`]: the same core driven by its own tokio task
//! - [`subscriber::Subscriber`]: callback contract for consumers
//! - [`subscriber::ChannelSubscriber`]: channel-backed consumer
//!
//! # Example
//! ```
//! use fanout_rs::manager::SubscriberManager;
//! use fanout_rs::subscriber::{ChannelSubscriber, SubscriberEvent};
//!
//! let mut manager = SubscriberManager::<u32>::with_queue_bound(16);
//! let (subscriber, mut events) = ChannelSubscriber::<u32>::new();
//! manager.subscribe(subscriber.clone());
//!
//! // No demand yet: the item waits in the backlog
//! manager.publish(1);
//! assert_eq!(manager.queue_size(), 1);
//!
//! subscriber.request(1);
//! manager.process_signals();
//!
//! assert_eq!(events.try_recv().unwrap(), SubscriberEvent::Subscribed);
//! assert_eq!(events.try_recv().unwrap(), SubscriberEvent::Next(1));
//! assert_eq!(manager.queue_size(), 0);
//! ```

pub mod error;
pub mod manager;
pub mod stats;
pub mod subscriber;

pub use error::{Error, Result};
pub use manager::{ManagerConfig, ManagerHandle, SubscriberManager, Subscription};
pub use stats::ManagerStats;
pub use subscriber::{ChannelSubscriber, Subscriber, SubscriberEvent};
