//! Demand accounting for one publisher and many subscribers
//!
//! The manager decides, for every published item, which subscribers receive
//! it right away and which find it later in a shared bounded backlog.
//!
//! # Architecture
//!
//! ```text
//!                        SubscriberManager<T>
//!                   ┌──────────────────────────────┐
//!                   │ subscribers: HashMap<Key,    │
//!                   │   SubscriberState {          │
//!                   │     request,                 │
//!                   │     queue_position,          │
//!                   │   }                          │
//!                   │ >                            │
//!                   │ queue: VecDeque<T> (bounded) │
//!                   │ min_request / max_request    │
//!                   └──────────────┬───────────────┘
//!                                  │
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!    [Publisher]             [Subscriber]             [Subscriber]
//!    publish(item)           request(n) > 0           request(n) == 0
//!         │                        │                        │
//!         └──► distribute ─────► on_next             backlog in queue
//! ```
//!
//! # Delivery
//!
//! - When every subscriber has demand, items bypass the queue entirely.
//! - Otherwise the item is queued; subscribers with demand still receive it
//!   directly, the others keep an offset into the queue and catch up on
//!   their next `request`.
//! - A full queue evicts its oldest item. Items every subscriber has moved
//!   past are compacted away as soon as the slowest reader advances.

pub mod config;
pub mod handle;
pub mod state;
pub mod store;
pub mod subscription;

pub use config::ManagerConfig;
pub use handle::ManagerHandle;
pub use state::{SubscriberKey, SubscriberState};
pub use store::SubscriberManager;
pub use subscription::{DemandSignal, Subscription};
