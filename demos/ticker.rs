//! Fan-out demo with a fast and a slow consumer
//!
//! Run with: cargo run --example ticker [ITEMS]
//!
//! Examples:
//!   cargo run --example ticker                               # 32 ticks
//!   RUST_LOG=fanout_rs=debug cargo run --example ticker 100  # with manager logs
//!
//! The fast consumer keeps a standing demand and gets every tick directly.
//! The slow consumer asks for a few ticks at a time; whatever it misses while
//! idle waits in the bounded backlog, and the oldest ticks are evicted once
//! the backlog is full.

use std::time::Duration;

use bytes::Bytes;
use fanout_rs::{ChannelSubscriber, ManagerConfig, ManagerHandle, SubscriberEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fanout_rs=info")),
        )
        .init();

    let items: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 32,
    };

    let config = ManagerConfig::default().queue_bound(8);
    let (handle, task) = ManagerHandle::<Bytes>::spawn(config);

    let (fast, mut fast_events) = ChannelSubscriber::<Bytes>::new();
    let (slow, mut slow_events) = ChannelSubscriber::<Bytes>::new();
    handle.subscribe(fast.clone()).await?;
    handle.subscribe(slow.clone()).await?;

    let fast_consumer = tokio::spawn(async move {
        fast.request(u64::MAX);
        let mut received = 0u64;
        while let Some(event) = fast_events.recv().await {
            match event {
                SubscriberEvent::Next(_) => received += 1,
                SubscriberEvent::Complete | SubscriberEvent::Error => break,
                SubscriberEvent::Subscribed => {}
            }
        }
        received
    });

    let slow_consumer = tokio::spawn(async move {
        let mut received = Vec::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(25));
        loop {
            ticker.tick().await;
            slow.request(3);
            while let Ok(event) = slow_events.try_recv() {
                match event {
                    SubscriberEvent::Next(tick) => {
                        received.push(String::from_utf8_lossy(&tick).into_owned())
                    }
                    SubscriberEvent::Complete | SubscriberEvent::Error => return received,
                    SubscriberEvent::Subscribed => {}
                }
            }
        }
    });

    for n in 0..items {
        handle.publish(Bytes::from(format!("tick-{}", n))).await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let stats = handle.stats().await?;
    println!(
        "published={} evicted={} direct={} backlog={} queued={}/{}",
        stats.counters.items_published,
        stats.counters.items_evicted,
        stats.counters.direct_deliveries,
        stats.counters.backlog_deliveries,
        stats.queue_size,
        stats.queue_bound,
    );

    handle.complete().await?;

    let fast_received = fast_consumer.await?;
    let slow_received = slow_consumer.await?;
    println!("fast consumer received {} ticks", fast_received);
    println!(
        "slow consumer received {} ticks: {:?}",
        slow_received.len(),
        slow_received
    );

    drop(handle);
    task.await?;
    Ok(())
}
