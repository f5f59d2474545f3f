//! Statistics for subscriber managers

/// Lifetime delivery counters
///
/// Kept across terminal resets; a manager reused after `complete()` keeps
/// counting from where it left off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryCounters {
    /// Items handed to `publish`
    pub items_published: u64,
    /// Items dropped because nobody was subscribed
    pub items_dropped: u64,
    /// Items evicted from the head of a full queue
    pub items_evicted: u64,
    /// Items released by compaction after every subscriber consumed them
    pub items_compacted: u64,
    /// `on_next` calls made straight from `publish`
    pub direct_deliveries: u64,
    /// `on_next` calls made from the backlog on `request`
    pub backlog_deliveries: u64,
    /// Registrations rejected with `on_error` for being duplicates
    pub duplicate_registrations: u64,
    /// `complete()` and `error()` calls
    pub terminal_signals: u64,
}

impl DeliveryCounters {
    /// Total `on_next` calls
    pub fn total_deliveries(&self) -> u64 {
        self.direct_deliveries + self.backlog_deliveries
    }
}

/// Point-in-time snapshot of a manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Registered subscribers
    pub subscriber_count: usize,
    /// Items currently retained
    pub queue_size: usize,
    /// Maximum items retained
    pub queue_bound: usize,
    /// Aggregate minimum demand (may be stale, see `SubscriberManager::cancel`)
    pub min_request: u64,
    /// Aggregate maximum demand (may be stale)
    pub max_request: u64,
    /// Lifetime counters
    pub counters: DeliveryCounters,
}

impl ManagerStats {
    /// Queue utilization as a percentage of the bound
    pub fn queue_utilization(&self) -> f32 {
        if self.queue_bound > 0 {
            (self.queue_size as f32 / self.queue_bound as f32) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_default() {
        let counters = DeliveryCounters::default();
        assert_eq!(counters.items_published, 0);
        assert_eq!(counters.items_dropped, 0);
        assert_eq!(counters.total_deliveries(), 0);
    }

    #[test]
    fn test_total_deliveries() {
        let counters = DeliveryCounters {
            direct_deliveries: 7,
            backlog_deliveries: 3,
            ..Default::default()
        };

        assert_eq!(counters.total_deliveries(), 10);
    }

    #[test]
    fn test_queue_utilization() {
        let stats = ManagerStats {
            queue_size: 5,
            queue_bound: 10,
            ..Default::default()
        };

        assert!((stats.queue_utilization() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_queue_utilization_zero_bound() {
        let stats = ManagerStats::default();

        assert_eq!(stats.queue_utilization(), 0.0);
    }
}
