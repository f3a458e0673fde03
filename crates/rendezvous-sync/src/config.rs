//! Synchronizer and hub configuration.

use std::time::Duration;

/// Configuration for a [`crate::Synchronizer`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Fixed delay before reopening a failed push stream.
    pub reconnect_delay: Duration,

    /// Buffer of the user-visible notice channel.
    pub notice_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(5000),
            notice_capacity: 64,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity.max(1);
        self
    }

    /// Read `RENDEZVOUS_RECONNECT_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = std::env::var("RENDEZVOUS_RECONNECT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        config
    }
}

/// Configuration for the in-memory [`crate::MemoryHub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-subscriber queue depth; a subscriber that falls further behind is dropped.
    pub subscriber_capacity: usize,

    /// Whether new events accept votes.
    pub allow_vote: bool,

    /// Offset bound for blurred participant locations.
    pub fuzz_radius_km: f64,

    /// Seed for the fuzzing RNG.
    pub seed: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 100,
            allow_vote: true,
            fuzz_radius_km: 0.5,
            seed: 0,
        }
    }
}

impl HubConfig {
    #[must_use]
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_allow_vote(mut self, allow_vote: bool) -> Self {
        self.allow_vote = allow_vote;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let sync = SyncConfig::default();
        assert_eq!(sync.reconnect_delay, Duration::from_secs(5));
        assert_eq!(sync.notice_capacity, 64);

        let hub = HubConfig::default();
        assert_eq!(hub.subscriber_capacity, 100);
        assert!(hub.allow_vote);
        assert_eq!(hub.fuzz_radius_km, 0.5);
    }

    #[test]
    fn capacities_never_zero() {
        assert_eq!(SyncConfig::default().with_notice_capacity(0).notice_capacity, 1);
        assert_eq!(HubConfig::default().with_subscriber_capacity(0).subscriber_capacity, 1);
    }
}
