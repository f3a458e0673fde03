//! Simulator configuration.

use std::time::Duration;

use rendezvous_geometry::LatLng;
use rendezvous_sync::SortMode;

/// Configuration for one simulated session.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of participant clients besides the host.
    pub clients: usize,

    /// Seed for locations, venues and votes.
    pub seed: u64,

    /// Venue search keyword.
    pub keyword: String,

    /// City center the participants gather around.
    pub center: LatLng,

    /// Half-width of the box participants are scattered in.
    pub spread_km: f64,

    /// Venues in the searchable catalog.
    pub venue_count: usize,

    /// Radius slider setting used for the search.
    pub radius_km: f64,

    /// Restrict search results to the circle itself.
    pub only_in_circle: bool,

    /// Candidate order in the report.
    pub sort: SortMode,

    /// Upper bound on waiting for the meeting area to settle.
    pub settle_timeout: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clients: 5,
            seed: 42,
            keyword: "cafe".into(),
            center: LatLng::new(40.7128, -74.0060),
            spread_km: 2.0,
            venue_count: 60,
            radius_km: 2.0,
            only_in_circle: false,
            sort: SortMode::Votes,
            settle_timeout: Duration::from_secs(30),
        }
    }
}

impl SimConfig {
    #[must_use]
    pub fn with_clients(mut self, clients: usize) -> Self {
        self.clients = clients;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    /// Create config from environment variables with defaults.
    ///
    /// Reads `RENDEZVOUS_SIM_CLIENTS`, `RENDEZVOUS_SIM_SEED`,
    /// `RENDEZVOUS_SIM_KEYWORD` and `RENDEZVOUS_SIM_SORT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(clients) = env_parse("RENDEZVOUS_SIM_CLIENTS") {
            config.clients = clients;
        }
        if let Some(seed) = env_parse("RENDEZVOUS_SIM_SEED") {
            config.seed = seed;
        }
        if let Ok(keyword) = std::env::var("RENDEZVOUS_SIM_KEYWORD") {
            if !keyword.trim().is_empty() {
                config.keyword = keyword;
            }
        }
        if let Some(sort) = env_parse("RENDEZVOUS_SIM_SORT") {
            config.sort = sort;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
