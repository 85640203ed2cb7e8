use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Admin API origin, e.g. "http://127.0.0.1:5000".
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Per-domain poll intervals (seconds).
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_users_secs")]
    pub users_secs: u64,
    #[serde(default = "default_stats_secs")]
    pub stats_secs: u64,
    #[serde(default = "default_services_secs")]
    pub services_secs: u64,
    #[serde(default = "default_notifications_secs")]
    pub notifications_secs: u64,
    #[serde(default = "default_health_secs")]
    pub health_secs: u64,
}

fn default_users_secs() -> u64 {
    30
}

fn default_stats_secs() -> u64 {
    30
}

fn default_services_secs() -> u64 {
    60
}

fn default_notifications_secs() -> u64 {
    300
}

fn default_health_secs() -> u64 {
    60
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            users_secs: default_users_secs(),
            stats_secs: default_stats_secs(),
            services_secs: default_services_secs(),
            notifications_secs: default_notifications_secs(),
            health_secs: default_health_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Fixed delay before reconnecting the traffic stream.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory for durable snapshots and preferences.
    pub dir: String,
    /// Age after which a snapshot is no longer trusted.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
}

fn default_staleness_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Max number of UI events kept in the broadcast channel (slow renderers may lag).
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        crate::endpoints::normalize_base_url(&self.server.base_url)
            .map_err(|e| anyhow::anyhow!("server.base_url: {}", e))?;
        anyhow::ensure!(
            self.server.request_timeout_secs > 0,
            "server.request_timeout_secs must be > 0, got {}",
            self.server.request_timeout_secs
        );
        let polling = [
            ("polling.users_secs", self.polling.users_secs),
            ("polling.stats_secs", self.polling.stats_secs),
            ("polling.services_secs", self.polling.services_secs),
            ("polling.notifications_secs", self.polling.notifications_secs),
            ("polling.health_secs", self.polling.health_secs),
        ];
        for (name, value) in polling {
            anyhow::ensure!(value > 0, "{} must be > 0, got {}", name, value);
        }
        anyhow::ensure!(
            self.stream.reconnect_delay_ms > 0,
            "stream.reconnect_delay_ms must be > 0, got {}",
            self.stream.reconnect_delay_ms
        );
        anyhow::ensure!(!self.cache.dir.is_empty(), "cache.dir must be non-empty");
        anyhow::ensure!(
            self.cache.staleness_secs > 0,
            "cache.staleness_secs must be > 0, got {}",
            self.cache.staleness_secs
        );
        anyhow::ensure!(
            self.ui.event_capacity > 0,
            "ui.event_capacity must be > 0, got {}",
            self.ui.event_capacity
        );
        Ok(())
    }
}
