// Traffic telemetry: SSE push payloads and daily history

use serde::{Deserialize, Serialize};

/// One aggregate point of the live chart, time-ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficPoint {
    pub timestamp: String,
    #[serde(default)]
    pub total_used_gb: f64,
    /// Per-user breakdown when the backend sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<LiveTrafficUser>>,
}

/// Per-user row of the live traffic list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveTrafficUser {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub traffic_used_gb: f64,
    #[serde(default)]
    pub traffic_limit_gb: f64,
}

fn default_enabled() -> bool {
    true
}

/// `data` of a `traffic_update` stream message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficUpdate {
    #[serde(default)]
    pub history: Vec<TrafficPoint>,
    #[serde(default)]
    pub users: Vec<LiveTrafficUser>,
}

/// Live traffic held by the cache; written only by the stream listener.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficState {
    pub history: Vec<TrafficPoint>,
    pub users: Vec<LiveTrafficUser>,
    /// Daily totals from GET /api/traffic/history.
    pub daily: Vec<DailyTraffic>,
}

/// One day of GET /api/traffic/history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTraffic {
    pub date: String,
    #[serde(default)]
    pub total_used_gb: f64,
    #[serde(default)]
    pub average_usage: f64,
    #[serde(default)]
    pub user_count: u64,
}

/// One JSON message of the traffic stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    TrafficUpdate {
        data: TrafficUpdate,
    },
    /// Backend-side failure while building an update.
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Other,
}
