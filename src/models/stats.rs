// Aggregate metrics from GET /api/stats and liveness from GET /api/health

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub db_status: Option<String>,
    #[serde(default)]
    pub manager_status: Option<String>,
}

impl ServerStats {
    /// Both backing stores reachable.
    pub fn fully_connected(&self) -> bool {
        self.db_status.as_deref() == Some("connected")
            && self.manager_status.as_deref() == Some("connected")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub active: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficTotals {
    #[serde(default)]
    pub total_used_gb: f64,
    #[serde(default)]
    pub total_limit_gb: f64,
}

impl TrafficTotals {
    pub fn percent_used(&self) -> f64 {
        if self.total_limit_gb > 0.0 {
            self.total_used_gb / self.total_limit_gb * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceCounts {
    #[serde(default)]
    pub total_services: u64,
    #[serde(default)]
    pub active_services: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub server: ServerStats,
    #[serde(default)]
    pub users: UserCounts,
    #[serde(default)]
    pub traffic: TrafficTotals,
    #[serde(default)]
    pub system: SystemLoad,
    #[serde(default)]
    pub services: ServiceCounts,
    #[serde(default)]
    pub admin_service: Option<String>,
}

/// Body of GET /api/health (not wrapped in the success envelope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
