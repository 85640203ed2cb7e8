// VPN account as returned by GET /api/users

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub traffic_used_gb: f64,
    #[serde(default)]
    pub traffic_limit_gb: f64,
    /// Server-computed usage; may be absent on older backends.
    #[serde(default)]
    pub traffic_percent: Option<f64>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub days_remaining: Option<i64>,
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
}

fn default_enable() -> bool {
    true
}

impl UserSnapshot {
    /// Usage percent, derived from used/limit when the server omitted it.
    pub fn usage_percent(&self) -> f64 {
        match self.traffic_percent {
            Some(p) => p,
            None if self.traffic_limit_gb > 0.0 => {
                self.traffic_used_gb / self.traffic_limit_gb * 100.0
            }
            None => 0.0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}
