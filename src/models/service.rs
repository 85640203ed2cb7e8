// Per-user systemd service status and the best-effort join against users

use serde::{Deserialize, Serialize};

use super::UserSnapshot;

const SERVICE_PREFIX: &str = "shadowsocks-";
const SERVICE_SUFFIX: &str = ".service";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub service_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub method: Option<String>,
}

/// Owner name of a service: explicit `username`, else parsed from
/// `shadowsocks-<name>.service`.
pub fn service_username(service: &ServiceSnapshot) -> Option<String> {
    if let Some(name) = service.username.as_deref().filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    let name = service
        .service_name
        .strip_prefix(SERVICE_PREFIX)
        .unwrap_or(&service.service_name);
    let name = name.strip_suffix(SERVICE_SUFFIX).unwrap_or(name);
    (!name.is_empty()).then(|| name.to_string())
}

fn find_user<'a>(service: &ServiceSnapshot, users: &'a [UserSnapshot]) -> Option<&'a UserSnapshot> {
    if let Some(name) = service.username.as_deref()
        && let Some(user) = users.iter().find(|u| u.username == name)
    {
        return Some(user);
    }
    let extracted = service_username(service)?;
    users.iter().find(|u| u.username == extracted)
}

/// Fills `username`, `port` and `method` from the matching user where the
/// service left them empty. Unmatched services are returned unchanged.
pub fn join_services(services: &[ServiceSnapshot], users: &[UserSnapshot]) -> Vec<ServiceSnapshot> {
    services
        .iter()
        .map(|service| {
            let mut joined = service.clone();
            if let Some(user) = find_user(service, users) {
                if joined.username.is_none() {
                    joined.username = Some(user.username.clone());
                }
                if joined.port.is_none() && user.port > 0 {
                    joined.port = Some(user.port);
                }
                if joined.method.is_none() {
                    joined.method = user.method.clone();
                }
            }
            joined
        })
        .collect()
}

/// Running/stopped counts shown on the services tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicesSummary {
    pub running: usize,
    pub stopped: usize,
    pub total: usize,
    /// Share of running services, rounded to whole percent.
    pub health_score: u32,
}

impl ServicesSummary {
    pub fn from_services(services: &[ServiceSnapshot]) -> Self {
        let total = services.len();
        let running = services.iter().filter(|s| s.active).count();
        let health_score = if total > 0 {
            ((running as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };
        Self {
            running,
            stopped: total - running,
            total,
            health_score,
        }
    }
}
