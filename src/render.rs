// Pure text rendering of cached state. No I/O; callers pass the snapshots in.

use crate::models::{
    DailyTraffic, LiveTrafficUser, Notification, ServiceSnapshot, ServicesSummary, StatsSnapshot,
    UserSnapshot, join_services, sort_notifications,
};
use crate::ui_state::ServerStatus;
use chrono::DateTime;
use std::fmt;

const BAR_WIDTH: usize = 20;
const TRAFFIC_WARN_PERCENT: f64 = 80.0;
const DAYS_WARN: i64 = 7;

pub const NO_USERS: &str = "No users found. Add a user to get started.";
pub const NO_SERVICES: &str = "No services found. Add a user to create a service.";
pub const NO_NOTIFICATIONS: &str = "No notifications";
pub const NO_TRAFFIC: &str = "No traffic data";
pub const NO_ACTIVITY: &str = "No recent activity";

/// 20 -> "20", 33.333 -> "33.3".
pub fn format_number(v: f64) -> String {
    let rounded = (v * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Fixed-width bar, e.g. "[####----------------]".
pub fn traffic_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn format_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    raw.get(..10).unwrap_or(raw).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Active,
    Inactive,
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusIndicator::Active => f.write_str("● Active"),
            StatusIndicator::Inactive => f.write_str("○ Inactive"),
        }
    }
}

/// One row of the users table.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub port: u16,
    pub service_name: String,
    pub traffic_label: String,
    /// Usage clamped to 0..=100.
    pub traffic_percent: f64,
    pub traffic_high: bool,
    pub bar: String,
    pub expires: String,
    pub days_left: Option<i64>,
    pub days_warning: bool,
    pub status: StatusIndicator,
}

impl UserRow {
    pub fn from_user(user: &UserSnapshot) -> Self {
        let traffic_percent = user.usage_percent().clamp(0.0, 100.0);
        let days_left = user.days_remaining;
        Self {
            username: user.username.clone(),
            email: user.email.clone().filter(|e| !e.is_empty()),
            is_admin: user.is_admin(),
            port: user.port,
            service_name: user
                .service_name
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            traffic_label: format!(
                "{} / {} GB",
                format_number(user.traffic_used_gb),
                format_number(user.traffic_limit_gb)
            ),
            traffic_percent,
            traffic_high: traffic_percent > TRAFFIC_WARN_PERCENT,
            bar: traffic_bar(traffic_percent),
            expires: user
                .expires_at
                .as_deref()
                .map(format_date)
                .unwrap_or_else(|| "Never".to_string()),
            days_left,
            days_warning: days_left.is_some_and(|d| d < DAYS_WARN),
            status: if user.enable {
                StatusIndicator::Active
            } else {
                StatusIndicator::Inactive
            },
        }
    }
}

impl fmt::Display for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16} {:>5}  {} {} {:>5}%", self.username, self.port, self.traffic_label, self.bar, format_number(self.traffic_percent))?;
        if self.traffic_high {
            f.write_str(" !")?;
        }
        write!(f, "  expires {}", self.expires)?;
        if let Some(days) = self.days_left {
            write!(f, " ({} days left{})", days, if self.days_warning { " !" } else { "" })?;
        }
        write!(f, "  {}", self.status)?;
        if self.is_admin {
            f.write_str("  [admin]")?;
        }
        Ok(())
    }
}

pub fn render_users(users: &[UserSnapshot]) -> String {
    if users.is_empty() {
        return NO_USERS.to_string();
    }
    users
        .iter()
        .map(|u| UserRow::from_user(u).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One card of the services overview, port mirrored from users when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCard {
    pub service_name: String,
    pub username: String,
    pub port: String,
    pub running: bool,
    pub enabled: bool,
}

impl ServiceCard {
    pub fn from_service(service: &ServiceSnapshot) -> Self {
        Self {
            service_name: service.service_name.clone(),
            username: service
                .username
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            port: service
                .port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            running: service.active,
            enabled: service.enabled,
        }
    }
}

impl fmt::Display for ServiceCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<36} {:<9} user {:<16} port {:<6} enabled {}",
            self.service_name,
            if self.running { "Running" } else { "Stopped" },
            self.username,
            self.port,
            if self.enabled { "Yes" } else { "No" }
        )
    }
}

/// Services overview; an empty list is a normal state, not an error.
pub fn render_services_overview(services: &[ServiceSnapshot], users: &[UserSnapshot]) -> String {
    if services.is_empty() {
        return NO_SERVICES.to_string();
    }
    join_services(services, users)
        .iter()
        .map(|s| ServiceCard::from_service(s).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_services_summary(services: &[ServiceSnapshot]) -> String {
    let s = ServicesSummary::from_services(services);
    format!(
        "Running {}  Stopped {}  Total {}  Health {}%",
        s.running, s.stopped, s.total, s.health_score
    )
}

fn notification_line(n: &Notification) -> String {
    let mut line = format!(
        "[{}] {}",
        n.kind.title(),
        n.message.as_deref().unwrap_or("No message")
    );
    if let Some(user) = &n.username {
        line.push_str(&format!(" (user: {user})"));
    }
    if let Some(days) = n.days_left {
        line.push_str(&format!(" - {days} days left"));
    }
    if let Some(p) = n.usage_percent {
        line.push_str(&format!(" - {}% used", format_number(p)));
    }
    line
}

/// Notifications sorted by severity then recency, with a count header.
pub fn render_notifications(notifications: &[Notification]) -> String {
    if notifications.is_empty() {
        return NO_NOTIFICATIONS.to_string();
    }
    let mut sorted = notifications.to_vec();
    sort_notifications(&mut sorted);
    let mut out = format!("Notifications ({})", sorted.len());
    for n in &sorted {
        out.push('\n');
        out.push_str(&notification_line(n));
    }
    out
}

pub fn render_stats(stats: &StatsSnapshot) -> String {
    format!(
        "Users {} ({} active)  Traffic {} / {} GB ({}% used)  Services {} ({} running)  CPU {}%  Memory {}%  Server {}",
        stats.users.total,
        stats.users.active,
        format_number(stats.traffic.total_used_gb),
        format_number(stats.traffic.total_limit_gb),
        format_number(stats.traffic.percent_used()),
        stats.services.total_services,
        stats.services.active_services,
        format_number(stats.system.cpu_usage),
        format_number(stats.system.memory_usage),
        stats.server.ip.as_deref().unwrap_or("Unknown"),
    )
}

pub fn render_live_traffic(users: &[LiveTrafficUser]) -> String {
    if users.is_empty() {
        return NO_TRAFFIC.to_string();
    }
    users
        .iter()
        .map(|u| {
            format!(
                "{:<16} port {:<6} {} GB / {} GB limit",
                u.username.as_deref().unwrap_or("Unknown"),
                u.port.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string()),
                format_number(u.traffic_used_gb),
                format_number(u.traffic_limit_gb)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_traffic_history(days: &[DailyTraffic]) -> String {
    if days.is_empty() {
        return NO_TRAFFIC.to_string();
    }
    let max = days
        .iter()
        .map(|d| d.total_used_gb)
        .fold(0.0_f64, f64::max);
    days.iter()
        .map(|d| {
            let percent = if max > 0.0 { d.total_used_gb / max * 100.0 } else { 0.0 };
            format!("{} {} {} GB", d.date, traffic_bar(percent), format_number(d.total_used_gb))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_activity_log(items: &[Notification]) -> String {
    if items.is_empty() {
        return NO_ACTIVITY.to_string();
    }
    items
        .iter()
        .map(|n| {
            let time = n
                .parsed_timestamp()
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            format!(
                "{}  {:<16} {:<12} {}",
                time,
                n.username.as_deref().unwrap_or("System"),
                n.kind.title(),
                n.message.as_deref().unwrap_or("No message")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_server_status(status: ServerStatus, live: bool, offline: bool) -> String {
    let server = match status {
        ServerStatus::Online => "Online",
        ServerStatus::Partial => "Partial",
        ServerStatus::Offline => "Offline",
        ServerStatus::Unknown => "Checking",
    };
    let mut line = format!(
        "Server: {}  Real-time: {}",
        server,
        if live { "Connected" } else { "Disconnected" }
    );
    if offline {
        line.push_str("  (offline mode: cached data)");
    }
    line
}
