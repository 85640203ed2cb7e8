// Account notifications and their display ordering

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Expired,
    ExpireSoon,
    TrafficHigh,
    Info,
    #[serde(other)]
    Unknown,
}

impl NotificationKind {
    /// Severity rank: lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            NotificationKind::Expired => 0,
            NotificationKind::ExpireSoon => 1,
            NotificationKind::TrafficHigh => 2,
            NotificationKind::Info => 3,
            NotificationKind::Unknown => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            NotificationKind::Expired => "Account Expired",
            NotificationKind::ExpireSoon => "Expiring Soon",
            NotificationKind::TrafficHigh => "High Traffic Usage",
            NotificationKind::Info | NotificationKind::Unknown => "Information",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type", alias = "notification_type", default = "default_kind")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub days_left: Option<i64>,
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

impl Notification {
    /// Parsed timestamp; accepts RFC 3339 and the backend's naive UTC ISO form.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

fn display_order(a: &Notification, b: &Notification) -> Ordering {
    a.kind.rank().cmp(&b.kind.rank()).then_with(|| {
        // Newest first; a missing timestamp counts as oldest.
        let at = a.parsed_timestamp().map(|t| t.timestamp_millis()).unwrap_or(0);
        let bt = b.parsed_timestamp().map(|t| t.timestamp_millis()).unwrap_or(0);
        bt.cmp(&at)
    })
}

/// Sorts by severity (expired, expire_soon, traffic_high, info) then recency.
/// The backend does not guarantee order, so this runs on every update.
pub fn sort_notifications(notifications: &mut [Notification]) {
    notifications.sort_by(display_order);
}
