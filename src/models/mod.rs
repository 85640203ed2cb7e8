// Domain models mirrored from the admin API JSON

mod domain;
mod notification;
mod service;
mod stats;
mod traffic;
mod user;

pub use domain::{Domain, Snapshot};
pub use notification::{Notification, NotificationKind, sort_notifications};
pub use service::{ServiceSnapshot, ServicesSummary, join_services, service_username};
pub use stats::{
    HealthStatus, ServerStats, ServiceCounts, StatsSnapshot, SystemLoad, TrafficTotals, UserCounts,
};
pub use traffic::{
    DailyTraffic, LiveTrafficUser, StreamMessage, TrafficPoint, TrafficState, TrafficUpdate,
};
pub use user::UserSnapshot;
