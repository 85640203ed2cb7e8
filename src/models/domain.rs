// Data domains and the wholesale snapshot stored per domain

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Notification, ServiceSnapshot, StatsSnapshot, UserSnapshot};

/// One independently polled and cached data category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Users,
    Services,
    Stats,
    Notifications,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Users,
        Domain::Services,
        Domain::Stats,
        Domain::Notifications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Users => "users",
            Domain::Services => "services",
            Domain::Stats => "stats",
            Domain::Notifications => "notifications",
        }
    }

    /// Dense index for per-domain flag arrays.
    pub fn index(self) -> usize {
        match self {
            Domain::Users => 0,
            Domain::Services => 1,
            Domain::Stats => 2,
            Domain::Notifications => 3,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-known server state of one domain. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "items", rename_all = "lowercase")]
pub enum Snapshot {
    Users(Vec<UserSnapshot>),
    Services(Vec<ServiceSnapshot>),
    Stats(Box<StatsSnapshot>),
    Notifications(Vec<Notification>),
}

impl Snapshot {
    pub fn domain(&self) -> Domain {
        match self {
            Snapshot::Users(_) => Domain::Users,
            Snapshot::Services(_) => Domain::Services,
            Snapshot::Stats(_) => Domain::Stats,
            Snapshot::Notifications(_) => Domain::Notifications,
        }
    }

    /// Number of records carried (1 for stats).
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Users(u) => u.len(),
            Snapshot::Services(s) => s.len(),
            Snapshot::Stats(_) => 1,
            Snapshot::Notifications(n) => n.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
