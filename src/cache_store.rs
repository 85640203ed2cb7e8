// Last-known snapshots per domain: in memory, plus best-effort JSON files for offline use

use crate::error::Result;
use crate::models::{DailyTraffic, Domain, Notification, Snapshot, TrafficState, TrafficUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const PREFERENCES_FILE: &str = "preferences.json";

/// A snapshot and the time it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSnapshot {
    pub snapshot: Snapshot,
    pub timestamp: DateTime<Utc>,
}

/// On-disk shape: `{data, timestamp}`.
#[derive(Debug, Serialize, Deserialize)]
struct DurableEntry {
    data: Snapshot,
    timestamp: DateTime<Utc>,
}

/// Export toggles persisted across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub auto_backup: bool,
    #[serde(default)]
    pub auto_report: bool,
}

pub struct CacheStore {
    dir: PathBuf,
    staleness: chrono::Duration,
    snapshots: RwLock<HashMap<Domain, CachedSnapshot>>,
    traffic: RwLock<TrafficState>,
    activity: RwLock<Vec<Notification>>,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, staleness: std::time::Duration) -> Self {
        let staleness = chrono::Duration::from_std(staleness).unwrap_or(chrono::Duration::hours(1));
        Self {
            dir: dir.into(),
            staleness,
            snapshots: RwLock::new(HashMap::new()),
            traffic: RwLock::new(TrafficState::default()),
            activity: RwLock::new(Vec::new()),
        }
    }

    fn domain_path(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}.json", domain.as_str()))
    }

    pub async fn get(&self, domain: Domain) -> Option<Snapshot> {
        self.snapshots
            .read()
            .await
            .get(&domain)
            .map(|c| c.snapshot.clone())
    }

    /// Snapshot if present and fresh; a stale one is evicted and None returned.
    pub async fn get_fresh(&self, domain: Domain) -> Option<Snapshot> {
        self.get_fresh_at(domain, Utc::now()).await
    }

    pub async fn get_fresh_at(&self, domain: Domain, now: DateTime<Utc>) -> Option<Snapshot> {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.get(&domain) {
            Some(c) if now - c.timestamp <= self.staleness => Some(c.snapshot.clone()),
            Some(_) => {
                tracing::debug!(domain = %domain, "evicting stale snapshot");
                snapshots.remove(&domain);
                None
            }
            None => None,
        }
    }

    /// Replaces the snapshot for its domain wholesale.
    pub async fn set(&self, snapshot: Snapshot, timestamp: DateTime<Utc>) {
        let domain = snapshot.domain();
        self.snapshots
            .write()
            .await
            .insert(domain, CachedSnapshot { snapshot, timestamp });
    }

    pub async fn evict(&self, domain: Domain) -> Option<CachedSnapshot> {
        self.snapshots.write().await.remove(&domain)
    }

    pub async fn is_stale(&self, domain: Domain) -> bool {
        self.is_stale_at(domain, Utc::now()).await
    }

    /// True when no snapshot exists or it is older than the staleness threshold.
    pub async fn is_stale_at(&self, domain: Domain, now: DateTime<Utc>) -> bool {
        match self.snapshots.read().await.get(&domain) {
            Some(c) => now - c.timestamp > self.staleness,
            None => true,
        }
    }

    /// Writes `{data, timestamp}` for the snapshot's domain. Failures are
    /// logged and swallowed: the file is a convenience, not a source of truth.
    pub async fn persist(&self, snapshot: &Snapshot, timestamp: DateTime<Utc>) {
        let domain = snapshot.domain();
        let entry = DurableEntry {
            data: snapshot.clone(),
            timestamp,
        };
        if let Err(e) = self.write_json(&self.domain_path(domain), &entry).await {
            tracing::warn!(
                error = %e,
                operation = "persist_snapshot",
                domain = %domain,
                "failed to persist snapshot"
            );
        }
    }

    /// Most recent durable snapshot if younger than the staleness threshold.
    pub async fn load_durable(&self, domain: Domain) -> Option<CachedSnapshot> {
        self.load_durable_at(domain, Utc::now()).await
    }

    pub async fn load_durable_at(&self, domain: Domain, now: DateTime<Utc>) -> Option<CachedSnapshot> {
        let path = self.domain_path(domain);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = %e, operation = "load_durable", domain = %domain, "failed to read durable snapshot");
                return None;
            }
        };
        let entry: DurableEntry = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, operation = "load_durable", domain = %domain, "corrupt durable snapshot");
                return None;
            }
        };
        if entry.data.domain() != domain {
            tracing::warn!(domain = %domain, "durable snapshot holds another domain");
            return None;
        }
        if now - entry.timestamp >= self.staleness {
            tracing::debug!(domain = %domain, "durable snapshot too old");
            return None;
        }
        Some(CachedSnapshot {
            snapshot: entry.data,
            timestamp: entry.timestamp,
        })
    }

    pub async fn traffic(&self) -> TrafficState {
        self.traffic.read().await.clone()
    }

    /// Replaces the live history and per-user list; daily totals are kept.
    pub async fn apply_traffic_update(&self, update: TrafficUpdate) {
        let mut traffic = self.traffic.write().await;
        traffic.history = update.history;
        traffic.users = update.users;
    }

    pub async fn set_daily_traffic(&self, daily: Vec<DailyTraffic>) {
        self.traffic.write().await.daily = daily;
    }

    /// Recent notification history shown as the activity log.
    pub async fn activity(&self) -> Vec<Notification> {
        self.activity.read().await.clone()
    }

    pub async fn set_activity(&self, activity: Vec<Notification>) {
        *self.activity.write().await = activity;
    }

    pub async fn load_preferences(&self) -> Preferences {
        let path = self.dir.join(PREFERENCES_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, operation = "load_preferences", "corrupt preferences file");
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        }
    }

    pub async fn save_preferences(&self, prefs: Preferences) -> Result<()> {
        self.write_json(&self.dir.join(PREFERENCES_FILE), &prefs).await
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
