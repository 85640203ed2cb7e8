// Guarded refresh cycle per domain: fetch, replace snapshot, persist, notify

use crate::api_client::ApiClient;
use crate::cache_store::CacheStore;
use crate::error::{Result, SyncError};
use crate::models::{Domain, Snapshot, join_services, service_username, sort_notifications};
use crate::ui_state::{ServerStatus, ToastLevel, UiState};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh of the domain was in flight.
    Skipped,
    Updated,
    /// Fetch failed; a durable snapshot is being served (offline mode).
    Degraded,
    /// Fetch failed and nothing usable was cached.
    Failed,
    /// Fetch failed; the in-memory snapshot was kept.
    KeptCached,
    /// A refresh started later already applied its result; this one was dropped.
    Superseded,
}

/// Clears the domain's in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct FetchReconciler {
    api: Arc<ApiClient>,
    cache: Arc<CacheStore>,
    ui: Arc<UiState>,
    in_flight: [AtomicBool; 4],
    /// Per-domain refresh ticket, taken when a fetch starts.
    next_seq: [AtomicU64; 4],
    /// Per-domain ticket of the last result written to the cache.
    applied_seq: [Mutex<u64>; 4],
}

impl FetchReconciler {
    pub fn new(api: Arc<ApiClient>, cache: Arc<CacheStore>, ui: Arc<UiState>) -> Self {
        Self {
            api,
            cache,
            ui,
            in_flight: Default::default(),
            next_seq: Default::default(),
            applied_seq: Default::default(),
        }
    }

    pub fn is_in_flight(&self, domain: Domain) -> bool {
        self.in_flight[domain.index()].load(Ordering::Acquire)
    }

    /// Refreshes one domain. Without `force`, a refresh already in flight
    /// makes this a no-op. `force` also evicts the current snapshot first.
    #[instrument(skip(self))]
    pub async fn refresh(&self, domain: Domain, force: bool) -> RefreshOutcome {
        let flag = &self.in_flight[domain.index()];
        let acquired = !flag.swap(true, Ordering::AcqRel);
        if !acquired && !force {
            tracing::debug!("refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        // A forced refresh overlapping a running one leaves the flag to its owner.
        let _guard = acquired.then(|| InFlightGuard(flag));

        if force {
            self.cache.evict(domain).await;
        }

        let seq = self.next_seq[domain.index()].fetch_add(1, Ordering::AcqRel) + 1;
        // The indicator belongs to the flag owner.
        if acquired {
            self.ui.set_loading(domain, true);
        }
        let outcome = match self.fetch(domain).await {
            Ok(snapshot) => self.apply(snapshot, seq).await,
            Err(e) => self.recover(domain, e, seq).await,
        };
        if acquired {
            self.ui.set_loading(domain, false);
        }
        outcome
    }

    async fn fetch(&self, domain: Domain) -> Result<Snapshot> {
        let snapshot = match domain {
            Domain::Users => Snapshot::Users(self.api.users().await?),
            Domain::Services => Snapshot::Services(self.api.services_status().await?),
            Domain::Stats => Snapshot::Stats(Box::new(self.api.stats().await?)),
            Domain::Notifications => {
                let mut notifications = self.api.check_notifications().await?;
                sort_notifications(&mut notifications);
                Snapshot::Notifications(notifications)
            }
        };
        Ok(snapshot)
    }

    /// Writes a fetched snapshot unless a refresh that started later has
    /// already written its own.
    async fn apply(&self, snapshot: Snapshot, seq: u64) -> RefreshOutcome {
        let domain = snapshot.domain();
        let mut applied = self.applied_seq[domain.index()].lock().await;
        if *applied > seq {
            tracing::debug!(seq, applied = *applied, "dropping result of superseded refresh");
            return RefreshOutcome::Superseded;
        }
        *applied = seq;
        let timestamp = Utc::now();
        if let Snapshot::Stats(stats) = &snapshot {
            self.ui.set_server_status(if stats.server.fully_connected() {
                ServerStatus::Online
            } else {
                ServerStatus::Partial
            });
        }
        tracing::debug!(records = snapshot.len(), "snapshot replaced");
        self.cache.persist(&snapshot, timestamp).await;
        self.cache.set(snapshot, timestamp).await;
        drop(applied);
        self.ui.set_degraded(domain, false);
        if matches!(domain, Domain::Users | Domain::Services) {
            self.log_service_matches().await;
        }
        self.ui.domain_updated(domain);
        RefreshOutcome::Updated
    }

    async fn recover(&self, domain: Domain, error: SyncError, seq: u64) -> RefreshOutcome {
        if error.is_configuration() {
            tracing::error!(error = %error, operation = "refresh", "endpoint configuration error");
            return RefreshOutcome::Failed;
        }
        tracing::warn!(error = %error, operation = "refresh", "refresh failed");

        if self.cache.get_fresh(domain).await.is_some() {
            self.ui
                .toast(ToastLevel::Error, format!("Failed to refresh {domain}: {error}"));
            return RefreshOutcome::KeptCached;
        }

        if let Some(cached) = self.cache.load_durable(domain).await {
            let applied = self.applied_seq[domain.index()].lock().await;
            if *applied > seq {
                tracing::debug!(seq, "newer snapshot applied meanwhile; durable copy not loaded");
                return RefreshOutcome::Superseded;
            }
            tracing::info!(
                cached_at = %cached.timestamp,
                "serving durable snapshot (offline mode)"
            );
            self.cache.set(cached.snapshot, cached.timestamp).await;
            drop(applied);
            self.ui.set_degraded(domain, true);
            self.ui.toast(
                ToastLevel::Warning,
                format!("Using cached {domain} data (offline mode)"),
            );
            self.ui.domain_updated(domain);
            return RefreshOutcome::Degraded;
        }

        self.ui
            .toast(ToastLevel::Error, format!("Error loading {domain}: {error}"));
        self.ui.domain_updated(domain);
        RefreshOutcome::Failed
    }

    /// Debug trace of which service each user maps to.
    async fn log_service_matches(&self) {
        let (Some(Snapshot::Users(users)), Some(Snapshot::Services(services))) = (
            self.cache.get(Domain::Users).await,
            self.cache.get(Domain::Services).await,
        ) else {
            return;
        };
        let joined = join_services(&services, &users);
        for user in &users {
            let service = joined
                .iter()
                .find(|s| service_username(s).as_deref() == Some(user.username.as_str()));
            tracing::debug!(
                username = %user.username,
                port = user.port,
                service = service.map(|s| s.service_name.as_str()).unwrap_or("none"),
                "user-service match"
            );
        }
    }

    /// GET /api/health; drives the server status indicator.
    pub async fn check_health(&self) -> bool {
        match self.api.health().await {
            Ok(h) if h.is_healthy() => {
                if self.ui.server_status() != ServerStatus::Partial {
                    self.ui.set_server_status(ServerStatus::Online);
                }
                true
            }
            Ok(h) => {
                tracing::warn!(status = %h.status, "backend reports unhealthy");
                self.ui.set_server_status(ServerStatus::Partial);
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "check_health", "health check failed");
                self.ui.set_server_status(ServerStatus::Offline);
                self.ui.set_live(false);
                false
            }
        }
    }

    /// Daily traffic for the history chart.
    pub async fn load_traffic_history(&self, days: u32) -> bool {
        match self.api.traffic_history(days).await {
            Ok(history) => {
                if !history.is_empty() {
                    self.cache.set_daily_traffic(history).await;
                    self.ui.traffic_updated();
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "load_traffic_history", "traffic history failed");
                false
            }
        }
    }

    /// Recent notification history for the activity log.
    pub async fn load_activity_log(&self, limit: u32) -> bool {
        match self.api.notifications_history(limit).await {
            Ok(items) => {
                self.cache.set_activity(items).await;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "load_activity_log", "activity log failed");
                false
            }
        }
    }
}
