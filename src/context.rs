// Application context: owns every component, runs startup and teardown

use crate::api_client::{ActionResult, ApiClient, NewUser, ServiceAction};
use crate::cache_store::{CacheStore, Preferences};
use crate::config::AppConfig;
use crate::endpoints::EndpointResolver;
use crate::error::Result;
use crate::models::{Domain, Snapshot, UserSnapshot};
use crate::reconciler::{FetchReconciler, RefreshOutcome};
use crate::render;
use crate::scheduler::{self, PollIntervals, SchedulerHandle};
use crate::stream::StreamListener;
use crate::ui_state::{ToastLevel, UiState, View};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;

const TRAFFIC_HISTORY_DAYS: u32 = 7;
const ACTIVITY_LOG_LIMIT: u32 = 10;

struct Running {
    scheduler: SchedulerHandle,
    stream_shutdown: watch::Sender<bool>,
    stream_task: JoinHandle<()>,
}

pub struct AppContext {
    api: Arc<ApiClient>,
    cache: Arc<CacheStore>,
    ui: Arc<UiState>,
    reconciler: Arc<FetchReconciler>,
    stream: Arc<StreamListener>,
    intervals: PollIntervals,
    running: Mutex<Option<Running>>,
}

impl AppContext {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let endpoints = EndpointResolver::new(&config.server.base_url)?;
        let stream_url = endpoints.resolve("traffic.stream", None)?;
        let api = Arc::new(ApiClient::new(
            endpoints,
            Duration::from_secs(config.server.request_timeout_secs),
        )?);
        let cache = Arc::new(CacheStore::new(
            &config.cache.dir,
            Duration::from_secs(config.cache.staleness_secs),
        ));
        let ui = Arc::new(UiState::new(config.ui.event_capacity));
        let reconciler = Arc::new(FetchReconciler::new(api.clone(), cache.clone(), ui.clone()));
        let stream = Arc::new(StreamListener::new(
            stream_url,
            cache.clone(),
            ui.clone(),
            Duration::from_millis(config.stream.reconnect_delay_ms),
        )?);
        Ok(Self {
            api,
            cache,
            ui,
            reconciler,
            stream,
            intervals: PollIntervals::from(&config.polling),
            running: Mutex::new(None),
        })
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn ui(&self) -> &Arc<UiState> {
        &self.ui
    }

    pub fn reconciler(&self) -> &Arc<FetchReconciler> {
        &self.reconciler
    }

    pub fn stream(&self) -> &Arc<StreamListener> {
        &self.stream
    }

    /// Health check, initial load, then the stream and poll tasks. Returns
    /// whether the backend was reachable; background tasks start either way
    /// so the dashboard recovers once it comes back.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return true;
        }

        let connected = self.reconciler.check_health().await;
        if connected {
            self.load_dashboard().await;
            tokio::join!(
                self.reconciler.load_activity_log(ACTIVITY_LOG_LIMIT),
                self.reconciler.load_traffic_history(TRAFFIC_HISTORY_DAYS),
                self.reconciler.refresh(Domain::Notifications, false),
            );
        } else {
            self.ui.toast(
                ToastLevel::Error,
                "Cannot connect to API server. Please check if the server is running.",
            );
        }

        let (stream_shutdown, shutdown_rx) = watch::channel(false);
        let stream_task = self.stream.clone().spawn(shutdown_rx);
        let scheduler = scheduler::spawn(self.reconciler.clone(), self.intervals);
        tracing::info!(
            connected,
            poll_tasks = scheduler.task_count(),
            "synchronizer started"
        );
        *running = Some(Running {
            scheduler,
            stream_shutdown,
            stream_task,
        });
        connected
    }

    /// Stats, users and services concurrently.
    pub async fn load_dashboard(&self) {
        tokio::join!(
            self.reconciler.refresh(Domain::Stats, false),
            self.reconciler.refresh(Domain::Users, false),
            self.reconciler.refresh(Domain::Services, false),
        );
    }

    /// User-triggered refresh: bypasses the in-flight guard and evicts first.
    pub async fn refresh(&self, domain: Domain) -> RefreshOutcome {
        self.reconciler.refresh(domain, true).await
    }

    pub async fn switch_view(&self, view: View) {
        self.ui.switch_view(view);
        if view == View::Services {
            self.reconciler.refresh(Domain::Services, false).await;
        }
    }

    /// Stops poll tasks and the stream listener and waits for them.
    pub async fn shutdown(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.scheduler.shutdown().await;
        let _ = running.stream_shutdown.send(true);
        if let Err(e) = running.stream_task.await {
            tracing::warn!(error = %e, "stream task ended abnormally");
        }
        tracing::info!("synchronizer stopped");
    }

    async fn after_mutation(
        &self,
        what: &str,
        result: Result<ActionResult>,
        domains: &[Domain],
    ) -> Result<ActionResult> {
        match result {
            Ok(r) => {
                let message = r.message.clone().unwrap_or_else(|| format!("{what} succeeded"));
                self.ui.toast(ToastLevel::Success, message);
                for &domain in domains {
                    self.reconciler.refresh(domain, true).await;
                }
                Ok(r)
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = what, "mutation failed");
                self.ui.toast(ToastLevel::Error, format!("{what} failed: {e}"));
                Err(e)
            }
        }
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<ActionResult> {
        let r = self.api.create_user(user).await;
        self.after_mutation("create user", r, &[Domain::Users, Domain::Services, Domain::Stats])
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<ActionResult> {
        let r = self.api.delete_user(id).await;
        self.after_mutation("delete user", r, &[Domain::Users, Domain::Services, Domain::Stats])
            .await
    }

    pub async fn reset_traffic(&self, id: &str) -> Result<ActionResult> {
        let r = self.api.reset_traffic(id).await;
        self.after_mutation("reset traffic", r, &[Domain::Users, Domain::Stats])
            .await
    }

    pub async fn extend_user(&self, id: &str, additional_days: u32) -> Result<ActionResult> {
        let r = self.api.extend_user(id, additional_days).await;
        self.after_mutation("extend user", r, &[Domain::Users]).await
    }

    pub async fn toggle_service(&self, id: &str, enable: bool) -> Result<ActionResult> {
        let r = self.api.toggle_service(id, enable).await;
        self.after_mutation("toggle service", r, &[Domain::Users, Domain::Services])
            .await
    }

    pub async fn control_service(&self, service: &str, action: ServiceAction) -> Result<ActionResult> {
        let r = self.api.control_service(service, action).await;
        self.after_mutation("service control", r, &[Domain::Services])
            .await
    }

    pub async fn sync_services(&self) -> Result<ActionResult> {
        let r = self.api.sync_services().await;
        self.after_mutation("sync services", r, &[Domain::Services]).await
    }

    pub async fn restart_all_services(&self) -> Result<ActionResult> {
        let r = self.api.restart_all_services().await;
        self.after_mutation("restart all services", r, &[Domain::Services])
            .await
    }

    pub async fn reload_all_services(&self) -> Result<ActionResult> {
        let r = self.api.reload_all_services().await;
        self.after_mutation("reload all services", r, &[Domain::Services])
            .await
    }

    pub async fn initialize_admin(&self) -> Result<ActionResult> {
        let r = self.api.initialize_admin().await;
        self.after_mutation("initialize admin", r, &[Domain::Users, Domain::Services])
            .await
    }

    pub async fn preferences(&self) -> Preferences {
        self.cache.load_preferences().await
    }

    pub async fn set_preferences(&self, prefs: Preferences) {
        if let Err(e) = self.cache.save_preferences(prefs).await {
            tracing::warn!(error = %e, operation = "save_preferences", "failed to save preferences");
        }
    }

    /// Renders `view` from the cache; stale snapshots render as missing.
    pub async fn render(&self, view: View) -> String {
        let users = match self.cache.get_fresh(Domain::Users).await {
            Some(Snapshot::Users(u)) => Some(u),
            _ => None,
        };
        let mut sections = vec![render::render_server_status(
            self.ui.server_status(),
            self.ui.is_live(),
            self.ui.is_offline(),
        )];
        match view {
            View::Dashboard => {
                if let Some(Snapshot::Stats(stats)) = self.cache.get_fresh(Domain::Stats).await {
                    sections.push(render::render_stats(&stats));
                }
                sections.push(self.render_services(users.as_deref().unwrap_or_default()).await);
                sections.push(match &users {
                    Some(u) => render::render_users(u),
                    None => "Users unavailable".to_string(),
                });
                sections.push(render::render_live_traffic(&self.cache.traffic().await.users));
                sections.push(render::render_activity_log(&self.cache.activity().await));
            }
            View::Users => sections.push(match &users {
                Some(u) => render::render_users(u),
                None => "Users unavailable".to_string(),
            }),
            View::Services => {
                if let Some(Snapshot::Services(s)) = self.cache.get_fresh(Domain::Services).await {
                    sections.push(render::render_services_summary(&s));
                }
                sections.push(self.render_services(users.as_deref().unwrap_or_default()).await);
            }
            View::Notifications => {
                sections.push(match self.cache.get_fresh(Domain::Notifications).await {
                    Some(Snapshot::Notifications(n)) => render::render_notifications(&n),
                    _ => render::NO_NOTIFICATIONS.to_string(),
                });
            }
            View::Traffic => {
                let traffic = self.cache.traffic().await;
                sections.push(render::render_live_traffic(&traffic.users));
                sections.push(render::render_traffic_history(&traffic.daily));
            }
        }
        sections.join("\n\n")
    }

    async fn render_services(&self, users: &[UserSnapshot]) -> String {
        match self.cache.get_fresh(Domain::Services).await {
            Some(Snapshot::Services(s)) => render::render_services_overview(&s, users),
            _ => "Services unavailable".to_string(),
        }
    }
}
