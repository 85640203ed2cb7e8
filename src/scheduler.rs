// Periodic refresh tasks, one per domain plus the health check.
// Ticks never force, so the reconciler's in-flight guard absorbs overlaps with manual refreshes.

use crate::config::PollingConfig;
use crate::models::Domain;
use crate::reconciler::FetchReconciler;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::Instrument;

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub users: Duration,
    pub stats: Duration,
    pub services: Duration,
    pub notifications: Duration,
    pub health: Duration,
}

impl From<&PollingConfig> for PollIntervals {
    fn from(c: &PollingConfig) -> Self {
        Self {
            users: Duration::from_secs(c.users_secs),
            stats: Duration::from_secs(c.stats_secs),
            services: Duration::from_secs(c.services_secs),
            notifications: Duration::from_secs(c.notifications_secs),
            health: Duration::from_secs(c.health_secs),
        }
    }
}

impl PollIntervals {
    pub fn for_domain(&self, domain: Domain) -> Duration {
        match domain {
            Domain::Users => self.users,
            Domain::Services => self.services,
            Domain::Stats => self.stats,
            Domain::Notifications => self.notifications,
        }
    }
}

/// Owns the poll tasks; `shutdown` stops and joins them.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "poll task ended abnormally");
            }
        }
        tracing::debug!("Poll scheduler stopped");
    }
}

/// Starts one task per domain and one for health. First ticks fire one
/// interval after start; the initial load is the caller's job.
pub fn spawn(reconciler: Arc<FetchReconciler>, intervals: PollIntervals) -> SchedulerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Domain::ALL
        .iter()
        .map(|&domain| {
            spawn_domain_poller(
                reconciler.clone(),
                domain,
                intervals.for_domain(domain),
                shutdown_rx.clone(),
            )
        })
        .collect();
    tasks.push(spawn_health_poller(reconciler, intervals.health, shutdown_rx));
    SchedulerHandle { shutdown_tx, tasks }
}

fn spawn_domain_poller(
    reconciler: Arc<FetchReconciler>,
    domain: Domain,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    tokio::select! {
                        outcome = reconciler.refresh(domain, false) => {
                            tracing::trace!(?outcome, "poll tick");
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    }
    .instrument(tracing::debug_span!("poller", domain = %domain)))
}

fn spawn_health_poller(
    reconciler: Arc<FetchReconciler>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    tokio::select! {
                        healthy = reconciler.check_health() => {
                            tracing::trace!(healthy, "health tick");
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    })
}
