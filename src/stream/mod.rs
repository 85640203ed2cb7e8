// Traffic stream: SSE connection state machine with fixed-delay reconnect.
// A generation counter turns timers armed for an older connection into no-ops.

mod decoder;

pub use decoder::SseDecoder;

use crate::cache_store::CacheStore;
use crate::error::Result;
use crate::models::StreamMessage;
use crate::ui_state::UiState;
use crate::version;
use futures_util::StreamExt;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
}

/// No reconnect timer is armed.
const NO_PENDING: u64 = u64::MAX;

pub struct StreamListener {
    http: Client,
    url: String,
    cache: Arc<CacheStore>,
    ui: Arc<UiState>,
    reconnect_delay: Duration,
    state: watch::Sender<StreamState>,
    generation: AtomicU64,
    /// Generation whose reconnect timer is armed, or NO_PENDING.
    pending_reconnect: AtomicU64,
    reconnect: Notify,
    /// Generation the last elapsed reconnect timer was armed for.
    reconnect_due: AtomicU64,
    restart: Notify,
    reconnects_fired: AtomicU64,
}

impl StreamListener {
    pub fn new(
        url: String,
        cache: Arc<CacheStore>,
        ui: Arc<UiState>,
        reconnect_delay: Duration,
    ) -> Result<Self> {
        // No overall timeout: the response body is a long-lived stream.
        let http = Client::builder()
            .user_agent(version::user_agent())
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let (state, _) = watch::channel(StreamState::Disconnected);
        Ok(Self {
            http,
            url,
            cache,
            ui,
            reconnect_delay,
            state,
            generation: AtomicU64::new(0),
            pending_reconnect: AtomicU64::new(NO_PENDING),
            reconnect: Notify::new(),
            reconnect_due: AtomicU64::new(0),
            restart: Notify::new(),
            reconnects_fired: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Generation of the newest connection attempt.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Reconnect timers that elapsed for a still-current connection.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnects_fired.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: StreamState) {
        self.state.send_replace(state);
    }

    /// Disconnected -> Connecting under a fresh generation.
    pub fn begin_attempt(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_state(StreamState::Connecting);
        generation
    }

    /// Connecting -> Connected. Ignored for a superseded generation.
    pub fn mark_connected(&self, generation: u64) -> bool {
        if generation != self.generation() {
            return false;
        }
        self.set_state(StreamState::Connected);
        self.ui.set_live(true);
        tracing::info!(generation, "traffic stream connected");
        true
    }

    /// Handles an error/close of connection `generation`: indicator off, state
    /// Disconnected, and one reconnect armed after the fixed delay. Repeated
    /// calls for the same generation, or calls for an old one, arm nothing.
    pub fn connection_closed(self: &Arc<Self>, generation: u64) -> bool {
        if generation != self.generation() {
            tracing::debug!(generation, "close of superseded stream connection ignored");
            return false;
        }
        if self.state() != StreamState::Disconnected || self.ui.is_live() {
            self.set_state(StreamState::Disconnected);
            self.ui.set_live(false);
        }
        if self.pending_reconnect.swap(generation, Ordering::AcqRel) == generation {
            return false;
        }
        tracing::info!(
            generation,
            delay_ms = self.reconnect_delay.as_millis() as u64,
            "traffic stream closed; reconnect scheduled"
        );
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.reconnect_delay).await;
            let _ = this.pending_reconnect.compare_exchange(
                generation,
                NO_PENDING,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            if this.generation() != generation {
                tracing::debug!(generation, "newer stream connection exists; reconnect dropped");
                return;
            }
            this.reconnects_fired.fetch_add(1, Ordering::Relaxed);
            this.reconnect_due.store(generation, Ordering::Release);
            this.reconnect.notify_one();
        });
        true
    }

    /// Drops the current connection and reconnects without waiting.
    pub fn reconnect_now(&self) {
        self.restart.notify_one();
    }

    /// Applies one message payload. Malformed or unrelated messages are
    /// dropped without touching state.
    pub async fn handle_message(&self, raw: &str) -> bool {
        match serde_json::from_str::<StreamMessage>(raw) {
            Ok(StreamMessage::TrafficUpdate { data }) => {
                tracing::debug!(
                    users = data.users.len(),
                    history = data.history.len(),
                    "traffic update"
                );
                self.cache.apply_traffic_update(data).await;
                self.ui.traffic_updated();
                true
            }
            Ok(StreamMessage::Error { message }) => {
                tracing::warn!(message = %message, "traffic stream reported an error");
                false
            }
            Ok(StreamMessage::Other) => {
                tracing::debug!("ignoring non-traffic stream message");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "handle_message", "dropping malformed stream message");
                false
            }
        }
    }

    /// Runs connect/read/reconnect until `shutdown` flips or its sender drops.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let generation = self.begin_attempt();
                let restarted = tokio::select! {
                    _ = self.run_connection(generation) => false,
                    _ = self.restart.notified() => true,
                    _ = shutdown.changed() => break,
                };
                if restarted {
                    tracing::info!(generation, "traffic stream restart requested");
                    self.set_state(StreamState::Disconnected);
                    continue;
                }
                self.connection_closed(generation);
                if !self.wait_for_reconnect(generation, &mut shutdown).await {
                    break;
                }
            }
            self.set_state(StreamState::Disconnected);
            self.ui.set_live(false);
            tracing::debug!("Stream listener shutting down");
        })
    }

    /// Waits until the reconnect timer of `generation` elapses or a manual
    /// restart arrives. A wake-up left over from an older generation's timer
    /// is ignored. Returns false on shutdown.
    async fn wait_for_reconnect(&self, generation: u64, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            tokio::select! {
                _ = self.reconnect.notified() => {
                    if self.reconnect_due.load(Ordering::Acquire) == generation {
                        return true;
                    }
                    tracing::debug!(generation, "stale reconnect wake-up ignored");
                }
                _ = self.restart.notified() => return true,
                _ = shutdown.changed() => return false,
            }
        }
    }

    async fn run_connection(&self, generation: u64) {
        let response = match self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = r.status().as_u16(), "traffic stream rejected");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "connect_stream", "traffic stream connect failed");
                return;
            }
        };
        if !self.mark_connected(generation) {
            return;
        }
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for data in decoder.feed(&bytes) {
                        self.handle_message(&data).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, operation = "read_stream", "traffic stream read failed");
                    return;
                }
            }
        }
        tracing::info!(generation, "traffic stream ended by server");
    }
}
