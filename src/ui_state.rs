// Presentation state the renderer reacts to: visible view, indicators, toasts

use crate::models::Domain;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Users,
    Services,
    Notifications,
    Traffic,
}

impl View {
    const ALL: [View; 5] = [
        View::Dashboard,
        View::Users,
        View::Services,
        View::Notifications,
        View::Traffic,
    ];

    fn to_u8(self) -> u8 {
        match self {
            View::Dashboard => 0,
            View::Users => 1,
            View::Services => 2,
            View::Notifications => 3,
            View::Traffic => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        Self::ALL.get(v as usize).copied().unwrap_or(View::Dashboard)
    }

    /// Whether this view displays data of `domain`.
    pub fn shows(self, domain: Domain) -> bool {
        match self {
            View::Dashboard => matches!(domain, Domain::Stats | Domain::Users | Domain::Services),
            View::Users => domain == Domain::Users,
            View::Services => domain == Domain::Services,
            View::Notifications => domain == Domain::Notifications,
            View::Traffic => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Unknown,
    Online,
    /// Reachable but the database or service manager is down.
    Partial,
    Offline,
}

impl ServerStatus {
    fn to_u8(self) -> u8 {
        match self {
            ServerStatus::Unknown => 0,
            ServerStatus::Online => 1,
            ServerStatus::Partial => 2,
            ServerStatus::Offline => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => ServerStatus::Online,
            2 => ServerStatus::Partial,
            3 => ServerStatus::Offline,
            _ => ServerStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    DomainUpdated(Domain),
    Loading { domain: Domain, view: View, active: bool },
    Degraded { domain: Domain, active: bool },
    ServerStatus(ServerStatus),
    LiveStatus(bool),
    TrafficUpdated,
    Toast { level: ToastLevel, message: String },
}

pub struct UiState {
    view: AtomicU8,
    server: AtomicU8,
    live: AtomicBool,
    degraded: [AtomicBool; 4],
    events: broadcast::Sender<UiEvent>,
}

impl UiState {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            view: AtomicU8::new(View::Dashboard.to_u8()),
            server: AtomicU8::new(ServerStatus::Unknown.to_u8()),
            live: AtomicBool::new(false),
            degraded: Default::default(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: UiEvent) {
        // No subscribers is normal for headless use.
        let _ = self.events.send(event);
    }

    pub fn active_view(&self) -> View {
        View::from_u8(self.view.load(Ordering::Acquire))
    }

    pub fn switch_view(&self, view: View) {
        self.view.store(view.to_u8(), Ordering::Release);
    }

    /// Toggles the loading indicator for `domain`, only if the visible view shows it.
    pub fn set_loading(&self, domain: Domain, active: bool) -> bool {
        let view = self.active_view();
        if !view.shows(domain) {
            return false;
        }
        self.emit(UiEvent::Loading {
            domain,
            view,
            active,
        });
        true
    }

    pub fn domain_updated(&self, domain: Domain) {
        self.emit(UiEvent::DomainUpdated(domain));
    }

    pub fn is_degraded(&self, domain: Domain) -> bool {
        self.degraded[domain.index()].load(Ordering::Acquire)
    }

    /// Offline mode: any domain currently served from the durable cache.
    pub fn is_offline(&self) -> bool {
        self.degraded.iter().any(|d| d.load(Ordering::Acquire))
    }

    pub fn set_degraded(&self, domain: Domain, active: bool) {
        let prev = self.degraded[domain.index()].swap(active, Ordering::AcqRel);
        if prev != active {
            self.emit(UiEvent::Degraded { domain, active });
        }
    }

    pub fn server_status(&self) -> ServerStatus {
        ServerStatus::from_u8(self.server.load(Ordering::Acquire))
    }

    pub fn set_server_status(&self, status: ServerStatus) {
        let prev = self.server.swap(status.to_u8(), Ordering::AcqRel);
        if prev != status.to_u8() {
            self.emit(UiEvent::ServerStatus(status));
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Release);
        self.emit(UiEvent::LiveStatus(live));
    }

    pub fn traffic_updated(&self) {
        self.emit(UiEvent::TrafficUpdated);
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.emit(UiEvent::Toast {
            level,
            message: message.into(),
        });
    }
}
