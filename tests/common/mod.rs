// Shared test helpers: an in-process fake admin API (REST + SSE) built with axum

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use ssm_dashboard::config::AppConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct BackendState {
    pub users_body: Mutex<Value>,
    pub services_body: Mutex<Value>,
    pub stats_body: Mutex<Value>,
    pub notifications_body: Mutex<Value>,
    pub stream_body: Mutex<String>,
    pub healthy: AtomicBool,
    /// Data routes answer 500 with a non-JSON body.
    pub fail: AtomicBool,
    pub users_delay_ms: AtomicU64,
    pub users_in_flight: AtomicUsize,
    pub users_max_in_flight: AtomicUsize,
    hits: Mutex<HashMap<String, usize>>,
}

impl BackendState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            users_body: Mutex::new(json!({
                "success": true,
                "users": [{
                    "_id": "u1",
                    "username": "alice",
                    "port": 8388,
                    "traffic_used_gb": 2,
                    "traffic_limit_gb": 10,
                    "enable": true
                }]
            })),
            services_body: Mutex::new(json!({ "success": true, "user_services": [] })),
            stats_body: Mutex::new(json!({
                "success": true,
                "stats": {
                    "server": { "ip": "10.0.0.1", "db_status": "connected", "manager_status": "connected" },
                    "users": { "total": 1, "active": 1 },
                    "traffic": { "total_used_gb": 2.0, "total_limit_gb": 10.0 },
                    "system": { "cpu_usage": 12.5, "memory_usage": 40.0 },
                    "services": { "total_services": 0, "active_services": 0 }
                }
            })),
            notifications_body: Mutex::new(json!({ "success": true, "notifications": [] })),
            stream_body: Mutex::new(String::new()),
            healthy: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            users_delay_ms: AtomicU64::new(0),
            users_in_flight: AtomicUsize::new(0),
            users_max_in_flight: AtomicUsize::new(0),
            hits: Mutex::new(HashMap::new()),
        })
    }

    fn hit(&self, route: &str) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_insert(0) += 1;
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    fn failing(&self) -> bool {
        self.fail.load(Ordering::SeqCst)
    }
}

fn failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}

async fn health(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("health");
    if s.healthy.load(Ordering::SeqCst) {
        Json(json!({ "status": "healthy", "timestamp": "2026-10-19T10:00:00" })).into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn users(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("users");
    let now = s.users_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    s.users_max_in_flight.fetch_max(now, Ordering::SeqCst);
    // Body and delay are fixed when the request arrives.
    let body = s.users_body.lock().unwrap().clone();
    let delay = s.users_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    s.users_in_flight.fetch_sub(1, Ordering::SeqCst);
    if s.failing() {
        return failure();
    }
    Json(body).into_response()
}

async fn services(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("services");
    if s.failing() {
        return failure();
    }
    Json(s.services_body.lock().unwrap().clone()).into_response()
}

async fn stats(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("stats");
    if s.failing() {
        return failure();
    }
    Json(s.stats_body.lock().unwrap().clone()).into_response()
}

async fn notifications_check(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("notifications");
    if s.failing() {
        return failure();
    }
    Json(s.notifications_body.lock().unwrap().clone()).into_response()
}

async fn notifications_history(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("notifications_history");
    Json(json!({
        "success": true,
        "notifications": [
            { "type": "info", "username": "alice", "message": "created", "timestamp": "2026-10-19T09:00:00" }
        ]
    }))
    .into_response()
}

async fn traffic_history(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("traffic_history");
    Json(json!({
        "success": true,
        "days": 7,
        "history": [
            { "date": "2026-10-18", "total_used_gb": 1.5, "average_usage": 10.0, "user_count": 1 },
            { "date": "2026-10-19", "total_used_gb": 3.0, "average_usage": 20.0, "user_count": 1 }
        ]
    }))
    .into_response()
}

async fn traffic_stream(State(s): State<Arc<BackendState>>) -> Response {
    s.hit("stream");
    let body = s.stream_body.lock().unwrap().clone();
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn reset_traffic(State(s): State<Arc<BackendState>>, Path(id): Path<String>) -> Response {
    s.hit("reset_traffic");
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "User not found" })),
        )
            .into_response();
    }
    Json(json!({ "success": true, "message": format!("Traffic reset for {id}") })).into_response()
}

async fn user_config(State(s): State<Arc<BackendState>>, Path(id): Path<String>) -> Response {
    s.hit("user_config");
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "User not found" })),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "config": {
            "server": "10.0.0.1",
            "server_port": 8388,
            "password": "secret",
            "method": "chacha20-ietf-poly1305"
        },
        "ss_url": format!("ss://{id}@10.0.0.1:8388")
    }))
    .into_response()
}

async fn download_config(State(s): State<Arc<BackendState>>, Path(id): Path<String>) -> Response {
    s.hit("download_config");
    if id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(header::CONTENT_TYPE, "application/json")],
        format!("{{\"server\":\"10.0.0.1\",\"server_port\":8388,\"user\":\"{id}\"}}"),
    )
        .into_response()
}

async fn delete_user(State(s): State<Arc<BackendState>>, Path(_id): Path<String>) -> Response {
    s.hit("delete_user");
    Json(json!({ "success": true, "message": "User deleted" })).into_response()
}

async fn service_control(State(s): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    s.hit("service_control");
    Json(json!({ "success": true, "message": format!("{} {}", body["action"].as_str().unwrap_or("?"), body["service"].as_str().unwrap_or("?")) }))
        .into_response()
}

pub fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users", get(users))
        .route("/api/users/{id}", delete(delete_user))
        .route("/api/users/{id}/reset-traffic", post(reset_traffic))
        .route("/api/users/{id}/config", get(user_config))
        .route("/api/users/{id}/download", get(download_config))
        .route("/api/services/status", get(services))
        .route("/api/service/control", post(service_control))
        .route("/api/stats", get(stats))
        .route("/api/notifications/check", post(notifications_check))
        .route("/api/notifications/history", get(notifications_history))
        .route("/api/traffic/history", get(traffic_history))
        .route("/api/traffic-stream", get(traffic_stream))
        .with_state(state)
}

/// Serves the fake API on an ephemeral port; returns its base URL.
pub async fn spawn_backend(state: Arc<BackendState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn test_config(base_url: &str, cache_dir: &std::path::Path) -> AppConfig {
    AppConfig::load_from_str(&format!(
        r#"
[server]
base_url = "{}"
request_timeout_secs = 5

[stream]
reconnect_delay_ms = 5000

[cache]
dir = "{}"
"#,
        base_url,
        cache_dir.display()
    ))
    .unwrap()
}

pub fn traffic_update_json() -> String {
    json!({
        "type": "traffic_update",
        "data": {
            "users": [
                { "user_id": "u1", "username": "alice", "port": 8388, "enabled": true,
                  "traffic_used_gb": 2.0, "traffic_limit_gb": 10.0 }
            ],
            "total": { "total_used_gb": 2.0, "total_limit_gb": 10.0 },
            "history": [
                { "timestamp": "2026-10-19T10:00:00", "total_used_gb": 1.9 },
                { "timestamp": "2026-10-19T10:00:05", "total_used_gb": 2.0 }
            ]
        }
    })
    .to_string()
}
