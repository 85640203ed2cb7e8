// Application context tests: startup, rendering, mutations, teardown

mod common;

use common::{BackendState, spawn_backend, test_config, unreachable_base_url};
use serde_json::json;
use ssm_dashboard::api_client::ServiceAction;
use ssm_dashboard::cache_store::Preferences;
use ssm_dashboard::context::AppContext;
use ssm_dashboard::error::SyncError;
use ssm_dashboard::models::Domain;
use ssm_dashboard::render::NO_SERVICES;
use ssm_dashboard::ui_state::{ServerStatus, ToastLevel, UiEvent, View};
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_start_loads_dashboard() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&base, dir.path())).unwrap();

    assert!(ctx.start().await);
    assert_eq!(backend.hits("health"), 1);
    assert_eq!(backend.hits("users"), 1);
    assert_eq!(backend.hits("stats"), 1);
    assert_eq!(backend.hits("services"), 1);
    assert_eq!(backend.hits("notifications"), 1);
    assert_eq!(backend.hits("notifications_history"), 1);
    assert_eq!(backend.hits("traffic_history"), 1);
    assert_eq!(ctx.ui().server_status(), ServerStatus::Online);
    assert_eq!(ctx.cache().traffic().await.daily.len(), 2);
    assert_eq!(ctx.cache().activity().await.len(), 1);

    let dashboard = ctx.render(View::Dashboard).await;
    assert!(dashboard.contains("Server: Online"));
    assert!(dashboard.contains("alice"));
    assert!(dashboard.contains("8388"));
    assert!(dashboard.contains(NO_SERVICES));
    assert!(dashboard.contains("Users 1 (1 active)"));

    let traffic = ctx.render(View::Traffic).await;
    assert!(traffic.contains("2026-10-19"));

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_start_against_unreachable_server() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&unreachable_base_url(), dir.path())).unwrap();
    let mut rx = ctx.ui().subscribe();

    assert!(!ctx.start().await);
    assert_eq!(ctx.ui().server_status(), ServerStatus::Offline);
    assert!(ctx.cache().get(Domain::Users).await.is_none());

    let mut messages = Vec::new();
    while let Ok(e) = rx.try_recv() {
        if let UiEvent::Toast {
            level: ToastLevel::Error,
            message,
        } = e
        {
            messages.push(message);
        }
    }
    assert!(messages.iter().any(|m| m.starts_with("Cannot connect to API server")));

    let view = ctx.render(View::Users).await;
    assert!(view.contains("Server: Offline"));
    assert!(view.contains("Users unavailable"));

    tokio::time::timeout(Duration::from_secs(5), ctx.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn test_mutation_triggers_forced_refresh() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&base, dir.path())).unwrap();
    ctx.load_dashboard().await;
    assert_eq!(backend.hits("users"), 1);

    *backend.users_body.lock().unwrap() = json!({ "success": true, "users": [] });
    let result = ctx.reset_traffic("u1").await.unwrap();
    assert_eq!(result.message.as_deref(), Some("Traffic reset for u1"));
    assert_eq!(backend.hits("reset_traffic"), 1);
    assert_eq!(backend.hits("users"), 2);
    assert_eq!(backend.hits("stats"), 2);

    let users = ctx.render(View::Users).await;
    assert!(users.contains("No users found"));
}

#[tokio::test]
async fn test_failed_mutation_surfaces_server_message() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&base, dir.path())).unwrap();
    let mut rx = ctx.ui().subscribe();

    let err = ctx.reset_traffic("missing").await.unwrap_err();
    assert!(matches!(err, SyncError::Application { ref message } if message == "User not found"));
    assert_eq!(backend.hits("users"), 0, "no refresh after a failed mutation");

    let toast = rx.try_recv().unwrap();
    assert!(matches!(toast, UiEvent::Toast { level: ToastLevel::Error, .. }));
}

#[tokio::test]
async fn test_service_control_refreshes_services() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&base, dir.path())).unwrap();

    let result = ctx
        .control_service("shadowsocks-alice.service", ServiceAction::Restart)
        .await
        .unwrap();
    assert_eq!(result.message.as_deref(), Some("restart shadowsocks-alice.service"));
    assert_eq!(backend.hits("services"), 1);
}

#[tokio::test]
async fn test_switch_to_services_view_refreshes() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&base, dir.path())).unwrap();

    ctx.switch_view(View::Services).await;
    assert_eq!(ctx.ui().active_view(), View::Services);
    assert_eq!(backend.hits("services"), 1);

    let view = ctx.render(View::Services).await;
    assert!(view.contains("Running 0  Stopped 0  Total 0  Health 0%"));
    assert!(view.contains(NO_SERVICES));
}

#[tokio::test]
async fn test_preferences_persist() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&unreachable_base_url(), dir.path())).unwrap();
    assert_eq!(ctx.preferences().await, Preferences::default());

    let prefs = Preferences {
        auto_backup: true,
        auto_report: true,
    };
    ctx.set_preferences(prefs).await;
    assert_eq!(ctx.preferences().await, prefs);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::new(&test_config(&base, dir.path())).unwrap();

    ctx.shutdown().await;
    assert!(ctx.start().await);
    assert!(ctx.start().await, "second start is a no-op");
    assert_eq!(backend.hits("health"), 1);
    ctx.shutdown().await;
    ctx.shutdown().await;
}
