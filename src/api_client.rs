// Typed REST client for the admin API (`{success, message?, ...payload}` envelope)

use crate::endpoints::EndpointResolver;
use crate::error::{Result, SyncError};
use crate::models::{
    DailyTraffic, HealthStatus, Notification, ServiceSnapshot, StatsSnapshot, UserSnapshot,
};
use crate::version;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Body of POST /api/users.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub traffic_limit_gb: f64,
    pub duration_days: u32,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_udp: Option<bool>,
}

/// Action accepted by POST /api/service/control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Status,
}

/// Outcome of a mutating call: the server's message plus the raw body.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub message: Option<String>,
    pub body: Value,
}

pub struct ApiClient {
    http: Client,
    endpoints: EndpointResolver,
}

impl ApiClient {
    pub fn new(endpoints: EndpointResolver, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self { http, endpoints })
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoints.resolve("health", None)?;
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Connectivity(format!("HTTP {}", status.as_u16())));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn stats(&self) -> Result<StatsSnapshot> {
        let url = self.endpoints.resolve("stats", None)?;
        let body = self.call(Method::GET, &url, None).await?;
        payload(body, "stats")
    }

    pub async fn users(&self) -> Result<Vec<UserSnapshot>> {
        let url = self.endpoints.resolve("users", None)?;
        let body = self.call(Method::GET, &url, None).await?;
        payload(body, "users")
    }

    pub async fn services_status(&self) -> Result<Vec<ServiceSnapshot>> {
        let url = self.endpoints.resolve("services.status", None)?;
        let body = self.call(Method::GET, &url, None).await?;
        payload(body, "user_services")
    }

    pub async fn traffic_history(&self, days: u32) -> Result<Vec<DailyTraffic>> {
        let url = self.endpoints.resolve("traffic.history", None)?;
        let request = self.http.get(&url).query(&[("days", days)]);
        payload(self.send(request).await?, "history")
    }

    /// Runs the server-side notification check and returns what it produced.
    pub async fn check_notifications(&self) -> Result<Vec<Notification>> {
        let url = self.endpoints.resolve("notifications.check", None)?;
        let body = self.call(Method::POST, &url, None).await?;
        payload(body, "notifications")
    }

    pub async fn notifications_history(&self, limit: u32) -> Result<Vec<Notification>> {
        let url = self.endpoints.resolve("notifications.history", None)?;
        let request = self.http.get(&url).query(&[("limit", limit)]);
        payload(self.send(request).await?, "notifications")
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<ActionResult> {
        let url = self.endpoints.resolve("user.add", None)?;
        let body = serde_json::to_value(user)?;
        self.action(Method::POST, &url, Some(body)).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<ActionResult> {
        let url = self.endpoints.resolve("user.delete", Some(id))?;
        self.action(Method::DELETE, &url, None).await
    }

    /// Client configuration document for one user.
    pub async fn user_config(&self, id: &str) -> Result<Value> {
        let url = self.endpoints.resolve("user.config", Some(id))?;
        self.call(Method::GET, &url, None).await
    }

    /// Raw downloadable config file.
    pub async fn download_config(&self, id: &str) -> Result<String> {
        let url = self.endpoints.resolve("user.download", Some(id))?;
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Connectivity(format!("HTTP {}", status.as_u16())));
        }
        Ok(response.text().await?)
    }

    pub async fn reset_traffic(&self, id: &str) -> Result<ActionResult> {
        let url = self.endpoints.resolve("user.reset-traffic", Some(id))?;
        self.action(Method::POST, &url, None).await
    }

    pub async fn extend_user(&self, id: &str, additional_days: u32) -> Result<ActionResult> {
        let url = self.endpoints.resolve("user.extend", Some(id))?;
        let body = serde_json::json!({ "additional_days": additional_days });
        self.action(Method::POST, &url, Some(body)).await
    }

    pub async fn toggle_service(&self, id: &str, enable: bool) -> Result<ActionResult> {
        let url = self.endpoints.resolve("user.service.toggle", Some(id))?;
        let body = serde_json::json!({ "enable": enable });
        self.action(Method::POST, &url, Some(body)).await
    }

    pub async fn sync_services(&self) -> Result<ActionResult> {
        let url = self.endpoints.resolve("services.sync", None)?;
        self.action(Method::POST, &url, None).await
    }

    pub async fn restart_all_services(&self) -> Result<ActionResult> {
        let url = self.endpoints.resolve("services.restart-all", None)?;
        self.action(Method::POST, &url, None).await
    }

    pub async fn reload_all_services(&self) -> Result<ActionResult> {
        let url = self.endpoints.resolve("services.reload-all", None)?;
        self.action(Method::POST, &url, None).await
    }

    pub async fn initialize_admin(&self) -> Result<ActionResult> {
        let url = self.endpoints.resolve("admin.initialize", None)?;
        self.action(Method::POST, &url, None).await
    }

    pub async fn control_service(&self, service: &str, action: ServiceAction) -> Result<ActionResult> {
        let url = self.endpoints.resolve("service.control", None)?;
        let body = serde_json::json!({ "service": service, "action": action });
        self.action(Method::POST, &url, Some(body)).await
    }

    async fn action(&self, method: Method, url: &str, body: Option<Value>) -> Result<ActionResult> {
        let body = self.call(method, url, body).await?;
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(ActionResult { message, body })
    }

    /// Sends the request and unwraps the success envelope.
    async fn call(&self, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
        debug!(method = %method, url = %url, "api request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        read_envelope(response).await
    }
}

async fn read_envelope(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    let parsed: std::result::Result<Value, _> = serde_json::from_str(&text);
    match parsed {
        Ok(body) => {
            // `success:false` wins over the transport status.
            if body.get("success").and_then(Value::as_bool) == Some(false) {
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request failed")
                    .to_string();
                return Err(SyncError::Application { message });
            }
            if !status.is_success() {
                return Err(SyncError::Connectivity(format!("HTTP {}", status.as_u16())));
            }
            Ok(body)
        }
        Err(_) if !status.is_success() => {
            Err(SyncError::Connectivity(format!("HTTP {}", status.as_u16())))
        }
        Err(e) => Err(SyncError::Malformed(e)),
    }
}

/// Extracts `field` from an envelope; a missing or null field yields the default.
fn payload<T: DeserializeOwned + Default>(mut body: Value, field: &str) -> Result<T> {
    match body.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}
