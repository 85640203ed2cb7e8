// Logical endpoint keys -> request URLs

use crate::error::{Result, SyncError};
use url::Url;

const ID_PLACEHOLDER: &str = "{id}";

/// Backend routes by logical key. `{id}` marks id-bearing routes.
const ENDPOINTS: &[(&str, &str)] = &[
    ("health", "/api/health"),
    ("stats", "/api/stats"),
    ("users", "/api/users"),
    ("user.add", "/api/users"),
    ("user.delete", "/api/users/{id}"),
    ("user.config", "/api/users/{id}/config"),
    ("user.download", "/api/users/{id}/download"),
    ("user.reset-traffic", "/api/users/{id}/reset-traffic"),
    ("user.extend", "/api/users/{id}/extend"),
    ("user.service.toggle", "/api/users/{id}/service/toggle"),
    ("services.status", "/api/services/status"),
    ("services.sync", "/api/services/sync"),
    ("services.restart-all", "/api/services/restart-all"),
    ("services.reload-all", "/api/services/reload-all"),
    ("admin.initialize", "/api/admin/initialize"),
    ("service.control", "/api/service/control"),
    ("traffic.stream", "/api/traffic-stream"),
    ("traffic.history", "/api/traffic/history"),
    ("notifications.check", "/api/notifications/check"),
    ("notifications.history", "/api/notifications/history"),
];

/// Validates and normalizes a base URL (scheme required, no trailing slash).
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(SyncError::InvalidUrl("URL cannot be empty".into()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(SyncError::InvalidUrl(format!(
            "URL must start with http:// or https://, got {url}"
        )));
    }
    Url::parse(url).map_err(|e| SyncError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(url.to_string())
}

#[derive(Debug, Clone)]
pub struct EndpointResolver {
    base_url: String,
    base: Url,
}

impl EndpointResolver {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let base = Url::parse(&base_url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        Ok(Self { base_url, base })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fully qualified URL for `key`. Unknown keys, and ids given to the
    /// wrong kind of route, are configuration errors. The id is
    /// percent-encoded as a single path segment.
    pub fn resolve(&self, key: &str, id: Option<&str>) -> Result<String> {
        let Some((_, template)) = ENDPOINTS.iter().find(|(k, _)| *k == key) else {
            tracing::error!(endpoint = key, "unknown endpoint key");
            return Err(SyncError::UnknownEndpoint(key.to_string()));
        };
        let id = match (template.contains(ID_PLACEHOLDER), id) {
            (true, Some(id)) if !matches!(id, "" | "." | "..") => Some(id),
            (false, None) => None,
            (true, Some(id)) if !id.is_empty() => {
                tracing::error!(endpoint = key, id, "endpoint id is not a valid path segment");
                return Err(SyncError::UnknownEndpoint(format!("{key} (invalid id)")));
            }
            (true, _) => {
                tracing::error!(endpoint = key, "endpoint requires an id");
                return Err(SyncError::UnknownEndpoint(format!("{key} (missing id)")));
            }
            (false, Some(_)) => {
                tracing::error!(endpoint = key, "endpoint does not take an id");
                return Err(SyncError::UnknownEndpoint(format!("{key} (unexpected id)")));
            }
        };

        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidUrl(self.base_url.clone()))?;
            segments.pop_if_empty();
            for segment in template.trim_start_matches('/').split('/') {
                match (segment, id) {
                    (ID_PLACEHOLDER, Some(id)) => segments.push(id),
                    _ => segments.push(segment),
                };
            }
        }
        Ok(url.into())
    }
}
