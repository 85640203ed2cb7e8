// Client identity reported to the admin API and in startup logs

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `User-Agent` for REST and stream requests, e.g. "ssm-dashboard/0.3.0".
pub fn user_agent() -> String {
    format!("{NAME}/{VERSION}")
}
