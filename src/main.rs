use anyhow::Result;
use ssm_dashboard::ui_state::{ToastLevel, UiEvent};
use ssm_dashboard::*;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        backend = %app_config.server.base_url,
        "starting"
    );

    let ctx = context::AppContext::new(&app_config)
        .map_err(|e| anyhow::anyhow!("context: {}", e))?;
    let mut events = ctx.ui().subscribe();

    ctx.start().await;
    println!("{}", ctx.render(ctx.ui().active_view()).await);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(UiEvent::DomainUpdated(domain)) => {
                        if ctx.ui().active_view().shows(domain) {
                            println!("{}", ctx.render(ctx.ui().active_view()).await);
                        }
                    }
                    Ok(UiEvent::Toast { level, message }) => match level {
                        ToastLevel::Error => tracing::error!(toast = %message),
                        ToastLevel::Warning => tracing::warn!(toast = %message),
                        ToastLevel::Info | ToastLevel::Success => tracing::info!(toast = %message),
                    },
                    Ok(UiEvent::ServerStatus(status)) => {
                        tracing::info!(?status, "server status changed");
                    }
                    Ok(UiEvent::LiveStatus(live)) => {
                        tracing::info!(live, "real-time stream status");
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("UI event receiver lagged, skipped {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    ctx.shutdown().await;
    Ok(())
}
