use std::{path::PathBuf, sync::Arc};

use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

#[cfg(unix)]
pub async fn listen_for_shutdown(notify: Arc<Notify>) {
    let mut sigterm =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("cannot install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
                notify.notify_waiters();
                return;
            }
        };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }

    tracing::info!("shutdown signal received, stopping");
    notify.notify_waiters();
}

#[cfg(not(unix))]
pub async fn listen_for_shutdown(notify: Arc<Notify>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, stopping");
    notify.notify_waiters();
}

/// `LOG_LEVEL` driven fmt subscriber, `info` when unset.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn get_config_dir() -> Result<PathBuf> {
    let mut config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("no config directory on this platform".into()))?;
    config_dir.push("livewall");
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Resolve `path` against the config directory unless it is absolute.
pub fn in_config_dir(path: &str) -> Result<PathBuf> {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(get_config_dir()?.join(path))
}
