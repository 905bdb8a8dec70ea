mod config;
mod feed;
mod image_loader;
mod runner;
mod scheduler;
mod screen;
#[cfg(feature = "sdl")]
mod sdl;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Notify;

use libs::{
    ApiClient, ApiConfig,
    config::ImageHostPolicy,
    display_settings::SharedSettings,
    qr,
    util,
};

use config::Config;
use feed::ApiFeed;
use runner::Runner;

#[cfg(feature = "sdl")]
fn open_screen(cfg: &Config, upload_url: &str) -> Result<sdl::SdlScreen> {
    sdl::SdlScreen::new(upload_url, cfg.font_file.as_ref().map(std::path::PathBuf::from))
}

#[cfg(not(feature = "sdl"))]
fn open_screen(cfg: &Config, upload_url: &str) -> Result<screen::LogScreen> {
    use libs::qr::{QrVariant, UploadQr};

    if let Some(font) = &cfg.font_file {
        tracing::info!(%font, "built without the sdl feature, font file unused");
    }
    Ok(screen::LogScreen::new(UploadQr::new(upload_url, QrVariant::Full)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    util::init_tracing();

    let cfg = Config::from_env().context("reading LIVEWALL_* environment")?;
    let api = ApiConfig::new(&cfg.api_url);
    if !api.is_secure_origin() {
        tracing::warn!(api = %cfg.api_url, "API is not served over https");
    }

    let settings_path = cfg.settings_path()?;
    let settings = SharedSettings::load(&settings_path)
        .with_context(|| format!("loading {settings_path:?}"))?;
    let _watcher = match settings.watch_file() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!("settings file will not be watched: {e}");
            None
        }
    };
    tracing::info!(file = ?settings_path, current = ?settings.get().await, "display settings loaded");

    let policy = ImageHostPolicy::for_api(&api, &cfg.extra_image_hosts());
    let client = ApiClient::new(api)?;
    let feed = ApiFeed::new(client, policy);

    let upload_url = qr::upload_url(cfg.qr_url.as_deref(), &cfg.site_url);
    tracing::info!(%upload_url, "QR code target");
    let screen = open_screen(&cfg, &upload_url)?;

    let shutdown = Arc::new(Notify::new());
    tokio::spawn(util::listen_for_shutdown(shutdown.clone()));

    // the screen may hold thread-bound handles, so the loop stays on this task
    let show = Runner::new(feed, screen, settings.subscribe(), shutdown)
        .run()
        .await?;
    tracing::info!(queued = show.queue_len(), "display stopped");
    Ok(())
}
