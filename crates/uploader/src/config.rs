use std::path::PathBuf;

use serde::Deserialize;

use libs::{camera::SnapshotCamera, config};

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default)]
    pub qr_url: Option<String>,
    /// Still frames kept fresh by the capture daemon, one per lens.
    #[serde(default)]
    pub camera_user: Option<PathBuf>,
    #[serde(default)]
    pub camera_environment: Option<PathBuf>,
    #[serde(default)]
    pub camera_any: Option<PathBuf>,
    /// Kiosk has front and back lenses, so the opposite one is worth a try.
    #[serde(default)]
    pub mobile: bool,
}

fn default_api_url() -> String {
    config::DEFAULT_API_URL.to_string()
}

fn default_site_url() -> String {
    config::DEFAULT_SITE_URL.to_string()
}

impl Config {
    /// Read `LIVEWALL_*` variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::prefixed("LIVEWALL_").from_env::<Config>()?)
    }

    pub fn camera(&self) -> SnapshotCamera {
        SnapshotCamera {
            user: self.camera_user.clone(),
            environment: self.camera_environment.clone(),
            any: self.camera_any.clone(),
        }
    }
}
