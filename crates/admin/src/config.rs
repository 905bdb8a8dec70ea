use std::time::Duration;

use serde::Deserialize;

use libs::config;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Shared secret for bootstrapping the first admin account.
    #[serde(default)]
    pub admin_secret: Option<String>,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

fn default_api_url() -> String {
    config::DEFAULT_API_URL.to_string()
}

fn default_refresh_secs() -> u64 {
    5
}

impl Config {
    /// Read `LIVEWALL_*` variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::prefixed("LIVEWALL_").from_env::<Config>()?)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }
}
