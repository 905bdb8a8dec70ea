use std::path::PathBuf;

use serde::Deserialize;

use libs::{config, util};

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default)]
    pub qr_url: Option<String>,
    #[serde(default = "default_settings_file")]
    pub settings_file: String,
    /// Comma separated extra image hosts, e.g. a CDN in front of the bucket.
    #[serde(default)]
    pub image_hosts: Option<String>,
    #[serde(default)]
    pub font_file: Option<String>,
}

fn default_api_url() -> String {
    config::DEFAULT_API_URL.to_string()
}

fn default_site_url() -> String {
    config::DEFAULT_SITE_URL.to_string()
}

fn default_settings_file() -> String {
    "display.toml".to_string()
}

impl Config {
    /// Read `LIVEWALL_*` variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::prefixed("LIVEWALL_").from_env::<Config>()?)
    }

    pub fn settings_path(&self) -> anyhow::Result<PathBuf> {
        Ok(util::in_config_dir(&self.settings_file)?)
    }

    pub fn extra_image_hosts(&self) -> Vec<String> {
        self.image_hosts
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config: Config = envy::prefixed("LIVEWALL_")
            .from_iter(Vec::<(String, String)>::new())
            .unwrap();
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.settings_file, "display.toml");
        assert!(config.extra_image_hosts().is_empty());
    }

    #[test]
    fn image_hosts_are_split() {
        let config: Config = envy::prefixed("LIVEWALL_")
            .from_iter(vec![(
                "LIVEWALL_IMAGE_HOSTS".to_string(),
                " cdn.example.com, ,img.example.com".to_string(),
            )])
            .unwrap();
        assert_eq!(
            config.extra_image_hosts(),
            vec!["cdn.example.com", "img.example.com"]
        );
    }
}
