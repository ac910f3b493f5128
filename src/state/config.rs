use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the config was found. Set by the caller, never read from the file.
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub poll_interval_ms: u64,
    /// Only trust a paused-at-zero report after the track has been seen moving.
    pub completion_guard: bool,
    /// Spotify Connect device to play on. The active device is used when unset.
    pub device_name: Option<String>,
    pub redirect_uri: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".changer"),
            poll_interval_ms: 1000,
            completion_guard: true,
            device_name: None,
            redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from {:?}", path))
    }

    /// Config under `data_dir`, or defaults rooted there when no file exists yet.
    pub fn load_or_default(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn store_path(&self) -> PathBuf {
        super::Store::store_path(&self.data_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
