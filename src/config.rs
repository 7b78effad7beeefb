use std::path::Path;
use std::time::Duration;

use anyhow::{Context, ensure};
use serde::Deserialize;

use crate::http::connection::ConnectionLimits;

/// Server configuration.
///
/// Defaults can be overridden by a YAML file named in `CONFIG`; `LISTEN`
/// overrides the listen address from either source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen_addr: String,
    pub read_buffer_size: usize,
    pub max_header_bytes: usize,
    pub date_refresh_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            read_buffer_size: 4096,
            max_header_bytes: 8192,
            date_refresh_ms: 1000,
            shutdown_grace_ms: 5000,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text).context("failed to parse YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.listen_addr.is_empty(), "listen_addr must not be empty");
        ensure!(self.read_buffer_size > 0, "read_buffer_size must be positive");
        ensure!(self.max_header_bytes > 0, "max_header_bytes must be positive");
        ensure!(self.date_refresh_ms > 0, "date_refresh_ms must be positive");
        Ok(())
    }

    pub fn connection_limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            read_buffer_size: self.read_buffer_size,
            max_header_bytes: self.max_header_bytes,
        }
    }

    pub fn date_refresh(&self) -> Duration {
        Duration::from_millis(self.date_refresh_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
