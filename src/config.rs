/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 */

//! Configuration for the multi-mirror downloader, with file/env overlays.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Constructor inputs for a `Downloader`/`AsyncDownloader`, plus the
/// transport-timeout knobs the core spec leaves to "the HTTP client's
/// own enforcement".
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Bytes per block.
    pub split_size: u64,

    /// Coefficient `C` used in the initial delay-bias formula.
    pub initial_delay_coefficient: f64,

    /// Whether HEAD round-trip times seed an initial delay bias.
    pub initial_delay_prediction: bool,

    /// Whether block selection is biased by `delay[w]` (dynamic) or always
    /// pulls from the queue head.
    pub dynamic_block_num_selection: bool,

    /// Whether stalled blocks may be duplicated onto faster workers.
    pub duplicate_request: bool,

    /// Whether HEAD redirects (301/302/303/307/308) are followed.
    pub allow_redirects: bool,

    /// `invalid_block_count` threshold past which duplication is considered.
    pub threshold: usize,

    /// Connection timeout for the underlying HTTP client.
    pub connect_timeout: Duration,

    /// Per-request timeout for the underlying HTTP client.
    pub request_timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            split_size: 1_000_000,
            initial_delay_coefficient: 10.0,
            initial_delay_prediction: true,
            dynamic_block_num_selection: true,
            duplicate_request: true,
            allow_redirects: true,
            threshold: 20,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Logging configuration, mirrored from file or environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log file path (`None` = console only).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Top-level file-loadable configuration bundle.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub downloader: DownloaderConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. `/etc/rangecast/rangecast.toml` (system-wide)
    /// 2. `~/.config/rangecast/config.toml` (user)
    /// 3. `RANGECAST_*` environment variables
    pub fn load() -> Self {
        let mut config = Config::default();

        let system_config = Path::new("/etc/rangecast/rangecast.toml");
        if system_config.exists() {
            if let Ok(content) = fs::read_to_string(system_config) {
                if let Ok(parsed) = toml::from_str::<Config>(&content) {
                    config = parsed;
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rangecast").join("config.toml");
            if user_config.exists() {
                if let Ok(content) = fs::read_to_string(user_config) {
                    if let Ok(parsed) = toml::from_str::<Config>(&content) {
                        config = parsed;
                    }
                }
            }
        }

        config.apply_env_overrides()
    }

    fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("RANGECAST_SPLIT_SIZE") {
            if let Ok(n) = val.parse() {
                self.downloader.split_size = n;
            }
        }
        if let Ok(val) = std::env::var("RANGECAST_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.downloader.threshold = n;
            }
        }
        if let Ok(val) = std::env::var("RANGECAST_LOG_LEVEL") {
            self.logging.level = val;
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.downloader.split_size == 0 {
            return Err("split_size must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.split_size, 1_000_000);
        assert_eq!(config.initial_delay_coefficient, 10.0);
        assert!(config.initial_delay_prediction);
        assert!(config.dynamic_block_num_selection);
        assert!(config.duplicate_request);
        assert!(config.allow_redirects);
        assert_eq!(config.threshold, 20);
    }

    #[test]
    fn config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.downloader.split_size = 0;
        assert!(config.validate().is_err());
    }
}
