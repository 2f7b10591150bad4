// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Settings come from three layers, later layers winning: built-in defaults,
// an optional JSON file, and a handful of environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PrintdropError, Result};
use crate::types::Platform;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PRINTDROP_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "printdrop.json";

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to.  All interfaces by default so the
    /// server is reachable from the LAN.
    pub bind_address: String,
    /// HTTP port (`PORT` overrides).
    pub port: u16,
    /// Directory holding uploaded documents (`PRINTDROP_UPLOAD_DIR` overrides).
    pub upload_dir: PathBuf,
    /// Grace period between a print command finishing and its source file
    /// being deleted, so the spooler can finish reading it.
    pub cleanup_delay_ms: u64,
    /// Upload size limit in bytes.
    pub max_upload_bytes: u64,
    /// How long finished jobs stay listed.  `None` keeps them for the
    /// lifetime of the process.
    pub job_retention_secs: Option<u64>,
    /// Force a print back-end instead of detecting it from the host OS.
    pub platform: Option<Platform>,
    /// Allow cross-origin requests from any origin (LAN front-ends).
    pub cors_allow_any_origin: bool,
    /// Log print commands instead of running them (`PRINTDROP_DRY_RUN`
    /// overrides).
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 3001,
            upload_dir: PathBuf::from("uploads"),
            cleanup_delay_ms: 5_000,
            max_upload_bytes: 50 * 1024 * 1024,
            job_retention_secs: None,
            platform: None,
            cors_allow_any_origin: true,
            dry_run: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the file named by `PRINTDROP_CONFIG`, or
    /// `printdrop.json` in the working directory, then apply environment
    /// overrides.
    ///
    /// An explicitly named file must exist; the implicit one is optional.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("no config file, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a JSON config file.  Missing keys take their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            PrintdropError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = serde_json::from_str(&data)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| PrintdropError::Config(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(dir) = lookup("PRINTDROP_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("PRINTDROP_DRY_RUN") {
            self.dry_run = matches!(flag.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }

    pub fn job_retention(&self) -> Option<Duration> {
        self.job_retention_secs.map(Duration::from_secs)
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
