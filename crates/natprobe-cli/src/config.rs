//! Configuration file for the natprobe CLI.

use natprobe_discovery::{DetectorConfig, RetryPolicy};
use natprobe_transport::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// natprobe configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// STUN probing configuration
    #[serde(default)]
    pub stun: StunConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// STUN probing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StunConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Attempts per request
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Wait for the first attempt, in milliseconds
    #[serde(default = "default_initial_rto_ms")]
    pub initial_rto_ms: u64,
    /// SOFTWARE attribute sent with the binding probe
    #[serde(default = "default_software")]
    pub software: String,
    /// Local bind address for the probe socket
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_port() -> u16 {
    DetectorConfig::default().port
}

fn default_attempts() -> u32 {
    RetryPolicy::default().attempts
}

fn default_initial_rto_ms() -> u64 {
    500
}

fn default_software() -> String {
    DetectorConfig::default().software
}

fn default_bind_addr() -> String {
    "0.0.0.0:0".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            attempts: default_attempts(),
            initial_rto_ms: default_initial_rto_ms(),
            software: default_software(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("natprobe/config.toml")
    }

    /// Load config from the default path, falling back to defaults when the
    /// file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse bind address as `SocketAddr`
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn parse_bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stun.bind_addr.parse()?)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.parse_bind_addr()?;

        if self.stun.port == 0 {
            anyhow::bail!("STUN port must be non-zero");
        }

        if self.stun.attempts == 0 || self.stun.attempts > 16 {
            anyhow::bail!("Attempts must be between 1 and 16");
        }

        if self.stun.initial_rto_ms == 0 || self.stun.initial_rto_ms > 60_000 {
            anyhow::bail!("Initial RTO must be between 1 and 60000 ms");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Detector settings
    #[must_use]
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            port: self.stun.port,
            retry: RetryPolicy {
                attempts: self.stun.attempts,
                initial_rto: Duration::from_millis(self.stun.initial_rto_ms),
            },
            software: self.stun.software.clone(),
        }
    }

    /// Probe socket settings
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address cannot be parsed.
    pub fn controller_config(&self) -> anyhow::Result<ControllerConfig> {
        Ok(ControllerConfig {
            bind_addr: self.parse_bind_addr()?,
            ..ControllerConfig::default()
        })
    }
}
