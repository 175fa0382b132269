//! Configuration management for vpnctld

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::connection::RegistrySettings;
use crate::error::{VpnctlError, VpnctlResult};
use crate::events::DEFAULT_EVENT_BUFFER;

/// Accepted values for `logging.level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Main daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub tunnel: TunnelSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the HTTP gateway binds to
    pub listen: SocketAddr,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default log filter when RUST_LOG is unset
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelSettings {
    /// Upper bound for a driver handshake (seconds)
    pub connect_timeout_secs: u64,
    /// Upper bound for a driver teardown (seconds)
    pub disconnect_timeout_secs: u64,
    /// Simulated handshake latency (milliseconds)
    pub handshake_delay_ms: u64,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            disconnect_timeout_secs: 10,
            handshake_delay_ms: 0,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub async fn load<P: AsRef<Path>>(path: P) -> VpnctlResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            VpnctlError::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, built-in defaults otherwise
    pub async fn load_or_default(path: Option<&Path>) -> VpnctlResult<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> VpnctlResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| VpnctlError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> VpnctlResult<()> {
        if self.server.event_buffer == 0 {
            return Err(VpnctlError::ConfigError(
                "server.event_buffer must be greater than zero".to_string(),
            ));
        }
        if self.tunnel.connect_timeout_secs == 0 {
            return Err(VpnctlError::ConfigError(
                "tunnel.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.tunnel.disconnect_timeout_secs == 0 {
            return Err(VpnctlError::ConfigError(
                "tunnel.disconnect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        let level = self.logging.level.trim();
        if !LOG_LEVELS.iter().any(|known| known.eq_ignore_ascii_case(level)) {
            return Err(VpnctlError::ConfigError(format!(
                "logging.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Apply command-line overrides, then validate the result
    pub fn apply_overrides(
        &mut self,
        listen: Option<SocketAddr>,
        log_level: Option<&str>,
    ) -> VpnctlResult<()> {
        if let Some(listen) = listen {
            self.server.listen = listen;
        }
        if let Some(level) = log_level {
            self.logging.level = level.to_string();
        }
        self.validate()
    }

    /// Timeouts for the connection registry
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            connect_timeout: Duration::from_secs(self.tunnel.connect_timeout_secs),
            disconnect_timeout: Duration::from_secs(self.tunnel.disconnect_timeout_secs),
        }
    }

    pub fn handshake_delay(&self) -> Duration {
        Duration::from_millis(self.tunnel.handshake_delay_ms)
    }
}
