//! Connection constants and configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::reconnect::ReconnectPolicy;

/// Production WebSocket endpoint
pub const DEFAULT_WS_URL: &str = "wss://ws.devek.dev";

/// Environment variable overriding [`DEFAULT_WS_URL`]
pub const WS_URL_ENV: &str = "DEVEK_WS_URL";

/// Web application (registration, dashboard)
pub const APP_URL: &str = "https://app.devek.dev";

/// Documentation site
pub const DOCS_URL: &str = "https://devek.dev";

/// Token store key for the persisted auth token
pub const AUTH_TOKEN_KEY: &str = "devekAuthToken";

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(5_000);
/// Backoff grows linearly up to this multiple of [`RECONNECT_INTERVAL`]
pub const MAX_BACKOFF_MULTIPLIER: u32 = 3;
pub const PING_INTERVAL: Duration = Duration::from_millis(30_000);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const LOGIN_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Settings for the single connection managed by [`crate::SessionManager`].
///
/// Timing values are fixed for the life of a manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// WebSocket URL, validated by [`ConnectionConfig::with_endpoint`]
    pub endpoint: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_interval: Duration,
    pub max_backoff_multiplier: u32,
    pub ping_interval: Duration,
    pub handshake_timeout: Duration,
    pub login_timeout: Duration,
    pub token_key: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WS_URL.to_string(),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: RECONNECT_INTERVAL,
            max_backoff_multiplier: MAX_BACKOFF_MULTIPLIER,
            ping_interval: PING_INTERVAL,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            login_timeout: LOGIN_TIMEOUT,
            token_key: AUTH_TOKEN_KEY.to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Defaults with the endpoint taken from `DEVEK_WS_URL` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(WS_URL_ENV) {
            Ok(endpoint) if !endpoint.trim().is_empty() => {
                Self::default().with_endpoint(endpoint.trim())
            }
            _ => Ok(Self::default()),
        }
    }

    /// Replace the endpoint, validating that it is a WebSocket URL.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint)?;
        match url.scheme() {
            "ws" | "wss" => {
                self.endpoint = url.to_string();
                Ok(self)
            }
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    /// A fresh reconnect policy with this configuration's limits.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.max_reconnect_attempts,
            self.reconnect_interval,
            self.max_backoff_multiplier,
        )
    }
}

/// Identity of this machine as reported with every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub computer_name: String,
    pub environment: String,
}

/// Environment name used when the host does not provide one
pub const DEFAULT_ENVIRONMENT: &str = "devek-cli";

impl DeviceInfo {
    pub fn new(computer_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            computer_name: computer_name.into(),
            environment: environment.into(),
        }
    }

    /// Detect the computer name from the environment.
    ///
    /// Checks `COMPUTERNAME` (Windows) and `HOSTNAME`, then `/etc/hostname`.
    pub fn detect(environment: impl Into<String>) -> Self {
        Self::new(detect_hostname(), environment)
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::detect(DEFAULT_ENVIRONMENT)
    }
}

fn detect_hostname() -> String {
    std::env::var("COMPUTERNAME")
        .ok()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_constants() {
        let config = ConnectionConfig::default();
        assert_eq!(config.endpoint, "wss://ws.devek.dev");
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_interval, Duration::from_secs(5));
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.handshake_timeout, Duration::from_secs(15));
        assert_eq!(config.login_timeout, Duration::from_secs(10));
        assert_eq!(config.token_key, "devekAuthToken");
    }

    #[test]
    fn with_endpoint_accepts_ws_schemes() {
        let config = ConnectionConfig::default()
            .with_endpoint("ws://127.0.0.1:8080/socket")
            .unwrap();
        assert_eq!(config.endpoint, "ws://127.0.0.1:8080/socket");
    }

    #[test]
    fn with_endpoint_rejects_http() {
        let result = ConnectionConfig::default().with_endpoint("https://app.devek.dev");
        assert!(matches!(result, Err(ConfigError::UnsupportedScheme(s)) if s == "https"));
    }

    #[test]
    fn with_endpoint_rejects_garbage() {
        let result = ConnectionConfig::default().with_endpoint("not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEndpoint(_))));
    }

    #[test]
    fn reconnect_policy_follows_config() {
        let config = ConnectionConfig {
            max_reconnect_attempts: 2,
            ..ConnectionConfig::default()
        };
        let policy = config.reconnect_policy();
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(5));
    }

    #[test]
    fn device_info_is_never_empty() {
        let device = DeviceInfo::default();
        assert!(!device.computer_name.is_empty());
        assert_eq!(device.environment, DEFAULT_ENVIRONMENT);
    }
}
