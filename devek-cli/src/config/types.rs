use devek_core::config::{DEFAULT_ENVIRONMENT, DEFAULT_WS_URL};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDevekConfig {
    #[serde(default)]
    pub connection: RawConnectionConfig,

    #[serde(default)]
    pub device: RawDeviceConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConnectionConfig {
    /// WebSocket endpoint of the devek server
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDeviceConfig {
    /// Name reported with every change (defaults to the hostname)
    pub name: Option<String>,

    /// Environment reported with every change
    pub environment: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DevekConfig {
    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub device: DeviceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionSection {
    pub endpoint: String,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub environment: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}
