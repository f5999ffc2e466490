use super::types::{
    ConnectionSection, DevekConfig, DeviceSection, RawConnectionConfig, RawDevekConfig,
    RawDeviceConfig,
};
use anyhow::{Context, Result};
use devek_core::config::WS_URL_ENV;
use devek_core::{ConnectionConfig, DeviceInfo};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user, then project, then `DEVEK_WS_URL`)
    pub fn load() -> Result<DevekConfig> {
        let mut raw = RawDevekConfig::default();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Layer 3: Environment
        if let Ok(endpoint) = std::env::var(WS_URL_ENV)
            && !endpoint.trim().is_empty()
        {
            raw.connection.endpoint = Some(endpoint.trim().to_string());
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/devek/config.toml`)
    pub fn user_config_path() -> PathBuf {
        devek_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with DEVEK_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("DEVEK_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".devek/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawDevekConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawDevekConfig, overlay: RawDevekConfig) -> RawDevekConfig {
        RawDevekConfig {
            connection: RawConnectionConfig {
                endpoint: overlay.connection.endpoint.or(base.connection.endpoint),
            },
            device: RawDeviceConfig {
                name: overlay.device.name.or(base.device.name),
                environment: overlay.device.environment.or(base.device.environment),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawDevekConfig) -> DevekConfig {
        let defaults = DevekConfig::default();
        DevekConfig {
            connection: ConnectionSection {
                endpoint: raw
                    .connection
                    .endpoint
                    .unwrap_or(defaults.connection.endpoint),
            },
            device: DeviceSection {
                name: raw.device.name,
                environment: raw
                    .device
                    .environment
                    .unwrap_or(defaults.device.environment),
            },
        }
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<DevekConfig> {
        if path.exists() {
            Ok(Self::finalize(Self::read_raw(path)?))
        } else {
            Ok(DevekConfig::default())
        }
    }
}

impl DevekConfig {
    /// Session settings for the configured endpoint
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        ConnectionConfig::default()
            .with_endpoint(&self.connection.endpoint)
            .with_context(|| format!("Invalid endpoint {:?}", self.connection.endpoint))
    }

    pub fn device_info(&self) -> DeviceInfo {
        match &self.device.name {
            Some(name) => DeviceInfo::new(name.clone(), self.device.environment.clone()),
            None => DeviceInfo::detect(self.device.environment.clone()),
        }
    }
}
