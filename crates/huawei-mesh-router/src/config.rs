//! Router connection settings stored in the config entry

use ha_config_entries::ConfigEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_NAME, DEFAULT_PORT, DEFAULT_SCAN_INTERVAL, DEFAULT_SSL, DEFAULT_USER,
    DEFAULT_VERIFY_SSL, MIN_SCAN_INTERVAL,
};

/// Errors that can occur while reading the entry configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse entry data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Settings for one mesh router instance
///
/// Built from the entry's `data`, with any key present in `options`
/// taking precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshRouterConfig {
    /// Display name; prefixes every generated entity ID
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_ssl")]
    pub ssl: bool,

    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Seconds between refreshes
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ssl() -> bool {
    DEFAULT_SSL
}

fn default_verify_ssl() -> bool {
    DEFAULT_VERIFY_SSL
}

fn default_username() -> String {
    DEFAULT_USER.to_string()
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL
}

impl Default for MeshRouterConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            ssl: default_ssl(),
            verify_ssl: default_verify_ssl(),
            username: default_username(),
            password: String::new(),
            scan_interval: default_scan_interval(),
        }
    }
}

impl MeshRouterConfig {
    /// Read and validate the configuration of a config entry
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self, ConfigError> {
        let mut merged = serde_json::Map::new();
        for (key, value) in entry.data.iter().chain(entry.options.iter()) {
            merged.insert(key.clone(), value.clone());
        }
        let config: Self = serde_json::from_value(serde_json::Value::Object(merged))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        if self.scan_interval < MIN_SCAN_INTERVAL {
            return Err(ConfigError::InvalidValue {
                key: "scan_interval".to_string(),
                reason: format!("must be at least {} seconds", MIN_SCAN_INTERVAL),
            });
        }
        Ok(())
    }

    /// URL of the router's web UI
    pub fn configuration_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn entry(data: serde_json::Value) -> ConfigEntry {
        let data: HashMap<String, serde_json::Value> = serde_json::from_value(data).unwrap();
        ConfigEntry::new("huawei_mesh_router", "Router").with_data(data)
    }

    #[test]
    fn test_defaults_applied() {
        let config = MeshRouterConfig::from_entry(&entry(json!({}))).unwrap();
        assert_eq!(config, MeshRouterConfig::default());
        assert_eq!(config.configuration_url(), "http://192.168.3.1:80");
    }

    #[test]
    fn test_options_override_data() {
        let options: HashMap<String, serde_json::Value> =
            serde_json::from_value(json!({"scan_interval": 60})).unwrap();
        let entry = entry(json!({"host": "10.0.0.1", "scan_interval": 10, "ssl": true}))
            .with_options(options);

        let config = MeshRouterConfig::from_entry(&entry).unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.scan_interval, 60);
        assert_eq!(config.configuration_url(), "https://10.0.0.1:80");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = MeshRouterConfig::from_entry(&entry(json!({"scan_interval": 1}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "scan_interval"));

        let err = MeshRouterConfig::from_entry(&entry(json!({"host": " "}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "host"));

        let err = MeshRouterConfig::from_entry(&entry(json!({"port": "eighty"}))).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
