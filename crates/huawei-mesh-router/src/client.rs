//! Seam to the router control-plane client
//!
//! The HTTP client that logs into the router and encodes commands lives
//! outside this crate; the integration only needs the operations below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::classes::ConnectedDevice;

/// Action name understood by the router for a reboot
pub const ACTION_REBOOT: &str = "reboot_action";

/// Hardware (MAC) address as reported by the router
///
/// Stored uppercase, so spellings that differ only in case compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MacAddr(String);

impl MacAddr {
    pub fn new(mac: impl Into<String>) -> Self {
        let mut mac = mac.into();
        mac.make_ascii_uppercase();
        Self(mac)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the router reported no usable address
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MacAddr {
    fn from(mac: &str) -> Self {
        Self::new(mac)
    }
}

impl From<String> for MacAddr {
    fn from(mac: String) -> Self {
        Self::new(mac)
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.0
    }
}

/// Identity of the primary router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterInfo {
    pub name: String,
    pub model: String,
    pub serial_number: String,
    #[serde(default)]
    pub software_version: Option<String>,
    #[serde(default)]
    pub hardware_version: Option<String>,
}

/// Errors raised by the router client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("router at {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    #[error("unsupported action '{0}'")]
    UnknownAction(String),

    #[error("device {0} is not known to the router")]
    UnknownDevice(MacAddr),
}

/// Operations the integration needs from the router
#[async_trait]
pub trait RouterClient: Send + Sync {
    async fn get_router_info(&self) -> Result<RouterInfo, ClientError>;

    /// Every device the router currently knows, satellites included
    async fn get_connected_devices(&self) -> Result<Vec<ConnectedDevice>, ClientError>;

    /// Run `action` on the device with `device_mac`, or on the primary router when `None`
    async fn execute_action(
        &self,
        action: &str,
        device_mac: Option<&MacAddr>,
    ) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_addr() {
        let mac = MacAddr::from("AA:BB:CC:DD:EE:FF");
        assert_eq!(mac.to_lowercase(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert!(!mac.is_blank());
        assert!(MacAddr::new("  ").is_blank());
        assert!(MacAddr::default().is_blank());
    }

    #[test]
    fn test_mac_addr_case_insensitive() {
        let upper = MacAddr::from("AA:BB:CC:DD:EE:FF");
        let lower = MacAddr::from("aa:bb:cc:dd:ee:ff".to_string());
        assert_eq!(upper, lower);
        assert_eq!(lower.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_mac_addr_serde() {
        let mac: MacAddr = serde_json::from_str("\"0a:11:22:33:44:5f\"").unwrap();
        assert_eq!(mac.as_str(), "0A:11:22:33:44:5F");
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"0A:11:22:33:44:5F\"");
    }
}
