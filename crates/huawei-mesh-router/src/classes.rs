//! Device records reported by the router

use serde::{Deserialize, Serialize};

use crate::client::MacAddr;

/// A device connected to the mesh, as last reported by the router
///
/// Satellite routers are connected devices with `is_router` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedDevice {
    #[serde(default)]
    pub name: String,

    /// Blank when the router reported a record without an address
    #[serde(default)]
    pub mac: MacAddr,

    #[serde(default)]
    pub ip_address: Option<String>,

    #[serde(default)]
    pub is_router: bool,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub model: Option<String>,
}

impl ConnectedDevice {
    pub fn new(mac: impl Into<MacAddr>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mac: mac.into(),
            ip_address: None,
            is_router: false,
            is_active: true,
            model: None,
        }
    }

    /// A satellite router of the mesh
    pub fn router(mac: impl Into<MacAddr>, name: impl Into<String>) -> Self {
        Self {
            is_router: true,
            ..Self::new(mac, name)
        }
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Name to display, falling back to the address for unnamed devices
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.mac.as_str()
        } else {
            &self.name
        }
    }
}
