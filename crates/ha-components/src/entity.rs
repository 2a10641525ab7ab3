//! Entity capability contract and device linkage

use ha_core::EntityId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Connection type for network MAC addresses
pub const CONNECTION_NETWORK_MAC: &str = "mac";

/// Asks the host to re-render an entity's state
///
/// Handed to an entity when it is added so it can refresh itself after its
/// data source changes.
pub type WriteState = Arc<dyn Fn() + Send + Sync>;

/// Description of the physical device an entity belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// (domain, id) pairs identifying the device
    pub identifiers: BTreeSet<(String, String)>,
    /// (connection type, id) pairs, e.g. ("mac", "aa:bb:cc:dd:ee:ff")
    pub connections: BTreeSet<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    /// Identifier of the parent device this one is reached through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<String>,
}

impl DeviceInfo {
    pub fn with_identifier(mut self, domain: impl Into<String>, id: impl Into<String>) -> Self {
        self.identifiers.insert((domain.into(), id.into()));
        self
    }

    pub fn with_connection(
        mut self,
        connection_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.connections
            .insert((connection_type.into(), id.into()));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_via_device(mut self, domain: impl Into<String>, id: impl Into<String>) -> Self {
        self.via_device = Some((domain.into(), id.into()));
        self
    }
}

/// Capabilities every entity exposes to the host
pub trait Entity: Send + Sync {
    fn entity_id(&self) -> &EntityId;

    /// Stable identifier that survives restarts
    fn unique_id(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> Option<&str> {
        None
    }

    fn icon(&self) -> Option<&str> {
        None
    }

    fn device_class(&self) -> Option<&str> {
        None
    }

    /// Whether the entity can currently be used
    fn available(&self) -> bool {
        true
    }

    fn device_info(&self) -> Option<&DeviceInfo> {
        None
    }

    /// Entity-specific state value; `None` renders as `unknown`
    fn state(&self) -> Option<String> {
        None
    }

    /// Called once the host has accepted the entity
    fn added_to_hass(&self, write_state: WriteState) {
        let _ = write_state;
    }

    /// Called before the host drops the entity
    fn will_remove_from_hass(&self) {}
}
