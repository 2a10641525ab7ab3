//! The host handle passed to integrations

use dashmap::{DashMap, DashSet};
use ha_core::{generate_entity_id, EntityId, EntityIdError};
use std::any::Any;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::trace;

/// Type-erased per-entry runtime data (usually an integration's coordinator)
pub type EntryData = Arc<dyn Any + Send + Sync>;

/// The central Home Assistant instance as seen by integrations
///
/// Holds:
/// - the runtime handle synchronous entry points submit work to
/// - per-domain, per-config-entry data (`hass.data[domain][entry_id]`)
/// - the set of entity IDs currently in use
pub struct HomeAssistant {
    runtime: Handle,
    data: DashMap<String, DashMap<String, EntryData>>,
    entity_ids: DashSet<String>,
}

impl HomeAssistant {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            data: DashMap::new(),
            entity_ids: DashSet::new(),
        }
    }

    /// Handle of the runtime that owns integration work
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Store data for a config entry, replacing any previous value
    pub fn store_entry_data<T: Any + Send + Sync>(
        &self,
        domain: &str,
        entry_id: &str,
        value: Arc<T>,
    ) {
        trace!(domain, entry_id, "Storing entry data");
        self.data
            .entry(domain.to_string())
            .or_default()
            .insert(entry_id.to_string(), value);
    }

    /// Get data for a config entry, if present and of type `T`
    pub fn entry_data<T: Any + Send + Sync>(&self, domain: &str, entry_id: &str) -> Option<Arc<T>> {
        let value = self.data.get(domain)?.get(entry_id)?.value().clone();
        value.downcast::<T>().ok()
    }

    /// Remove data for a config entry, returning whether anything was stored
    pub fn remove_entry_data(&self, domain: &str, entry_id: &str) -> bool {
        self.data
            .get(domain)
            .map(|entries| entries.remove(entry_id).is_some())
            .unwrap_or(false)
    }

    pub fn is_entity_id_taken(&self, entity_id: &str) -> bool {
        self.entity_ids.contains(entity_id)
    }

    /// Claim an entity ID; returns false if it was already in use
    pub fn claim_entity_id(&self, entity_id: &EntityId) -> bool {
        self.entity_ids.insert(entity_id.to_string())
    }

    pub fn release_entity_id(&self, entity_id: &EntityId) {
        self.entity_ids.remove(&entity_id.to_string());
    }

    /// All entity IDs currently in use
    pub fn entity_ids(&self) -> Vec<String> {
        self.entity_ids.iter().map(|id| id.key().clone()).collect()
    }

    /// Generate an entity ID that does not collide with any ID in use
    pub fn generate_entity_id(
        &self,
        entity_id_format: &str,
        name: &str,
    ) -> Result<EntityId, EntityIdError> {
        generate_entity_id(entity_id_format, name, |id| self.is_entity_id_taken(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Coordinator(&'static str);

    #[tokio::test]
    async fn test_entry_data_roundtrip() {
        let hass = HomeAssistant::new(Handle::current());
        hass.store_entry_data("mesh", "entry1", Arc::new(Coordinator("a")));

        let data = hass.entry_data::<Coordinator>("mesh", "entry1").unwrap();
        assert_eq!(*data, Coordinator("a"));

        // Wrong type or wrong key yields nothing
        assert!(hass.entry_data::<String>("mesh", "entry1").is_none());
        assert!(hass.entry_data::<Coordinator>("mesh", "entry2").is_none());

        assert!(hass.remove_entry_data("mesh", "entry1"));
        assert!(!hass.remove_entry_data("mesh", "entry1"));
        assert!(hass.entry_data::<Coordinator>("mesh", "entry1").is_none());
    }

    #[tokio::test]
    async fn test_generate_entity_id_skips_claimed() {
        let hass = HomeAssistant::new(Handle::current());
        let first = hass.generate_entity_id("button.{}", "Router Reboot").unwrap();
        assert!(hass.claim_entity_id(&first));
        assert!(!hass.claim_entity_id(&first));

        let second = hass.generate_entity_id("button.{}", "Router Reboot").unwrap();
        assert_eq!(second.to_string(), "button.router_reboot_2");

        hass.release_entity_id(&first);
        let again = hass.generate_entity_id("button.{}", "Router Reboot").unwrap();
        assert_eq!(again, first);
    }
}
