//! Reboot buttons for the primary router and every satellite router
//!
//! Setup adds one button for the primary router, then subscribes to the
//! coordinator so that each satellite router seen for the first time gets
//! its own button. A satellite keeps its button for the lifetime of the
//! config entry, even if it later drops out of the mesh.

use async_trait::async_trait;
use ha_components::button::ENTITY_ID_FORMAT;
use ha_components::{
    run_coroutine_threadsafe, AddEntitiesCallback, ButtonDeviceClass, ButtonEntity, DeviceInfo,
    Entity, EntityPlatform, HomeAssistant, RemoveListener, WriteState,
};
use ha_config_entries::ConfigEntry;
use ha_core::{EntityId, EntityIdError, HomeAssistantError, HomeAssistantResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::classes::ConnectedDevice;
use crate::client::{MacAddr, ACTION_REBOOT};
use crate::constants::DOMAIN;
use crate::coordinator::MeshRouterCoordinator;
use crate::watcher::RoutersWatcher;

/// Platform holding this integration's buttons
pub type ButtonPlatform = EntityPlatform<dyn ButtonEntity>;

/// A command a button runs against a router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonFunction {
    /// Action name sent to the router client
    pub action: &'static str,
    /// Part of the unique ID
    pub uid: &'static str,
    pub display_name: &'static str,
    pub device_class: ButtonDeviceClass,
    pub icon: &'static str,
}

pub const REBOOT: ButtonFunction = ButtonFunction {
    action: ACTION_REBOOT,
    uid: "button_reboot",
    display_name: "Reboot",
    device_class: ButtonDeviceClass::Restart,
    icon: "mdi:restart",
};

/// Friendly name, e.g. "Mesh-1 Reboot"
pub fn generate_button_name(function_display_name: &str, device_name: &str) -> String {
    format!("{} {}", device_name, function_display_name)
}

/// Entity ID from the router instance name, the function and the device
///
/// Collisions with entity IDs already in use get a numeric suffix.
pub fn generate_button_id(
    hass: &HomeAssistant,
    coordinator_name: &str,
    function_display_name: &str,
    device_name: &str,
) -> Result<EntityId, EntityIdError> {
    let preferred = format!("{} {} {}", coordinator_name, function_display_name, device_name);
    hass.generate_entity_id(ENTITY_ID_FORMAT, &preferred)
}

/// Unique ID: `{coordinator}_{function}_{mac or serial}`, suffix lowercased
pub fn generate_button_unique_id(
    coordinator_unique_id: &str,
    function_uid: &str,
    serial_number: &str,
    device_mac: Option<&MacAddr>,
) -> String {
    let suffix = match device_mac {
        Some(mac) => mac.to_lowercase(),
        None => serial_number.to_lowercase(),
    };
    format!("{}_{}_{}", coordinator_unique_id, function_uid, suffix)
}

/// A button bound to the primary router (`device_mac` is `None`) or a satellite
pub struct HuaweiButton {
    coordinator: Arc<MeshRouterCoordinator>,
    runtime: Handle,
    function: ButtonFunction,
    device_mac: Option<MacAddr>,
    entity_id: EntityId,
    name: String,
    unique_id: String,
    device_info: DeviceInfo,
    remove_listener: Mutex<Option<RemoveListener>>,
}

impl HuaweiButton {
    /// Build a button for `device`, or for the primary router when `None`
    ///
    /// Fails when the coordinator has no router info yet, or when no entity ID
    /// can be derived from the names.
    pub fn new(
        hass: &HomeAssistant,
        coordinator: Arc<MeshRouterCoordinator>,
        function: &ButtonFunction,
        device: Option<&ConnectedDevice>,
    ) -> HomeAssistantResult<Self> {
        let router_info = coordinator.router_info().ok_or_else(|| {
            HomeAssistantError::SetupFailed {
                domain: DOMAIN.to_string(),
                entry_id: coordinator.unique_id().to_string(),
                reason: "router info not available".to_string(),
            }
        })?;

        let device_mac = device.map(|d| d.mac.clone());
        let device_name = match device {
            Some(device) => device.display_name().to_string(),
            None => coordinator.primary_router_name(),
        };

        let entity_id =
            generate_button_id(hass, coordinator.name(), function.display_name, &device_name)?;
        let unique_id = generate_button_unique_id(
            coordinator.unique_id(),
            function.uid,
            &router_info.serial_number,
            device_mac.as_ref(),
        );

        Ok(Self {
            device_info: coordinator.get_device_info(device_mac.as_ref()),
            runtime: hass.runtime().clone(),
            name: generate_button_name(function.display_name, &device_name),
            function: *function,
            coordinator,
            device_mac,
            entity_id,
            unique_id,
            remove_listener: Mutex::new(None),
        })
    }

    pub fn action(&self) -> &str {
        self.function.action
    }

    pub fn device_mac(&self) -> Option<&MacAddr> {
        self.device_mac.as_ref()
    }

    /// Whether the button is still subscribed to coordinator updates
    pub fn is_listening(&self) -> bool {
        self.remove_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Entity for HuaweiButton {
    fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    fn unique_id(&self) -> Option<&str> {
        Some(&self.unique_id)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn icon(&self) -> Option<&str> {
        Some(self.function.icon)
    }

    fn device_class(&self) -> Option<&str> {
        Some(self.function.device_class.as_str())
    }

    fn available(&self) -> bool {
        self.coordinator.is_router_online(self.device_mac.as_ref())
    }

    fn device_info(&self) -> Option<&DeviceInfo> {
        Some(&self.device_info)
    }

    fn added_to_hass(&self, write_state: WriteState) {
        let remove = self.coordinator.async_add_listener(move || write_state());
        let previous = self
            .remove_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(remove);
        if let Some(previous) = previous {
            previous.remove();
        }

        match &self.device_mac {
            Some(mac) => debug!(action = self.function.action, %mac, "Button added to hass"),
            None => debug!(action = self.function.action, "Button added to hass"),
        }
    }

    fn will_remove_from_hass(&self) {
        let remove = self
            .remove_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(remove) = remove {
            remove.remove();
        }
    }
}

#[async_trait]
impl ButtonEntity for HuaweiButton {
    async fn async_press(&self) -> HomeAssistantResult<()> {
        self.coordinator
            .execute_action(self.function.action, self.device_mac.as_ref())
            .await
            .map_err(HomeAssistantError::integration)
    }

    fn press(&self) -> HomeAssistantResult<()> {
        let coordinator = self.coordinator.clone();
        let action = self.function.action;
        let device_mac = self.device_mac.clone();
        run_coroutine_threadsafe(&self.runtime, async move {
            coordinator
                .execute_action(action, device_mac.as_ref())
                .await
                .map_err(HomeAssistantError::integration)
        })?
    }
}

/// Creates a button for every satellite router seen for the first time
struct RouterDiscovery {
    hass: Weak<HomeAssistant>,
    coordinator: Weak<MeshRouterCoordinator>,
    add_entities: AddEntitiesCallback<dyn ButtonEntity>,
    watcher: Mutex<RoutersWatcher>,
    known_buttons: Mutex<HashMap<MacAddr, Arc<HuaweiButton>>>,
}

impl RouterDiscovery {
    /// Returns how many buttons were created
    fn coordinator_updated(&self) -> usize {
        let (Some(hass), Some(coordinator)) = (self.hass.upgrade(), self.coordinator.upgrade())
        else {
            return 0;
        };

        let devices = coordinator.connected_devices();
        let (changes, present) = {
            let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
            let changes = watcher.look_for_changes(&devices);
            (changes, watcher.present())
        };
        if !changes.is_empty() {
            debug!(
                present,
                added = changes.added.len(),
                removed = changes.removed.len(),
                "Mesh routers changed"
            );
        }

        for mac in &changes.removed {
            debug!(%mac, "Router left the mesh");
        }

        let mut created = 0;
        for router in &changes.added {
            if self.on_router_added(&hass, &coordinator, router) {
                created += 1;
            }
        }
        created
    }

    fn on_router_added(
        &self,
        hass: &HomeAssistant,
        coordinator: &Arc<MeshRouterCoordinator>,
        router: &ConnectedDevice,
    ) -> bool {
        let mut known = self
            .known_buttons
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if known.contains_key(&router.mac) {
            debug!(mac = %router.mac, "Router is back, button already exists");
            return false;
        }

        match HuaweiButton::new(hass, coordinator.clone(), &REBOOT, Some(router)) {
            Ok(button) => {
                let button = Arc::new(button);
                info!(mac = %router.mac, entity_id = %button.entity_id(), "New mesh router detected");
                known.insert(router.mac.clone(), button.clone());
                drop(known);
                (self.add_entities)(vec![button as Arc<dyn ButtonEntity>]);
                true
            }
            Err(err) => {
                error!(mac = %router.mac, %err, "Unable to create button for router");
                false
            }
        }
    }
}

/// Set up the button platform for a loaded config entry
///
/// Expects the entry's coordinator in `hass.data[DOMAIN][entry_id]`. The
/// discovery subscription is released by the entry's unload callbacks.
pub async fn async_setup_entry(
    hass: &Arc<HomeAssistant>,
    entry: &ConfigEntry,
    add_entities: AddEntitiesCallback<dyn ButtonEntity>,
) -> HomeAssistantResult<()> {
    let coordinator = hass
        .entry_data::<MeshRouterCoordinator>(DOMAIN, &entry.entry_id)
        .ok_or_else(|| HomeAssistantError::MissingEntryData {
            domain: DOMAIN.to_string(),
            entry_id: entry.entry_id.clone(),
        })?;

    let primary = HuaweiButton::new(hass, coordinator.clone(), &REBOOT, None)?;
    add_entities(vec![Arc::new(primary) as Arc<dyn ButtonEntity>]);

    let discovery = Arc::new(RouterDiscovery {
        hass: Arc::downgrade(hass),
        coordinator: Arc::downgrade(&coordinator),
        add_entities,
        watcher: Mutex::new(RoutersWatcher::new()),
        known_buttons: Mutex::new(HashMap::new()),
    });

    // Routers already known from the first refresh
    discovery.coordinator_updated();

    let listener = discovery.clone();
    let remove = coordinator.async_add_listener(move || {
        listener.coordinator_updated();
    });
    entry.async_on_unload(move || {
        remove.remove();
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RouterInfo;
    use crate::config::MeshRouterConfig;
    use crate::simulator::{SimulatedRouter, SimulatedRouterClient};

    #[test]
    fn test_generate_button_name() {
        assert_eq!(generate_button_name("Reboot", "Mesh-1"), "Mesh-1 Reboot");
    }

    #[test]
    fn test_generate_button_unique_id() {
        assert_eq!(
            generate_button_unique_id("uid", "button_reboot", "SN0001ABC", None),
            "uid_button_reboot_sn0001abc"
        );
        let mac = MacAddr::from("AA:BB:CC:DD:EE:FF");
        assert_eq!(
            generate_button_unique_id("uid", "button_reboot", "SN0001ABC", Some(&mac)),
            "uid_button_reboot_aa:bb:cc:dd:ee:ff"
        );
    }

    #[tokio::test]
    async fn test_generate_button_id_avoids_collisions() {
        let hass = HomeAssistant::new(Handle::current());
        let id = generate_button_id(&hass, "Huawei Router", "Reboot", "Mesh-1").unwrap();
        assert_eq!(id.to_string(), "button.huawei_router_reboot_mesh_1");

        assert!(hass.claim_entity_id(&id));
        let id = generate_button_id(&hass, "Huawei Router", "Reboot", "Mesh-1").unwrap();
        assert_eq!(id.to_string(), "button.huawei_router_reboot_mesh_1_2");
    }

    #[tokio::test]
    async fn test_button_requires_router_info() {
        let hass = HomeAssistant::new(Handle::current());
        let client = Arc::new(SimulatedRouterClient::new(SimulatedRouter {
            router: RouterInfo {
                name: "WS7200".to_string(),
                model: "WS7200-20".to_string(),
                serial_number: "SN0001".to_string(),
                software_version: None,
                hardware_version: None,
            },
            devices: Vec::new(),
        }));
        let entry = ConfigEntry::new(DOMAIN, "Router");
        let coordinator = Arc::new(MeshRouterCoordinator::new(
            &MeshRouterConfig::default(),
            &entry,
            client,
        ));

        let err = HuaweiButton::new(&hass, coordinator.clone(), &REBOOT, None).err();
        assert!(matches!(err, Some(HomeAssistantError::SetupFailed { .. })));

        coordinator.async_refresh().await.unwrap();
        let button = HuaweiButton::new(&hass, coordinator, &REBOOT, None).unwrap();
        assert_eq!(button.name(), Some("WS7200 Reboot"));
        assert_eq!(button.device_class(), Some("restart"));
        assert_eq!(button.icon(), Some("mdi:restart"));
        assert_eq!(button.action(), ACTION_REBOOT);
        assert!(button.device_mac().is_none());
        assert!(!button.is_listening());
    }
}
