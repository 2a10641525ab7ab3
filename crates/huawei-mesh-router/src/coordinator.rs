//! Data update coordinator for one mesh router
//!
//! Holds the last snapshot fetched from the router, answers availability and
//! device metadata questions from it, and forwards actions to the client.
//! Every refresh, successful or not, notifies the subscribed listeners.

use ha_components::{DeviceInfo, RemoveListener, UpdateListeners, CONNECTION_NETWORK_MAC};
use ha_config_entries::ConfigEntry;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::classes::ConnectedDevice;
use crate::client::{ClientError, MacAddr, RouterClient, RouterInfo};
use crate::config::MeshRouterConfig;
use crate::constants::{DOMAIN, MANUFACTURER, PRIMARY_ROUTER_DEFAULT_NAME};

#[derive(Debug, Default)]
struct CoordinatorData {
    router_info: Option<RouterInfo>,
    connected_devices: Vec<ConnectedDevice>,
    last_update_success: bool,
}

pub struct MeshRouterCoordinator {
    name: String,
    unique_id: String,
    configuration_url: String,
    client: Arc<dyn RouterClient>,
    data: RwLock<CoordinatorData>,
    listeners: Arc<UpdateListeners>,
}

impl MeshRouterCoordinator {
    pub fn new(
        config: &MeshRouterConfig,
        entry: &ConfigEntry,
        client: Arc<dyn RouterClient>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            unique_id: entry
                .unique_id
                .clone()
                .unwrap_or_else(|| entry.entry_id.clone()),
            configuration_url: config.configuration_url(),
            client,
            data: RwLock::new(CoordinatorData::default()),
            listeners: Arc::new(UpdateListeners::new()),
        }
    }

    /// Name of this router instance, as configured
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable identifier of this integration instance
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn router_info(&self) -> Option<RouterInfo> {
        self.read(|data| data.router_info.clone())
    }

    pub fn primary_router_name(&self) -> String {
        self.router_info()
            .map(|info| info.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| PRIMARY_ROUTER_DEFAULT_NAME.to_string())
    }

    pub fn connected_devices(&self) -> Vec<ConnectedDevice> {
        self.read(|data| data.connected_devices.clone())
    }

    pub fn connected_device(&self, mac: &MacAddr) -> Option<ConnectedDevice> {
        self.read(|data| {
            data.connected_devices
                .iter()
                .find(|device| &device.mac == mac)
                .cloned()
        })
    }

    pub fn last_update_success(&self) -> bool {
        self.read(|data| data.last_update_success)
    }

    /// Whether the primary router (`None`) or the satellite with `device_mac` is reachable
    pub fn is_router_online(&self, device_mac: Option<&MacAddr>) -> bool {
        self.read(|data| {
            if !data.last_update_success {
                return false;
            }
            match device_mac {
                None => true,
                Some(mac) => data
                    .connected_devices
                    .iter()
                    .any(|device| &device.mac == mac && device.is_router && device.is_active),
            }
        })
    }

    /// Device registry information for the primary router (`None`) or a satellite
    pub fn get_device_info(&self, device_mac: Option<&MacAddr>) -> DeviceInfo {
        let router_info = self.router_info();
        let router_id = router_info
            .as_ref()
            .map(|info| info.serial_number.clone())
            .unwrap_or_else(|| self.unique_id.clone());

        match device_mac {
            None => {
                let mut info = DeviceInfo::default()
                    .with_identifier(DOMAIN, router_id)
                    .with_name(self.primary_router_name())
                    .with_manufacturer(MANUFACTURER);
                info.configuration_url = Some(self.configuration_url.clone());
                if let Some(router) = router_info {
                    info.model = Some(router.model);
                    info.sw_version = router.software_version;
                    info.hw_version = router.hardware_version;
                }
                info
            }
            Some(mac) => {
                let device = self.connected_device(mac);
                let mut info = DeviceInfo::default()
                    .with_identifier(DOMAIN, mac.as_str())
                    .with_connection(CONNECTION_NETWORK_MAC, mac.to_lowercase())
                    .with_name(
                        device
                            .as_ref()
                            .map(|d| d.display_name().to_string())
                            .unwrap_or_else(|| mac.to_string()),
                    )
                    .with_manufacturer(MANUFACTURER)
                    .with_via_device(DOMAIN, router_id);
                info.model = device.and_then(|d| d.model);
                info
            }
        }
    }

    /// Subscribe to refresh notifications
    pub fn async_add_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> RemoveListener {
        self.listeners.add_listener(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fetch a new snapshot from the router and notify listeners
    #[instrument(skip(self), fields(router = %self.name))]
    pub async fn async_refresh(&self) -> Result<(), ClientError> {
        let result = self.fetch().await;

        match &result {
            Ok((router_info, devices)) => {
                debug!(devices = devices.len(), "Router data refreshed");
                self.write(|data| {
                    data.router_info = Some(router_info.clone());
                    data.connected_devices = devices.clone();
                    data.last_update_success = true;
                });
            }
            Err(err) => {
                warn!(%err, "Error fetching router data");
                self.write(|data| data.last_update_success = false);
            }
        }

        self.listeners.async_update_listeners();
        result.map(|_| ())
    }

    /// First refresh during setup; a failure here fails the setup
    pub async fn async_config_entry_first_refresh(&self) -> Result<(), ClientError> {
        self.async_refresh().await?;
        info!(router = %self.name, primary = %self.primary_router_name(), "Connected to router");
        Ok(())
    }

    async fn fetch(&self) -> Result<(RouterInfo, Vec<ConnectedDevice>), ClientError> {
        let router_info = self.client.get_router_info().await?;
        let devices = self.client.get_connected_devices().await?;
        Ok((router_info, devices))
    }

    /// Run an action against the primary router (`None`) or a satellite
    #[instrument(skip(self), fields(router = %self.name))]
    pub async fn execute_action(
        &self,
        action: &str,
        device_mac: Option<&MacAddr>,
    ) -> Result<(), ClientError> {
        match device_mac {
            Some(mac) => info!(action, %mac, "Executing action on device"),
            None => info!(action, "Executing action on primary router"),
        }
        self.client.execute_action(action, device_mac).await
    }

    fn read<T>(&self, f: impl FnOnce(&CoordinatorData) -> T) -> T {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&data)
    }

    fn write(&self, f: impl FnOnce(&mut CoordinatorData)) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{SimulatedRouter, SimulatedRouterClient};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn coordinator() -> (Arc<SimulatedRouterClient>, MeshRouterCoordinator) {
        let client = Arc::new(SimulatedRouterClient::new(SimulatedRouter {
            router: RouterInfo {
                name: "WS7200".to_string(),
                model: "WS7200-20".to_string(),
                serial_number: "SN0001".to_string(),
                software_version: Some("10.0.2".to_string()),
                hardware_version: None,
            },
            devices: vec![
                ConnectedDevice::router("AA:BB:CC:DD:EE:01", "Mesh-1"),
                ConnectedDevice::new("AA:BB:CC:DD:EE:99", "Phone"),
            ],
        }));
        let entry = ConfigEntry::new(DOMAIN, "Router").with_unique_id("uid");
        let coordinator =
            MeshRouterCoordinator::new(&MeshRouterConfig::default(), &entry, client.clone());
        (client, coordinator)
    }

    #[tokio::test]
    async fn test_offline_before_first_refresh() {
        let (_client, coordinator) = coordinator();
        assert!(!coordinator.is_router_online(None));
        assert_eq!(coordinator.primary_router_name(), PRIMARY_ROUTER_DEFAULT_NAME);
        assert_eq!(coordinator.unique_id(), "uid");
    }

    #[tokio::test]
    async fn test_refresh_populates_snapshot() {
        let (_client, coordinator) = coordinator();
        coordinator.async_config_entry_first_refresh().await.unwrap();

        assert!(coordinator.is_router_online(None));
        assert_eq!(coordinator.primary_router_name(), "WS7200");
        assert_eq!(coordinator.connected_devices().len(), 2);

        let mesh = MacAddr::from("AA:BB:CC:DD:EE:01");
        let phone = MacAddr::from("AA:BB:CC:DD:EE:99");
        assert!(coordinator.is_router_online(Some(&mesh)));
        // Online but not a router
        assert!(!coordinator.is_router_online(Some(&phone)));
        assert!(!coordinator.is_router_online(Some(&MacAddr::from("00:00:00:00:00:00"))));
    }

    #[tokio::test]
    async fn test_failed_refresh_marks_everything_offline() {
        let (client, coordinator) = coordinator();
        coordinator.async_refresh().await.unwrap();

        client.set_reachable(false);
        assert!(coordinator.async_refresh().await.is_err());
        assert!(!coordinator.is_router_online(None));
        assert!(!coordinator.is_router_online(Some(&MacAddr::from("AA:BB:CC:DD:EE:01"))));
        // Last good snapshot is kept
        assert_eq!(coordinator.connected_devices().len(), 2);
    }

    #[tokio::test]
    async fn test_listeners_notified_on_success_and_failure() {
        let (client, coordinator) = coordinator();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let remove = coordinator.async_add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        coordinator.async_refresh().await.unwrap();
        client.set_reachable(false);
        let _ = coordinator.async_refresh().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(remove.remove());
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_device_info() {
        let (_client, coordinator) = coordinator();
        coordinator.async_refresh().await.unwrap();

        let primary = coordinator.get_device_info(None);
        assert!(primary
            .identifiers
            .contains(&(DOMAIN.to_string(), "SN0001".to_string())));
        assert_eq!(primary.model.as_deref(), Some("WS7200-20"));
        assert_eq!(primary.sw_version.as_deref(), Some("10.0.2"));
        assert_eq!(primary.configuration_url.as_deref(), Some("http://192.168.3.1:80"));

        let mesh = coordinator.get_device_info(Some(&MacAddr::from("AA:BB:CC:DD:EE:01")));
        assert_eq!(mesh.name.as_deref(), Some("Mesh-1"));
        assert!(mesh
            .connections
            .contains(&("mac".to_string(), "aa:bb:cc:dd:ee:01".to_string())));
        assert_eq!(
            mesh.via_device,
            Some((DOMAIN.to_string(), "SN0001".to_string()))
        );
    }

    #[tokio::test]
    async fn test_execute_action_forwards_to_client() {
        let (client, coordinator) = coordinator();
        let mac = MacAddr::from("AA:BB:CC:DD:EE:01");
        coordinator
            .execute_action(crate::client::ACTION_REBOOT, Some(&mac))
            .await
            .unwrap();
        assert_eq!(
            client.executed_actions(),
            vec![(crate::client::ACTION_REBOOT.to_string(), Some(mac))]
        );
    }
}
