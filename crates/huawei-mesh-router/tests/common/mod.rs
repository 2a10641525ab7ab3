//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ha_components::HomeAssistant;
use ha_config_entries::ConfigEntry;
use huawei_mesh_router::{
    ClientError, ConnectedDevice, MacAddr, RouterClient, RouterInfo, SimulatedRouterClient, DOMAIN,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub const MESH_1_MAC: &str = "AA:BB:CC:DD:EE:FF";
pub const COORDINATOR_UID: &str = "mesh_uid";

/// Primary router WS7200 with one satellite (Mesh-1) and one phone-like client
pub fn mesh_fixture() -> &'static str {
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mesh.yaml"))
}

pub fn simulated_client() -> Arc<SimulatedRouterClient> {
    Arc::new(SimulatedRouterClient::from_yaml_str(mesh_fixture()).unwrap())
}

/// Host handle bound to the test's runtime
pub fn test_hass() -> Arc<HomeAssistant> {
    Arc::new(HomeAssistant::new(Handle::current()))
}

pub fn mock_config_entry() -> ConfigEntry {
    let data: HashMap<String, serde_json::Value> = serde_json::from_value(json!({
        "name": "Huawei Router",
        "host": "192.168.3.1",
        "username": "admin",
        "password": "secret",
    }))
    .unwrap();
    ConfigEntry::new(DOMAIN, "Huawei Router")
        .with_unique_id(COORDINATOR_UID)
        .with_data(data)
}

pub fn satellite(mac: &str, name: &str) -> ConnectedDevice {
    ConnectedDevice::router(mac, name)
}

/// Wraps a client, counting calls and delaying actions
pub struct RecordingRouterClient {
    inner: Arc<SimulatedRouterClient>,
    action_delay: Duration,
    action_calls: AtomicUsize,
    completed_actions: AtomicUsize,
}

impl RecordingRouterClient {
    pub fn new(inner: Arc<SimulatedRouterClient>, action_delay: Duration) -> Self {
        Self {
            inner,
            action_delay,
            action_calls: AtomicUsize::new(0),
            completed_actions: AtomicUsize::new(0),
        }
    }

    pub fn action_calls(&self) -> usize {
        self.action_calls.load(Ordering::SeqCst)
    }

    pub fn completed_actions(&self) -> usize {
        self.completed_actions.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &SimulatedRouterClient {
        &self.inner
    }
}

#[async_trait]
impl RouterClient for RecordingRouterClient {
    async fn get_router_info(&self) -> Result<RouterInfo, ClientError> {
        self.inner.get_router_info().await
    }

    async fn get_connected_devices(&self) -> Result<Vec<ConnectedDevice>, ClientError> {
        self.inner.get_connected_devices().await
    }

    async fn execute_action(
        &self,
        action: &str,
        device_mac: Option<&MacAddr>,
    ) -> Result<(), ClientError> {
        self.action_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.action_delay).await;
        let result = self.inner.execute_action(action, device_mac).await;
        self.completed_actions.fetch_add(1, Ordering::SeqCst);
        result
    }
}
