//! In-memory router used by the demo binary and tests
//!
//! The router and its device list are described in YAML:
//!
//! ```yaml
//! router:
//!   name: WS7200
//!   model: WS7200-20
//!   serial_number: SN0001
//! devices:
//!   - name: Mesh-1
//!     mac: "AA:BB:CC:DD:EE:01"
//!     is_router: true
//!     is_active: true
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

use crate::classes::ConnectedDevice;
use crate::client::{ClientError, MacAddr, RouterClient, RouterInfo, ACTION_REBOOT};

/// Errors loading a simulated router description
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse router description: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Serialized description of a simulated mesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedRouter {
    pub router: RouterInfo,
    #[serde(default)]
    pub devices: Vec<ConnectedDevice>,
}

#[derive(Debug)]
struct SimulatorState {
    mesh: SimulatedRouter,
    reachable: bool,
    executed: Vec<(String, Option<MacAddr>)>,
}

/// A [`RouterClient`] answering from an in-memory device list
#[derive(Debug)]
pub struct SimulatedRouterClient {
    host: String,
    state: Mutex<SimulatorState>,
}

impl SimulatedRouterClient {
    pub fn new(mesh: SimulatedRouter) -> Self {
        Self {
            host: "simulator".to_string(),
            state: Mutex::new(SimulatorState {
                mesh,
                reachable: true,
                executed: Vec::new(),
            }),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SimulatorError> {
        Ok(Self::new(serde_yaml::from_str(yaml)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| SimulatorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Make every call fail as if the router were offline
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Returns false when no device has `mac`
    pub fn set_device_active(&self, mac: &MacAddr, is_active: bool) -> bool {
        let mut state = self.lock();
        match state.mesh.devices.iter_mut().find(|d| &d.mac == mac) {
            Some(device) => {
                device.is_active = is_active;
                true
            }
            None => false,
        }
    }

    /// Add a device, replacing any device with the same address
    pub fn add_device(&self, device: ConnectedDevice) {
        let mut state = self.lock();
        state.mesh.devices.retain(|d| d.mac != device.mac);
        state.mesh.devices.push(device);
    }

    pub fn remove_device(&self, mac: &MacAddr) -> bool {
        let mut state = self.lock();
        let before = state.mesh.devices.len();
        state.mesh.devices.retain(|d| &d.mac != mac);
        state.mesh.devices.len() != before
    }

    /// Every action executed so far, oldest first
    pub fn executed_actions(&self) -> Vec<(String, Option<MacAddr>)> {
        self.lock().executed.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_reachable(&self, state: &SimulatorState) -> Result<(), ClientError> {
        if state.reachable {
            Ok(())
        } else {
            Err(ClientError::Unreachable {
                host: self.host.clone(),
                reason: "simulated outage".to_string(),
            })
        }
    }
}

#[async_trait]
impl RouterClient for SimulatedRouterClient {
    async fn get_router_info(&self) -> Result<RouterInfo, ClientError> {
        let state = self.lock();
        self.ensure_reachable(&state)?;
        Ok(state.mesh.router.clone())
    }

    async fn get_connected_devices(&self) -> Result<Vec<ConnectedDevice>, ClientError> {
        let state = self.lock();
        self.ensure_reachable(&state)?;
        debug!(count = state.mesh.devices.len(), "Simulated device list");
        Ok(state.mesh.devices.clone())
    }

    async fn execute_action(
        &self,
        action: &str,
        device_mac: Option<&MacAddr>,
    ) -> Result<(), ClientError> {
        let mut state = self.lock();
        self.ensure_reachable(&state)?;

        if action != ACTION_REBOOT {
            return Err(ClientError::UnknownAction(action.to_string()));
        }
        if let Some(mac) = device_mac {
            if !state.mesh.devices.iter().any(|d| &d.mac == mac) {
                return Err(ClientError::UnknownDevice(mac.clone()));
            }
        }

        info!(action, mac = ?device_mac.map(MacAddr::as_str), "Simulated router executed action");
        state
            .executed
            .push((action.to_string(), device_mac.cloned()));
        Ok(())
    }
}
