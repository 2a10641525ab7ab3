//! Huawei mesh router integration
//!
//! Exposes a reboot button for the primary router and for every satellite
//! router of the mesh. A [`MeshRouterCoordinator`] polls the router through a
//! [`RouterClient`]; the button platform mirrors the satellites it reports.
//!
//! # Lifecycle
//!
//! [`async_setup_entry`] reads the entry configuration, performs the first
//! refresh, stores the coordinator in `hass.data[DOMAIN][entry_id]` and sets
//! up the button platform. [`async_unload_entry`] undoes all of it.

pub mod button;
pub mod classes;
pub mod client;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod simulator;
pub mod watcher;

pub use button::{ButtonFunction, ButtonPlatform, HuaweiButton, REBOOT};
pub use classes::ConnectedDevice;
pub use client::{ClientError, MacAddr, RouterClient, RouterInfo, ACTION_REBOOT};
pub use config::{ConfigError, MeshRouterConfig};
pub use constants::DOMAIN;
pub use coordinator::MeshRouterCoordinator;
pub use simulator::{SimulatedRouter, SimulatedRouterClient, SimulatorError};
pub use watcher::{RouterChanges, RoutersWatcher};

use ha_components::button::DOMAIN as BUTTON_DOMAIN;
use ha_components::HomeAssistant;
use ha_config_entries::{ConfigEntry, ConfigEntryState};
use ha_core::{HomeAssistantError, HomeAssistantResult};
use std::sync::Arc;
use tracing::{error, info, instrument};

fn setup_failed(entry: &ConfigEntry, reason: impl ToString) -> HomeAssistantError {
    HomeAssistantError::SetupFailed {
        domain: DOMAIN.to_string(),
        entry_id: entry.entry_id.clone(),
        reason: reason.to_string(),
    }
}

fn set_state(
    entry: &mut ConfigEntry,
    state: ConfigEntryState,
    reason: Option<String>,
) -> HomeAssistantResult<()> {
    entry
        .try_set_state(state, reason)
        .map_err(|err| setup_failed(entry, err))
}

/// Coordinator of a set-up entry
pub fn coordinator(hass: &HomeAssistant, entry_id: &str) -> Option<Arc<MeshRouterCoordinator>> {
    hass.entry_data::<MeshRouterCoordinator>(DOMAIN, entry_id)
}

/// Button platform of a set-up entry
pub fn button_platform(hass: &HomeAssistant, entry_id: &str) -> Option<Arc<ButtonPlatform>> {
    hass.entry_data::<ButtonPlatform>(BUTTON_DOMAIN, entry_id)
}

/// Set up a config entry against `client`
///
/// On failure the entry ends in `SetupError` with the reason recorded, and
/// anything already registered for it is torn down again.
#[instrument(skip_all, fields(entry_id = %entry.entry_id))]
pub async fn async_setup_entry(
    hass: &Arc<HomeAssistant>,
    entry: &mut ConfigEntry,
    client: Arc<dyn RouterClient>,
) -> HomeAssistantResult<Arc<ButtonPlatform>> {
    set_state(entry, ConfigEntryState::SetupInProgress, None)?;

    match setup(hass, entry, client).await {
        Ok(platform) => {
            set_state(entry, ConfigEntryState::Loaded, None)?;
            info!(title = %entry.title, buttons = platform.len(), "Config entry loaded");
            Ok(platform)
        }
        Err(err) => {
            error!(%err, "Error setting up config entry");
            teardown(hass, entry);
            set_state(entry, ConfigEntryState::SetupError, Some(err.to_string()))?;
            Err(err)
        }
    }
}

async fn setup(
    hass: &Arc<HomeAssistant>,
    entry: &ConfigEntry,
    client: Arc<dyn RouterClient>,
) -> HomeAssistantResult<Arc<ButtonPlatform>> {
    let config = MeshRouterConfig::from_entry(entry).map_err(|err| setup_failed(entry, err))?;

    let coordinator = Arc::new(MeshRouterCoordinator::new(&config, entry, client));
    coordinator
        .async_config_entry_first_refresh()
        .await
        .map_err(|err| setup_failed(entry, err))?;
    hass.store_entry_data(DOMAIN, &entry.entry_id, coordinator);

    let platform = ButtonPlatform::new(hass.clone(), BUTTON_DOMAIN, DOMAIN);
    hass.store_entry_data(BUTTON_DOMAIN, &entry.entry_id, platform.clone());
    button::async_setup_entry(hass, entry, platform.add_entities_callback()).await?;

    Ok(platform)
}

fn teardown(hass: &HomeAssistant, entry: &ConfigEntry) {
    entry.run_unload_callbacks();
    if let Some(platform) = button_platform(hass, &entry.entry_id) {
        platform.async_reset();
    }
    hass.remove_entry_data(BUTTON_DOMAIN, &entry.entry_id);
    hass.remove_entry_data(DOMAIN, &entry.entry_id);
}

/// Unload a loaded (or failed) config entry
///
/// Stops router discovery, removes every button and drops the coordinator.
#[instrument(skip_all, fields(entry_id = %entry.entry_id))]
pub async fn async_unload_entry(
    hass: &Arc<HomeAssistant>,
    entry: &mut ConfigEntry,
) -> HomeAssistantResult<()> {
    set_state(entry, ConfigEntryState::UnloadInProgress, None)?;
    teardown(hass, entry);
    set_state(entry, ConfigEntryState::NotLoaded, None)?;
    info!(title = %entry.title, "Config entry unloaded");
    Ok(())
}
