//! Home Assistant Rust Server
//!
//! Runs the Huawei mesh router integration against a simulated mesh and
//! keeps refreshing it until Ctrl-C.
//!
//! Usage: `homeassistant [CONFIG]`, where `CONFIG` defaults to
//! `$HA_MESH_CONFIG` or `config/mesh.yaml`.

use anyhow::{Context, Result};
use ha_components::{ButtonEntity, Entity, HomeAssistant};
use ha_config_entries::{ConfigEntry, ConfigEntrySource};
use ha_core::EntityId;
use huawei_mesh_router::{
    async_setup_entry, async_unload_entry, ButtonPlatform, MeshRouterConfig, SimulatedRouter,
    SimulatedRouterClient, DOMAIN,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG: &str = "config/mesh.yaml";

/// Contents of the demo configuration file
#[derive(Debug, Deserialize)]
struct DemoConfig {
    /// Stored as the config entry's data
    #[serde(default)]
    huawei_mesh_router: HashMap<String, serde_json::Value>,

    /// Buttons pressed once after setup
    #[serde(default)]
    press: Vec<EntityId>,

    simulator: SimulatedRouter,
}

impl DemoConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HA_MESH_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string())
        .into()
}

fn log_states(platform: &ButtonPlatform) {
    for entity in platform.entities() {
        if let Some(state) = platform.state(entity.entity_id()) {
            info!(entity_id = %state.entity_id, state = %state.state, "Button state");
        }
    }
}

/// Press from a blocking thread, the way a synchronous caller would
async fn press(platform: &ButtonPlatform, entity_id: &EntityId) -> Result<()> {
    let button = platform
        .get(entity_id)
        .with_context(|| format!("no button {}", entity_id))?;
    tokio::task::spawn_blocking(move || button.press()).await??;
    info!(%entity_id, "Button pressed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Home Assistant (Rust)");

    let path = config_path();
    let config = DemoConfig::load(&path)?;
    info!(path = %path.display(), "Loaded configuration");

    let mut entry = ConfigEntry::new(DOMAIN, "Huawei Router")
        .with_data(config.huawei_mesh_router)
        .with_source(ConfigEntrySource::Import);
    let router_config = MeshRouterConfig::from_entry(&entry)?;
    let scan_interval = router_config.scan_interval;

    let hass = Arc::new(HomeAssistant::new(Handle::current()));
    let client =
        Arc::new(SimulatedRouterClient::new(config.simulator).with_host(router_config.host));

    let platform = async_setup_entry(&hass, &mut entry, client).await?;
    log_states(&platform);

    for entity_id in &config.press {
        if let Err(err) = press(&platform, entity_id).await {
            warn!(%entity_id, %err, "Press failed");
        }
    }

    info!(scan_interval, "Home Assistant is running");

    let coordinator = huawei_mesh_router::coordinator(&hass, &entry.entry_id)
        .context("coordinator missing after setup")?;
    let mut interval = tokio::time::interval(Duration::from_secs(scan_interval));
    // The first tick completes immediately and setup already refreshed
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = coordinator.async_refresh().await {
                    error!(%err, "Refresh failed");
                }
                log_states(&platform);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Shutting down...");
    async_unload_entry(&hass, &mut entry).await?;

    Ok(())
}
