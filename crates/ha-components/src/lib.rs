//! Home Assistant entity components
//!
//! The pieces of the host an integration platform talks to: the
//! [`HomeAssistant`] handle, the [`Entity`] and [`ButtonEntity`] capability
//! traits, the [`EntityPlatform`] that owns added entities, coordinator
//! [`UpdateListeners`], and the blocking [`run_coroutine_threadsafe`] bridge.

mod async_bridge;
pub mod button;
mod entity;
mod entity_platform;
mod hass;
mod update_coordinator;

pub use async_bridge::run_coroutine_threadsafe;
pub use button::{ButtonDeviceClass, ButtonEntity};
pub use entity::{DeviceInfo, Entity, WriteState, CONNECTION_NETWORK_MAC};
pub use entity_platform::{AddEntitiesCallback, EntityPlatform, EntityState};
pub use hass::{EntryData, HomeAssistant};
pub use update_coordinator::{ListenerId, RemoveListener, UpdateListener, UpdateListeners};
