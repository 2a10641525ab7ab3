//! Core types for Home Assistant
//!
//! This crate provides the fundamental types shared by the host and its
//! integrations: validated entity IDs, entity ID generation, and the error
//! type surfaced to the host when an integration operation fails.

mod entity_id;
mod exceptions;

pub use entity_id::{ensure_unique_string, generate_entity_id, slugify, EntityId, EntityIdError};
pub use exceptions::{HomeAssistantError, HomeAssistantResult, IntegrationError};

/// State reported for an entity whose device cannot be reached
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State reported for an entity that has no value yet
pub const STATE_UNKNOWN: &str = "unknown";
