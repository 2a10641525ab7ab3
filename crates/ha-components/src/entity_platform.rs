//! Entity platform: the host side of one integration's entities in one domain
//!
//! The platform accepts entities from an integration, claims their entity IDs,
//! renders their state, and tears them down again when the config entry
//! unloads.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use ha_core::{EntityId, STATE_UNAVAILABLE, STATE_UNKNOWN};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::entity::{Entity, WriteState};
use crate::hass::HomeAssistant;

/// Callback integrations use to hand new entities to the host
pub type AddEntitiesCallback<E> = Arc<dyn Fn(Vec<Arc<E>>) + Send + Sync>;

/// Rendered state of one entity
#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    pub entity_id: EntityId,
    pub state: String,
    pub attributes: HashMap<String, serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }
}

/// Entities of one domain (e.g. `button`) provided by one integration
pub struct EntityPlatform<E: ?Sized + Entity> {
    hass: Arc<HomeAssistant>,
    /// Entity domain, e.g. "button"
    domain: String,
    /// Integration providing the entities, e.g. "huawei_mesh_router"
    platform_name: String,
    entities: DashMap<EntityId, Arc<E>>,
    unique_ids: DashSet<String>,
    states: DashMap<EntityId, EntityState>,
}

impl<E: ?Sized + Entity> std::fmt::Debug for EntityPlatform<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityPlatform")
            .field("domain", &self.domain)
            .field("platform_name", &self.platform_name)
            .field("entities", &self.entities.len())
            .finish()
    }
}

impl<E: ?Sized + Entity + 'static> EntityPlatform<E> {
    pub fn new(
        hass: Arc<HomeAssistant>,
        domain: impl Into<String>,
        platform_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            hass,
            domain: domain.into(),
            platform_name: platform_name.into(),
            entities: DashMap::new(),
            unique_ids: DashSet::new(),
            states: DashMap::new(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    /// Callback form of [`EntityPlatform::add_entities`] for integration setup
    pub fn add_entities_callback(self: &Arc<Self>) -> AddEntitiesCallback<E> {
        let platform = self.clone();
        Arc::new(move |entities| {
            platform.add_entities(entities);
        })
    }

    /// Add entities to the host; returns how many were accepted
    ///
    /// An entity is ignored when its unique ID was already provided by this
    /// platform, or when its entity ID is already in use.
    #[instrument(skip(self, new_entities), fields(platform = %self.platform_name, domain = %self.domain))]
    pub fn add_entities(self: &Arc<Self>, new_entities: Vec<Arc<E>>) -> usize {
        let mut accepted = 0;

        for entity in new_entities {
            let entity_id = entity.entity_id().clone();

            if let Some(unique_id) = entity.unique_id() {
                if !self.unique_ids.insert(unique_id.to_string()) {
                    warn!(
                        %entity_id,
                        unique_id,
                        "Platform does not generate unique IDs, ID already exists - ignoring"
                    );
                    continue;
                }
            }

            if !self.hass.claim_entity_id(&entity_id) {
                warn!(%entity_id, "Entity id already exists - ignoring");
                if let Some(unique_id) = entity.unique_id() {
                    self.unique_ids.remove(unique_id);
                }
                continue;
            }

            self.entities.insert(entity_id.clone(), entity.clone());
            entity.added_to_hass(self.state_writer(&entity));
            self.write_state(entity.as_ref());
            debug!(%entity_id, "Added entity");
            accepted += 1;
        }

        accepted
    }

    fn state_writer(self: &Arc<Self>, entity: &Arc<E>) -> WriteState {
        let platform = Arc::downgrade(self);
        let entity = Arc::downgrade(entity);
        Arc::new(move || {
            if let (Some(platform), Some(entity)) = (platform.upgrade(), entity.upgrade()) {
                platform.write_state(entity.as_ref());
            }
        })
    }

    /// Render the entity's current state and attributes
    pub fn write_state(&self, entity: &E) {
        let entity_id = entity.entity_id().clone();
        if !self.entities.contains_key(&entity_id) {
            return;
        }

        let state = if entity.available() {
            entity.state().unwrap_or_else(|| STATE_UNKNOWN.to_string())
        } else {
            STATE_UNAVAILABLE.to_string()
        };

        let mut attributes = HashMap::new();
        if let Some(name) = entity.name() {
            attributes.insert("friendly_name".to_string(), json!(name));
        }
        if let Some(icon) = entity.icon() {
            attributes.insert("icon".to_string(), json!(icon));
        }
        if let Some(device_class) = entity.device_class() {
            attributes.insert("device_class".to_string(), json!(device_class));
        }

        self.states.insert(
            entity_id.clone(),
            EntityState {
                entity_id,
                state,
                attributes,
                last_updated: Utc::now(),
            },
        );
    }

    pub fn state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<Arc<E>> {
        self.entities.get(entity_id).map(|e| e.value().clone())
    }

    /// All entities, ordered by entity ID
    pub fn entities(&self) -> Vec<Arc<E>> {
        let mut entities: Vec<(EntityId, Arc<E>)> = self
            .entities
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entities.sort_by(|a, b| a.0.cmp(&b.0));
        entities.into_iter().map(|(_, e)| e).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Remove every entity, releasing their entity IDs
    pub fn async_reset(&self) -> usize {
        let ids: Vec<EntityId> = self.entities.iter().map(|r| r.key().clone()).collect();
        for entity_id in &ids {
            if let Some((_, entity)) = self.entities.remove(entity_id) {
                entity.will_remove_from_hass();
            }
            self.states.remove(entity_id);
            self.hass.release_entity_id(entity_id);
        }
        self.unique_ids.clear();
        info!(
            platform = %self.platform_name,
            domain = %self.domain,
            removed = ids.len(),
            "Reset entity platform"
        );
        ids.len()
    }
}
