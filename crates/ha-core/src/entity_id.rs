//! Entity IDs and entity ID generation
//!
//! An entity ID is a `domain.object_id` pair. Integrations rarely build one by
//! hand: they hand a preferred name to [`generate_entity_id`], which slugifies
//! it and appends `_2`, `_3`, ... until the ID no longer collides with one the
//! host already knows about.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder used in entity ID formats such as `"button.{}"`
const FORMAT_PLACEHOLDER: &str = "{}";

/// Object ID used when a preferred name slugifies to nothing
const EMPTY_SLUG: &str = "unknown";

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("domain '{0}' must be lowercase alphanumeric with single underscores")]
    InvalidDomainChars(String),

    #[error("object_id '{0}' must be lowercase alphanumeric with underscores")]
    InvalidObjectIdChars(String),

    #[error("entity_id format '{0}' has no '{{}}' placeholder")]
    MissingPlaceholder(String),
}

/// A validated entity ID such as `button.huawei_router_reboot_mesh_1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    /// Build an entity ID from its two halves, validating both
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if domain.contains("__") || !is_slug(&domain) {
            return Err(EntityIdError::InvalidDomainChars(domain));
        }
        if !is_slug(&object_id) {
            return Err(EntityIdError::InvalidObjectIdChars(object_id));
        }

        Ok(Self { domain, object_id })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

/// Lowercase ASCII alphanumerics and underscores, not starting or ending with `_`
fn is_slug(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(domain), Some(object_id), None) => Self::new(domain, object_id),
            _ => Err(EntityIdError::InvalidFormat),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

/// Turn a human-readable name into an object ID
///
/// Every run of characters that is not an ASCII letter or digit collapses into
/// a single `_`; leading and trailing separators are dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_');
    if trimmed.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Return `preferred` if it is free, otherwise the first free `preferred_N` (N >= 2)
pub fn ensure_unique_string(preferred: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(preferred) {
        return preferred.to_string();
    }
    let mut tries = 2;
    loop {
        let candidate = format!("{}_{}", preferred, tries);
        if !is_taken(&candidate) {
            return candidate;
        }
        tries += 1;
    }
}

/// Generate a free entity ID from a format like `"button.{}"` and a preferred name
///
/// `is_taken` reports whether an entity ID string is already in use.
pub fn generate_entity_id(
    entity_id_format: &str,
    name: &str,
    is_taken: impl Fn(&str) -> bool,
) -> Result<EntityId, EntityIdError> {
    if !entity_id_format.contains(FORMAT_PLACEHOLDER) {
        return Err(EntityIdError::MissingPlaceholder(
            entity_id_format.to_string(),
        ));
    }
    let preferred = entity_id_format.replacen(FORMAT_PLACEHOLDER, &slugify(name), 1);
    ensure_unique_string(&preferred, is_taken).parse()
}
