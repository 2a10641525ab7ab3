//! Config entries
//!
//! One entry is one configured router: its connection data, the options the
//! user changed afterwards, where it is in its lifecycle, and the cleanup
//! that has to happen when it goes away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::state_machine::InvalidTransition;

/// Where an entry is in its setup/unload lifecycle
///
/// Transitions are validated by [`ConfigEntryState::try_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    #[default]
    NotLoaded,
    SetupInProgress,
    Loaded,
    /// Setup raised; the entry may be set up again
    SetupError,
    UnloadInProgress,
    /// Terminal
    FailedUnload,
}

/// How the entry was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    #[default]
    User,
    /// Read from a configuration file at startup
    Import,
}

/// Callback run once when the entry unloads
pub type UnloadCallback = Box<dyn FnOnce() + Send + 'static>;

/// Unload callbacks shared between clones of one entry
#[derive(Clone, Default)]
pub struct UnloadCallbacks(Arc<Mutex<Vec<UnloadCallback>>>);

impl UnloadCallbacks {
    fn push(&self, callback: UnloadCallback) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    fn take(&self) -> Vec<UnloadCallback> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for UnloadCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnloadCallbacks({})", self.len())
    }
}

/// A configured instance of an integration
///
/// Clones share their unload callbacks, so a callback registered through any
/// clone runs when any of them is unloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// ULID assigned at creation
    pub entry_id: String,

    /// Integration that owns the entry, e.g. "huawei_mesh_router"
    pub domain: String,

    pub title: String,

    /// Settings captured when the entry was created
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// Settings changed later; these win over `data`
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,

    /// Identifies the configured device across re-creations of the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub source: ConfigEntrySource,

    #[serde(skip, default)]
    pub state: ConfigEntryState,

    /// Why the entry is in a failed state
    #[serde(skip, default)]
    pub reason: Option<String>,

    #[serde(skip)]
    on_unload: UnloadCallbacks,

    /// Last lifecycle or content change
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            unique_id: None,
            source: ConfigEntrySource::default(),
            state: ConfigEntryState::default(),
            reason: None,
            on_unload: UnloadCallbacks::default(),
            modified_at: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_options(mut self, options: HashMap<String, serde_json::Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ConfigEntryState::Loaded
    }

    /// Register a callback to run when the entry is unloaded
    ///
    /// Typically the removal handle of a listener subscribed during setup.
    pub fn async_on_unload(&self, callback: impl FnOnce() + Send + 'static) {
        self.on_unload.push(Box::new(callback));
    }

    /// Number of callbacks waiting for unload
    pub fn pending_unload_callbacks(&self) -> usize {
        self.on_unload.len()
    }

    /// Run and discard every registered unload callback, newest first
    pub fn run_unload_callbacks(&self) -> usize {
        let mut callbacks = self.on_unload.take();
        let count = callbacks.len();
        debug!(entry_id = %self.entry_id, count, "Running unload callbacks");
        while let Some(callback) = callbacks.pop() {
            callback();
        }
        count
    }

    /// Move to `new_state`, recording `reason`; the state is unchanged on error
    pub fn try_set_state(
        &mut self,
        new_state: ConfigEntryState,
        reason: Option<String>,
    ) -> Result<(), InvalidTransition> {
        if let Err(err) = self.state.try_transition(new_state) {
            warn!(entry_id = %self.entry_id, %err, "Rejected config entry transition");
            return Err(err);
        }
        self.state = new_state;
        self.reason = reason;
        self.modified_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_config_entry_new() {
        let entry = ConfigEntry::new("huawei_mesh_router", "Huawei Router");
        assert_eq!(entry.domain, "huawei_mesh_router");
        assert_eq!(entry.title, "Huawei Router");
        assert_eq!(entry.state, ConfigEntryState::NotLoaded);
        assert!(!entry.entry_id.is_empty());
        assert_eq!(entry.pending_unload_callbacks(), 0);
    }

    #[test]
    fn test_unload_callbacks_run_once_newest_first() {
        let entry = ConfigEntry::new("test", "Test");
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 1..=3 {
            let order = order.clone();
            entry.async_on_unload(move || order.lock().unwrap().push(n));
        }
        assert_eq!(entry.pending_unload_callbacks(), 3);

        assert_eq!(entry.run_unload_callbacks(), 3);
        assert_eq!(*order.lock().unwrap(), vec![3, 2, 1]);

        assert_eq!(entry.run_unload_callbacks(), 0);
        assert_eq!(order.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_unload_callbacks_shared_between_clones() {
        let entry = ConfigEntry::new("test", "Test");
        let clone = entry.clone();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        clone.async_on_unload(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        entry.run_unload_callbacks();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_set_state() {
        let mut entry = ConfigEntry::new("test", "Test");
        entry
            .try_set_state(ConfigEntryState::SetupInProgress, None)
            .unwrap();
        entry.try_set_state(ConfigEntryState::Loaded, None).unwrap();
        assert!(entry.is_loaded());

        let err = entry
            .try_set_state(ConfigEntryState::SetupInProgress, None)
            .unwrap_err();
        assert_eq!(err.from, ConfigEntryState::Loaded);
        assert!(entry.is_loaded());
    }

    #[test]
    fn test_serde_skips_runtime_fields() {
        let entry = ConfigEntry::new("test", "Test Entry")
            .with_unique_id("serial-123")
            .with_source(ConfigEntrySource::Import);
        entry.async_on_unload(|| {});

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: ConfigEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.unique_id, Some("serial-123".to_string()));
        assert_eq!(parsed.source, ConfigEntrySource::Import);
        assert_eq!(parsed.state, ConfigEntryState::NotLoaded);
        assert_eq!(parsed.pending_unload_callbacks(), 0);
    }
}
