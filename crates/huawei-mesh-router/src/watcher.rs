//! Tracks which satellite routers are present between refreshes

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::classes::ConnectedDevice;
use crate::client::MacAddr;

/// Routers that appeared or disappeared since the previous look
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouterChanges {
    pub added: Vec<ConnectedDevice>,
    pub removed: Vec<MacAddr>,
}

impl RouterChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Diffs the router entries of successive device lists
#[derive(Debug, Default)]
pub struct RoutersWatcher {
    present: HashSet<MacAddr>,
}

impl RoutersWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `devices` with what was seen last time and remember the new set
    ///
    /// Non-router devices and records without an address are ignored. Added
    /// routers come back ordered by address.
    pub fn look_for_changes(&mut self, devices: &[ConnectedDevice]) -> RouterChanges {
        let mut current: BTreeMap<MacAddr, &ConnectedDevice> = BTreeMap::new();
        for device in devices.iter().filter(|d| d.is_router) {
            if device.mac.is_blank() {
                debug!(name = %device.name, "Skipping router without a hardware address");
                continue;
            }
            current.entry(device.mac.clone()).or_insert(device);
        }

        let added: Vec<ConnectedDevice> = current
            .iter()
            .filter(|(mac, _)| !self.present.contains(*mac))
            .map(|(_, device)| (*device).clone())
            .collect();

        let mut removed: Vec<MacAddr> = self
            .present
            .iter()
            .filter(|mac| !current.contains_key(*mac))
            .cloned()
            .collect();
        removed.sort();

        self.present = current.into_keys().collect();
        RouterChanges { added, removed }
    }

    /// Routers present at the last look
    pub fn present(&self) -> usize {
        self.present.len()
    }
}
