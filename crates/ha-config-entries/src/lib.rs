//! Config Entries
//!
//! Config entries represent individual integration instances and carry their
//! lifecycle state plus the cleanup callbacks registered during setup.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntryState`] - Lifecycle state of an entry

pub mod entry;
pub mod state_machine;

pub use entry::{
    ConfigEntry, ConfigEntrySource, ConfigEntryState, UnloadCallback, UnloadCallbacks,
};
pub use state_machine::InvalidTransition;
