//! Lifecycle transitions of a config entry
//!
//! ```text
//! NotLoaded -> SetupInProgress -> Loaded -> UnloadInProgress -> NotLoaded
//!                    |                            |
//!                    v                            v
//!               SetupError (retry or unload)  FailedUnload
//! ```

use crate::entry::ConfigEntryState;
use thiserror::Error;

/// A lifecycle step the entry is not allowed to take
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("config entry cannot go from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: ConfigEntryState,
    pub to: ConfigEntryState,
    pub reason: &'static str,
}

impl ConfigEntryState {
    /// The state after moving to `to`, if that step is allowed
    pub fn try_transition(self, to: ConfigEntryState) -> Result<ConfigEntryState, InvalidTransition> {
        use ConfigEntryState::*;

        let reason = match (self, to) {
            (NotLoaded, SetupInProgress)
            | (SetupInProgress, Loaded | SetupError)
            | (SetupError, SetupInProgress | UnloadInProgress)
            | (Loaded, UnloadInProgress)
            | (UnloadInProgress, NotLoaded | FailedUnload) => return Ok(to),
            (FailedUnload, _) => "a failed unload is final",
            (NotLoaded, Loaded) => "setup has not run",
            (Loaded, SetupInProgress) => "entry is already loaded",
            (Loaded, NotLoaded) => "entry must be unloaded first",
            (NotLoaded, UnloadInProgress) => "entry was never set up",
            _ => "transition not allowed",
        };

        Err(InvalidTransition {
            from: self,
            to,
            reason,
        })
    }

    pub fn can_transition_to(self, to: ConfigEntryState) -> bool {
        self.try_transition(to).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigEntryState::*;

    #[test]
    fn test_setup_and_unload_path() {
        assert!(NotLoaded.can_transition_to(SetupInProgress));
        assert!(SetupInProgress.can_transition_to(Loaded));
        assert!(Loaded.can_transition_to(UnloadInProgress));
        assert!(UnloadInProgress.can_transition_to(NotLoaded));
    }

    #[test]
    fn test_setup_error_can_retry_or_unload() {
        assert!(SetupInProgress.can_transition_to(SetupError));
        assert!(SetupError.can_transition_to(SetupInProgress));
        assert!(SetupError.can_transition_to(UnloadInProgress));
    }

    #[test]
    fn test_invalid_transitions() {
        let err = NotLoaded.try_transition(Loaded).unwrap_err();
        assert_eq!(err.reason, "setup has not run");
        assert_eq!(
            Loaded.try_transition(SetupInProgress).unwrap_err().reason,
            "entry is already loaded"
        );
        assert!(!Loaded.can_transition_to(NotLoaded));
        assert!(!FailedUnload.can_transition_to(NotLoaded));
    }
}
