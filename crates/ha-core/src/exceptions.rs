//! Errors raised across the host/integration boundary

use thiserror::Error;

use crate::EntityIdError;

/// Boxed error coming out of an integration (client failures, rejected commands)
pub type IntegrationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error surfaced to the host when an integration operation fails
#[derive(Debug, Error)]
pub enum HomeAssistantError {
    /// Setup of a config entry could not complete
    #[error("setup of {domain} entry {entry_id} failed: {reason}")]
    SetupFailed {
        domain: String,
        entry_id: String,
        reason: String,
    },

    /// No runtime data was stored for the entry under the integration's domain
    #[error("no {domain} data stored for config entry {entry_id}")]
    MissingEntryData { domain: String, entry_id: String },

    /// A synchronous entry point could not hand work to the runtime
    #[error("event loop unavailable: {0}")]
    EventLoop(String),

    #[error(transparent)]
    EntityId(#[from] EntityIdError),

    /// Failure raised by the integration itself, passed through untouched
    #[error(transparent)]
    Integration(IntegrationError),
}

impl HomeAssistantError {
    /// Wrap any integration error without translating it
    pub fn integration(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Integration(Box::new(err))
    }
}

pub type HomeAssistantResult<T> = Result<T, HomeAssistantError>;
