//! Button entity domain
//!
//! A button is a stateless, pressable command. The host calls
//! [`ButtonEntity::async_press`] from its runtime; code running on other
//! threads uses the blocking [`ButtonEntity::press`].

use async_trait::async_trait;
use ha_core::HomeAssistantResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entity::Entity;

pub const DOMAIN: &str = "button";

/// Entity ID format for buttons, filled in by `generate_entity_id`
pub const ENTITY_ID_FORMAT: &str = "button.{}";

/// What pressing the button does, used to pick an icon in the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonDeviceClass {
    Identify,
    Restart,
    Update,
}

impl ButtonDeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonDeviceClass::Identify => "identify",
            ButtonDeviceClass::Restart => "restart",
            ButtonDeviceClass::Update => "update",
        }
    }
}

impl fmt::Display for ButtonDeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonDeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identify" => Ok(ButtonDeviceClass::Identify),
            "restart" => Ok(ButtonDeviceClass::Restart),
            "update" => Ok(ButtonDeviceClass::Update),
            other => Err(format!("unknown button device class: {}", other)),
        }
    }
}

/// A pressable entity
#[async_trait]
pub trait ButtonEntity: Entity {
    /// Press the button from within the runtime
    async fn async_press(&self) -> HomeAssistantResult<()>;

    /// Press the button from a thread outside the runtime, blocking until done
    fn press(&self) -> HomeAssistantResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_strings() {
        assert_eq!(ButtonDeviceClass::Restart.as_str(), "restart");
        assert_eq!(
            "identify".parse::<ButtonDeviceClass>().unwrap(),
            ButtonDeviceClass::Identify
        );
        assert!("reboot".parse::<ButtonDeviceClass>().is_err());
        assert_eq!(
            serde_json::to_string(&ButtonDeviceClass::Update).unwrap(),
            "\"update\""
        );
    }
}
