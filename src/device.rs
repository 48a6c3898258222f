//! Heat pump device integration
//!
//! The [`DeviceClient`] trait is the seam between the controller and the
//! vendor cloud API. [`SensiboClient`] is the production implementation.

use crate::engine::{Decision, PowerState};
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod sensibo;

pub use sensibo::SensiboClient;

/// HVAC mode sent with a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    Heat,
    Fan,
}

impl HvacMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HvacMode::Heat => "heat",
            HvacMode::Fan => "fan",
        }
    }
}

/// Device state as reported by the vendor API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceState {
    pub on: bool,
    pub target_temperature: Option<i32>,
    pub mode: Option<String>,
    pub fan_level: Option<String>,
    /// Measured room temperature in °C
    pub room_temperature: Option<f64>,
    /// Measured relative humidity in %
    pub humidity: Option<f64>,
}

impl DeviceState {
    pub fn power(&self) -> PowerState {
        if self.on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }

    /// Whether sending `cmd` would change nothing that matters
    pub fn satisfies(&self, cmd: &DeviceCommand) -> bool {
        if !cmd.on {
            return !self.on;
        }
        self.on
            && self.target_temperature == Some(cmd.target_temperature)
            && self
                .mode
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(cmd.mode.as_str()))
    }
}

/// Full desired state written to the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub on: bool,
    pub target_temperature: i32,
    pub mode: HvacMode,
}

impl DeviceCommand {
    /// Heat at the given temperature
    pub fn turn_on(target_temperature: i32) -> Self {
        Self {
            on: true,
            target_temperature,
            mode: HvacMode::Heat,
        }
    }

    /// Power off; target drops to the minimum and mode goes to fan
    pub fn turn_off(min_temperature: i32) -> Self {
        Self {
            on: false,
            target_temperature: min_temperature,
            mode: HvacMode::Fan,
        }
    }

    /// Command for a decision, `None` for [`Decision::NoChange`]
    pub fn from_decision(decision: &Decision, min_temperature: i32) -> Option<Self> {
        match decision {
            Decision::TurnOn { target_temperature } => Some(Self::turn_on(*target_temperature)),
            Decision::TurnOff => Some(Self::turn_off(min_temperature)),
            Decision::NoChange => None,
        }
    }

    pub fn power(&self) -> PowerState {
        if self.on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

/// Read and write access to the heat pump
#[async_trait::async_trait]
pub trait DeviceClient: Send + Sync {
    /// Current state (temperature, on/off)
    async fn read_state(&self) -> Result<DeviceState>;

    /// Send a command
    async fn apply(&self, command: &DeviceCommand) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_decision() {
        let on = DeviceCommand::from_decision(
            &Decision::TurnOn {
                target_temperature: 22,
            },
            10,
        )
        .unwrap();
        assert!(on.on);
        assert_eq!(on.target_temperature, 22);
        assert_eq!(on.mode, HvacMode::Heat);

        let off = DeviceCommand::from_decision(&Decision::TurnOff, 10).unwrap();
        assert!(!off.on);
        assert_eq!(off.target_temperature, 10);
        assert_eq!(off.mode, HvacMode::Fan);

        assert!(DeviceCommand::from_decision(&Decision::NoChange, 10).is_none());
    }

    #[test]
    fn satisfies_compares_relevant_fields() {
        let heating = DeviceState {
            on: true,
            target_temperature: Some(22),
            mode: Some("heat".into()),
            ..Default::default()
        };
        assert!(heating.satisfies(&DeviceCommand::turn_on(22)));
        assert!(!heating.satisfies(&DeviceCommand::turn_on(21)));
        assert!(!heating.satisfies(&DeviceCommand::turn_off(10)));

        let cooling = DeviceState {
            mode: Some("cool".into()),
            ..heating.clone()
        };
        assert!(!cooling.satisfies(&DeviceCommand::turn_on(22)));

        let off = DeviceState::default();
        assert!(off.satisfies(&DeviceCommand::turn_off(10)));
        assert_eq!(off.power(), PowerState::Off);
    }
}
