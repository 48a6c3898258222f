//! Price-threshold decision logic for Heatgate
//!
//! Maps the current electricity price and the configured thresholds to a
//! heat pump command. The engine is stateless: holding the previously
//! commanded state on [`Decision::NoChange`] is the controller's job.

use crate::config::Config;
use crate::error::{HeatgateError, Result};
use crate::logging::get_logger;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Start/stop price boundaries in öre/kWh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Thresholds {
    /// Prices at or below this turn the heat pump on
    pub start_price: f64,

    /// Prices at or above this turn the heat pump off
    pub stop_price: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            start_price: 5.0,
            stop_price: 5.0,
        }
    }
}

impl Thresholds {
    /// Create validated thresholds
    pub fn new(start_price: f64, stop_price: f64) -> Result<Self> {
        let thresholds = Self {
            start_price,
            stop_price,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Both values finite and `start_price <= stop_price`
    pub fn validate(&self) -> Result<()> {
        if !self.start_price.is_finite() {
            return Err(HeatgateError::validation(
                "thresholds.start_price",
                "Must be a finite number",
            ));
        }
        if !self.stop_price.is_finite() {
            return Err(HeatgateError::validation(
                "thresholds.stop_price",
                "Must be a finite number",
            ));
        }
        if self.start_price > self.stop_price {
            return Err(HeatgateError::validation(
                "thresholds",
                format!(
                    "start_price ({}) must not exceed stop_price ({})",
                    self.start_price, self.stop_price
                ),
            ));
        }
        Ok(())
    }
}

/// Requested power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Off => "off",
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Switch on (heat) at the given target temperature
    TurnOn { target_temperature: i32 },

    /// Switch off
    TurnOff,

    /// Hold whatever was last commanded
    NoChange,
}

impl Decision {
    /// Power state this decision asks for, if any
    pub fn target_state(&self) -> Option<PowerState> {
        match self {
            Decision::TurnOn { .. } => Some(PowerState::On),
            Decision::TurnOff => Some(PowerState::Off),
            Decision::NoChange => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Decision::TurnOn { target_temperature } => {
                format!("turn on at {}°C", target_temperature)
            }
            Decision::TurnOff => "turn off".to_string(),
            Decision::NoChange => "no change".to_string(),
        }
    }
}

/// Operator-set state that suppresses automatic decisions until cleared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub state: PowerState,
    pub set_at: DateTime<Utc>,
}

impl ManualOverride {
    pub fn new(state: PowerState) -> Self {
        Self {
            state,
            set_at: Utc::now(),
        }
    }
}

/// Why a decision was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Price compared against thresholds
    Automatic,
    /// Manual override in effect
    Override,
    /// No usable price this cycle
    NoPrice,
}

/// Threshold comparison against the current price
#[derive(Clone)]
pub struct DecisionEngine {
    thresholds: Thresholds,
    default_temp: i32,
    logger: crate::logging::StructuredLogger,
}

impl DecisionEngine {
    /// Create an engine from validated thresholds
    pub fn new(thresholds: Thresholds, default_temp: i32) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            default_temp,
            logger: get_logger("engine"),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.thresholds, config.temperatures.default_temp)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Replace thresholds; rejected (and unchanged) if invalid
    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(())
    }

    /// Pure threshold comparison. The start rule wins when both apply.
    pub fn decide(&self, price: f64) -> Decision {
        if !price.is_finite() {
            return Decision::NoChange;
        }
        if price <= self.thresholds.start_price {
            Decision::TurnOn {
                target_temperature: self.default_temp,
            }
        } else if price >= self.thresholds.stop_price {
            Decision::TurnOff
        } else {
            Decision::NoChange
        }
    }

    /// Decision for a cycle, honouring an active override and a missing price
    pub fn evaluate(
        &self,
        price: Option<f64>,
        manual: Option<&ManualOverride>,
    ) -> (Decision, DecisionSource) {
        if let Some(ov) = manual {
            let decision = match ov.state {
                PowerState::On => Decision::TurnOn {
                    target_temperature: self.default_temp,
                },
                PowerState::Off => Decision::TurnOff,
            };
            self.logger.debug(&format!(
                "Manual override active ({}); automatic decision suppressed",
                ov.state.as_str()
            ));
            return (decision, DecisionSource::Override);
        }

        match price {
            Some(p) => {
                let decision = self.decide(p);
                self.logger.debug(&format!(
                    "price={:.2} start={:.2} stop={:.2} -> {}",
                    p,
                    self.thresholds.start_price,
                    self.thresholds.stop_price,
                    decision.describe()
                ));
                (decision, DecisionSource::Automatic)
            }
            None => {
                self.logger
                    .warn("No price available this cycle; holding current state");
                (Decision::NoChange, DecisionSource::NoPrice)
            }
        }
    }
}
