use crate::device::{DeviceCommand, DeviceState};
use crate::engine::{Decision, DecisionSource};
use crate::error::HeatgateError;
use crate::price::PricePoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrigger {
    /// Automation timer
    Timer,
    /// Web request (price view or explicit cycle)
    Request,
    /// Manual override being applied
    Manual,
}

/// Error recorded during a cycle; never fatal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleError {
    pub kind: String,
    pub message: String,
}

impl From<&HeatgateError> for CycleError {
    fn from(err: &HeatgateError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one fetch/decide/command pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub trigger: CycleTrigger,
    /// Price used for the decision, if the fetch succeeded
    pub price: Option<PricePoint>,
    pub decision: Decision,
    pub source: DecisionSource,
    /// Device state read before commanding
    pub device_state: Option<DeviceState>,
    /// Command the decision maps to
    pub command: Option<DeviceCommand>,
    /// Whether the command was actually written to the device
    pub command_sent: bool,
    pub errors: Vec<CycleError>,
}

impl CycleReport {
    pub(crate) fn new(trigger: CycleTrigger, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            trigger,
            price: None,
            decision: Decision::NoChange,
            source: DecisionSource::NoPrice,
            device_state: None,
            command: None,
            command_sent: false,
            errors: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error_kind(&self, kind: &str) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// One-line summary for logs and the status page
    pub fn summary(&self) -> String {
        let price = self
            .price
            .as_ref()
            .map(|p| format!("{:.2} öre/kWh", p.ore_per_kwh))
            .unwrap_or_else(|| "n/a".to_string());
        let mut s = format!(
            "price={} decision={} source={:?} sent={}",
            price,
            self.decision.describe(),
            self.source,
            self.command_sent
        );
        if !self.errors.is_empty() {
            let msgs: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            s.push_str(&format!(" errors=[{}]", msgs.join("; ")));
        }
        s
    }
}
