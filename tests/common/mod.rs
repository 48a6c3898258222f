#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use heatgate::device::{DeviceClient, DeviceCommand, DeviceState};
use heatgate::error::{HeatgateError, Result};
use heatgate::price::{PricePoint, PriceSource, PriceZone};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Price source returning a settable price in öre/kWh, or a fetch error when unset
#[derive(Default)]
pub struct FakePrice {
    ore: Mutex<Option<f64>>,
}

impl FakePrice {
    pub fn new(ore: Option<f64>) -> Self {
        Self {
            ore: Mutex::new(ore),
        }
    }

    pub fn set(&self, ore: Option<f64>) {
        *self.ore.lock().unwrap() = ore;
    }
}

#[async_trait]
impl PriceSource for FakePrice {
    async fn current_price(&self, now: DateTime<Utc>) -> Result<PricePoint> {
        match *self.ore.lock().unwrap() {
            Some(ore) => Ok(PricePoint::from_sek(
                ore / 100.0,
                (now - Duration::minutes(5)).fixed_offset(),
                (now + Duration::minutes(55)).fixed_offset(),
            )),
            None => Err(HeatgateError::fetch("Failed to fetch electricity price")),
        }
    }

    fn zone(&self) -> PriceZone {
        PriceZone::Se3
    }
}

/// In-memory heat pump recording every command it receives
#[derive(Default)]
pub struct FakeDevice {
    pub state: Mutex<DeviceState>,
    pub applied: Mutex<Vec<DeviceCommand>>,
    pub reads: AtomicUsize,
    pub fail_read: AtomicBool,
    pub fail_apply: AtomicBool,
    /// When set, reads park until `release_read` is called
    pub gate_reads: AtomicBool,
    read_gate: Notify,
}

impl FakeDevice {
    pub fn with_state(state: DeviceState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    pub fn applied(&self) -> Vec<DeviceCommand> {
        self.applied.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn release_read(&self) {
        self.read_gate.notify_one();
    }
}

#[async_trait]
impl DeviceClient for FakeDevice {
    async fn read_state(&self) -> Result<DeviceState> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.gate_reads.load(Ordering::SeqCst) {
            self.read_gate.notified().await;
        }
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(HeatgateError::device("Sensibo API returned HTTP 500"));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn apply(&self, command: &DeviceCommand) -> Result<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(HeatgateError::device("Sensibo API returned HTTP 500"));
        }
        self.applied.lock().unwrap().push(command.clone());
        let mut state = self.state.lock().unwrap();
        state.on = command.on;
        state.target_temperature = Some(command.target_temperature);
        state.mode = Some(command.mode.as_str().to_string());
        Ok(())
    }
}
