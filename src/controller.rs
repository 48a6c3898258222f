//! Decision cycle orchestration
//!
//! A cycle fetches the current price, evaluates it (or the manual override)
//! with the [`DecisionEngine`], reads the device and writes a command when
//! the device is not already in the requested state. Price and device
//! failures are recorded in the [`CycleReport`] and never abort the process.

use crate::config::Config;
use crate::device::{DeviceClient, DeviceCommand, SensiboClient};
use crate::engine::{DecisionEngine, ManualOverride, PowerState, Thresholds};
use crate::error::Result;
use crate::logging::get_logger;
use crate::price::{ElprisClient, PriceSource, PriceZone};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

mod report;

pub use report::{CycleError, CycleReport, CycleTrigger};

/// Controller shared between the web layer and the automation timer
pub type SharedController = Arc<Mutex<Controller>>;

pub struct Controller {
    config: Config,
    engine: DecisionEngine,
    price: Arc<dyn PriceSource>,
    device: Arc<dyn DeviceClient>,
    manual_override: Option<ManualOverride>,
    last_commanded: Option<PowerState>,
    last_report: Option<CycleReport>,
    total_cycles: u64,
    reports_tx: broadcast::Sender<String>,
    logger: crate::logging::StructuredLogger,
}

impl Controller {
    /// Build a controller with explicit collaborators
    pub fn new(
        config: Config,
        price: Arc<dyn PriceSource>,
        device: Arc<dyn DeviceClient>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = DecisionEngine::from_config(&config)?;
        let (reports_tx, _) = broadcast::channel::<String>(32);
        Ok(Self {
            config,
            engine,
            price,
            device,
            manual_override: None,
            last_commanded: None,
            last_report: None,
            total_cycles: 0,
            reports_tx,
            logger: get_logger("controller"),
        })
    }

    /// Build a controller talking to the real price feed and vendor API
    pub fn from_config(config: Config) -> Result<Self> {
        let price = Arc::new(ElprisClient::new(&config.price)?);
        let device = Arc::new(SensiboClient::new(&config.device)?);
        Self::new(config, price, device)
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn thresholds(&self) -> Thresholds {
        self.engine.thresholds()
    }

    pub fn zone(&self) -> PriceZone {
        self.price.zone()
    }

    pub fn manual_override(&self) -> Option<&ManualOverride> {
        self.manual_override.as_ref()
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Power state of the last successfully written command
    pub fn last_commanded(&self) -> Option<PowerState> {
        self.last_commanded
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// JSON-encoded cycle reports as they complete
    pub fn subscribe_reports(&self) -> broadcast::Receiver<String> {
        self.reports_tx.subscribe()
    }

    /// Device handle for reads that must not hold the controller lock
    pub fn device_client(&self) -> Arc<dyn DeviceClient> {
        Arc::clone(&self.device)
    }

    /// Replace the thresholds at runtime (not persisted)
    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        self.engine.set_thresholds(thresholds)?;
        self.config.thresholds = thresholds;
        self.logger.info(&format!(
            "Thresholds updated: start={:.2} stop={:.2}",
            thresholds.start_price, thresholds.stop_price
        ));
        Ok(())
    }

    /// Run one full cycle at the current time
    pub async fn run_cycle(&mut self, trigger: CycleTrigger) -> CycleReport {
        self.run_cycle_at(trigger, Utc::now()).await
    }

    /// Run one full cycle as of `now`
    pub async fn run_cycle_at(&mut self, trigger: CycleTrigger, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::new(trigger, now);

        match self.price.current_price(now).await {
            Ok(p) => report.price = Some(p),
            Err(e) => {
                self.logger
                    .warn(&format!("Price fetch failed, skipping this cycle: {}", e));
                report.errors.push(CycleError::from(&e));
            }
        }

        let price = report.price.as_ref().map(|p| p.ore_per_kwh);
        let (decision, source) = self.engine.evaluate(price, self.manual_override.as_ref());
        report.decision = decision;
        report.source = source;

        if let Some(command) =
            DeviceCommand::from_decision(&decision, self.config.temperatures.min_temp)
        {
            self.drive(&mut report, command, false).await;
        }

        self.finish(report)
    }

    /// Set a manual override and write it to the device immediately.
    /// The override stays in effect even if the write fails; the next
    /// cycle tries again.
    pub async fn apply_override(&mut self, state: PowerState) -> CycleReport {
        self.manual_override = Some(ManualOverride::new(state));
        self.logger
            .info(&format!("Manual override set: {}", state.as_str()));

        let mut report = CycleReport::new(CycleTrigger::Manual, Utc::now());
        let (decision, source) = self.engine.evaluate(None, self.manual_override.as_ref());
        report.decision = decision;
        report.source = source;

        if let Some(command) =
            DeviceCommand::from_decision(&decision, self.config.temperatures.min_temp)
        {
            self.drive(&mut report, command, true).await;
        }

        self.finish(report)
    }

    /// Clear the manual override; automatic decisions resume next cycle
    pub fn clear_override(&mut self) -> Option<ManualOverride> {
        let previous = self.manual_override.take();
        if let Some(ov) = &previous {
            self.logger
                .info(&format!("Manual override cleared (was {})", ov.state.as_str()));
        }
        previous
    }

    async fn drive(&mut self, report: &mut CycleReport, command: DeviceCommand, force: bool) {
        report.command = Some(command.clone());

        if !force {
            match self.device.read_state().await {
                Ok(state) => {
                    let satisfied = state.satisfies(&command);
                    report.device_state = Some(state);
                    if satisfied {
                        self.logger.debug(&format!(
                            "Device already {}; no command sent",
                            command.power().as_str()
                        ));
                        self.last_commanded = Some(command.power());
                        return;
                    }
                }
                Err(e) => {
                    self.logger
                        .error(&format!("Could not read device state: {}", e));
                    report.errors.push(CycleError::from(&e));
                    return;
                }
            }
        }

        match self.device.apply(&command).await {
            Ok(()) => {
                report.command_sent = true;
                self.last_commanded = Some(command.power());
            }
            Err(e) => {
                self.logger
                    .error(&format!("Failed to command heat pump: {}", e));
                report.errors.push(CycleError::from(&e));
            }
        }
    }

    fn finish(&mut self, report: CycleReport) -> CycleReport {
        self.total_cycles += 1;
        if report.is_ok() {
            self.logger.info(&format!("Cycle complete: {}", report.summary()));
        } else {
            self.logger
                .warn(&format!("Cycle completed with errors: {}", report.summary()));
        }
        if let Ok(json) = serde_json::to_string(&report) {
            // No subscribers is fine
            let _ = self.reports_tx.send(json);
        }
        self.last_report = Some(report.clone());
        report
    }
}

/// Spawn the automation timer if enabled; first cycle runs immediately
pub fn spawn_automation(controller: SharedController, config: &Config) -> Option<JoinHandle<()>> {
    if !config.automation.enabled || config.automation.poll_interval_seconds == 0 {
        get_logger("automation").info("Automation timer disabled");
        return None;
    }
    let period = Duration::from_secs(config.automation.poll_interval_seconds);
    Some(tokio::spawn(async move {
        let logger = get_logger("automation");
        logger.info(&format!(
            "Automation timer started (every {}s)",
            period.as_secs()
        ));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let mut ctl = controller.lock().await;
            ctl.run_cycle(CycleTrigger::Timer).await;
        }
    }))
}
