use super::{DeviceClient, DeviceCommand, DeviceState};
use crate::config::DeviceConfig;
use crate::error::{HeatgateError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sensibo cloud API client
pub struct SensiboClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    device_id: String,
    logger: crate::logging::StructuredLogger,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    result: Option<T>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodResult {
    ac_state: AcStateWire,
    #[serde(default)]
    measurements: Option<MeasurementsWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcStateWire {
    on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_temperature: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fan_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    swing: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeasurementsWire {
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcStateRequest {
    ac_state: AcStateWire,
}

impl SensiboClient {
    pub fn new(cfg: &DeviceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds.max(1)))
            .build()
            .map_err(|e| HeatgateError::config(format!("HTTP client init failed: {}", e)))?;
        let logger = get_logger_with_context(
            LogContext::new("device").with_field("device_id", cfg.device_id.clone()),
        );
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.trim().to_string(),
            device_id: cfg.device_id.trim().to_string(),
            logger,
        })
    }

    fn ensure_credentials(&self) -> Result<()> {
        if self.api_key.is_empty() || self.device_id.is_empty() {
            self.logger.error("Missing Sensibo API credentials");
            return Err(HeatgateError::device("Missing Sensibo API credentials"));
        }
        Ok(())
    }

    fn pod_url(&self) -> String {
        format!("{}/pods/{}", self.api_base, self.device_id)
    }

    fn check_status(&self, status: StatusCode) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        let err = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HeatgateError::device(format!(
                "Sensibo API rejected the API key (HTTP {})",
                status.as_u16()
            )),
            StatusCode::NOT_FOUND => {
                HeatgateError::device(format!("Unknown Sensibo device id '{}'", self.device_id))
            }
            other => HeatgateError::device(format!("Sensibo API returned HTTP {}", other)),
        };
        self.logger.error(&err.to_string());
        Err(err)
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> HeatgateError {
    // Strip the URL: it carries the API key as a query parameter
    let err = err.without_url();
    if err.is_timeout() {
        HeatgateError::device(format!("Timeout while {}", context))
    } else if err.is_connect() {
        HeatgateError::device(format!("Connection error while {}", context))
    } else {
        HeatgateError::device(format!("Request failed while {}: {}", context, err))
    }
}

/// Decode a `GET /pods/{id}` body
fn parse_pod(body: &str) -> Result<DeviceState> {
    let envelope: Envelope<PodResult> = serde_json::from_str(body)
        .map_err(|e| HeatgateError::device(format!("Malformed Sensibo response: {}", e)))?;
    if !envelope.status.eq_ignore_ascii_case("success") {
        return Err(HeatgateError::device(format!(
            "Sensibo API reported failure: {}",
            envelope.reason.unwrap_or(envelope.status)
        )));
    }
    let pod = envelope
        .result
        .ok_or_else(|| HeatgateError::device("Sensibo response missing result"))?;
    let measurements = pod.measurements;
    Ok(DeviceState {
        on: pod.ac_state.on,
        target_temperature: pod.ac_state.target_temperature,
        mode: pod.ac_state.mode,
        fan_level: pod.ac_state.fan_level,
        room_temperature: measurements.as_ref().and_then(|m| m.temperature),
        humidity: measurements.as_ref().and_then(|m| m.humidity),
    })
}

fn command_body(command: &DeviceCommand) -> AcStateRequest {
    AcStateRequest {
        ac_state: AcStateWire {
            on: command.on,
            target_temperature: Some(command.target_temperature),
            mode: Some(command.mode.as_str().to_string()),
            fan_level: Some("auto".to_string()),
            swing: Some("stopped".to_string()),
        },
    }
}

#[async_trait::async_trait]
impl DeviceClient for SensiboClient {
    async fn read_state(&self) -> Result<DeviceState> {
        self.ensure_credentials()?;
        let resp = self
            .http
            .get(self.pod_url())
            .query(&[("fields", "acState,measurements"), ("apiKey", self.api_key.as_str())])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error("reading device state", e))?;
        self.check_status(resp.status())?;
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error("reading device state", e))?;
        parse_pod(&body)
    }

    async fn apply(&self, command: &DeviceCommand) -> Result<()> {
        self.ensure_credentials()?;
        self.logger.debug(&format!(
            "Sending acState on={} target={} mode={}",
            command.on,
            command.target_temperature,
            command.mode.as_str()
        ));
        let resp = self
            .http
            .post(format!("{}/acStates", self.pod_url()))
            .query(&[("apiKey", self.api_key.as_str())])
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&command_body(command))
            .send()
            .await
            .map_err(|e| transport_error("sending command", e))?;
        self.check_status(resp.status())?;
        self.logger.info(&format!(
            "Heat pump turned {}.",
            command.power().as_str()
        ));
        Ok(())
    }
}
