//! Configuration management for Heatgate
//!
//! Configuration is loaded from an optional YAML file and then overridden by
//! environment variables (a `.env` file is read first when present). The
//! resulting [`Config`] is passed explicitly to the components that need it.

use crate::engine::Thresholds;
use crate::error::{HeatgateError, Result};
use crate::price::PriceZone;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable pointing at a YAML config file
pub const CONFIG_PATH_ENV: &str = "HEATGATE_CONFIG";

const REDACTED: &str = "***";

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_MINUTES: u64 = 365 * 24 * 60;

/// bcrypt cost range
pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Heat pump vendor API configuration
    pub device: DeviceConfig,

    /// Electricity price feed configuration
    pub price: PriceConfig,

    /// Start/stop price thresholds in öre/kWh
    pub thresholds: Thresholds,

    /// Temperatures used when commanding the heat pump
    pub temperatures: TemperatureConfig,

    /// Shared admin login
    pub auth: AuthConfig,

    /// Periodic decision cycle
    pub automation: AutomationConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Sensibo cloud API parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeviceConfig {
    /// Vendor API key
    pub api_key: String,

    /// Device (pod) identifier
    pub device_id: String,

    /// API base URL
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Price feed parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PriceConfig {
    /// Price zone (SE1..SE4)
    pub zone: PriceZone,

    /// API base URL of the price feed
    pub api_base: String,

    /// IANA timezone used to select the price day and hour
    pub timezone: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Heat pump temperatures in °C
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TemperatureConfig {
    /// Target temperature sent when switching off (fan mode)
    pub min_temp: i32,

    /// Target temperature sent when switching on (heat mode)
    pub default_temp: i32,
}

/// Shared admin credential
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AuthConfig {
    /// Admin password; an empty password disables login entirely
    pub admin_password: String,

    /// Session lifetime in minutes
    pub session_ttl_minutes: u64,

    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,

    /// bcrypt cost used to hash the admin password at startup (4..=31)
    pub hash_cost: u32,
}

/// Periodic cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AutomationConfig {
    /// Whether the timer task runs at all
    pub enabled: bool,

    /// Seconds between cycles; 0 disables the timer
    pub poll_interval_seconds: u64,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from file (if any), apply environment overrides
    /// and validate the result
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => {
                let default_paths = ["heatgate.yaml", "/etc/heatgate/config.yaml"];
                match default_paths.iter().find(|p| Path::new(p).exists()) {
                    Some(path) => Self::from_file(path)?,
                    None => Config::default(),
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SENSIBO_API_KEY") {
            self.device.api_key = v.trim().to_string();
        }
        if let Some(v) = get("SENSIBO_DEVICE_ID") {
            self.device.device_id = v.trim().to_string();
        }
        if let Some(v) = get("PRIS_KLASSE") {
            self.price.zone = v.parse()?;
        }
        if let Some(v) = get("MIN_TEMP") {
            self.temperatures.min_temp = parse_env("MIN_TEMP", &v)?;
        }
        if let Some(v) = get("DEFAULT_TEMP") {
            self.temperatures.default_temp = parse_env("DEFAULT_TEMP", &v)?;
        }
        if let Some(v) = get("START_PRICE") {
            self.thresholds.start_price = parse_env("START_PRICE", &v)?;
        }
        if let Some(v) = get("STOP_PRICE") {
            self.thresholds.stop_price = parse_env("STOP_PRICE", &v)?;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            self.auth.admin_password = v;
        }
        if let Some(v) = get("HEATGATE_HOST") {
            self.web.host = v.trim().to_string();
        }
        if let Some(v) = get("HEATGATE_PORT") {
            self.web.port = parse_env("HEATGATE_PORT", &v)?;
        }
        if let Some(v) = get("HEATGATE_POLL_SECONDS") {
            self.automation.poll_interval_seconds = parse_env("HEATGATE_POLL_SECONDS", &v)?;
        }
        if let Some(v) = get("HEATGATE_LOG_LEVEL") {
            self.logging.level = v.trim().to_string();
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if !(5..=35).contains(&self.temperatures.min_temp) {
            return Err(HeatgateError::validation(
                "temperatures.min_temp",
                "Must be between 5 and 35",
            ));
        }

        if !(5..=35).contains(&self.temperatures.default_temp) {
            return Err(HeatgateError::validation(
                "temperatures.default_temp",
                "Must be between 5 and 35",
            ));
        }

        if self.temperatures.min_temp > self.temperatures.default_temp {
            return Err(HeatgateError::validation(
                "temperatures.min_temp",
                "Must not exceed default_temp",
            ));
        }

        if self.price.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(HeatgateError::validation(
                "price.timezone",
                "Unknown IANA timezone",
            ));
        }

        if self.price.api_base.trim().is_empty() {
            return Err(HeatgateError::validation(
                "price.api_base",
                "Cannot be empty",
            ));
        }

        if self.device.api_base.trim().is_empty() {
            return Err(HeatgateError::validation(
                "device.api_base",
                "Cannot be empty",
            ));
        }

        if self.web.port == 0 {
            return Err(HeatgateError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&self.auth.session_ttl_minutes) {
            return Err(HeatgateError::validation(
                "auth.session_ttl_minutes",
                format!("Must be between 1 and {}", MAX_SESSION_TTL_MINUTES),
            ));
        }

        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.auth.hash_cost) {
            return Err(HeatgateError::validation(
                "auth.hash_cost",
                format!(
                    "Must be between {} and {}",
                    MIN_HASH_COST,
                    MAX_HASH_COST
                ),
            ));
        }

        Ok(())
    }

    /// Copy of the configuration with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.device.api_key.is_empty() {
            copy.device.api_key = REDACTED.to_string();
        }
        if !copy.auth.admin_password.is_empty() {
            copy.auth.admin_password = REDACTED.to_string();
        }
        copy
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HeatgateError::validation(key, format!("Invalid value '{}'", value)))
}
