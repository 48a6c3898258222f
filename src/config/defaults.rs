use super::*;

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            device_id: String::new(),
            api_base: "https://home.sensibo.com/api/v2".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            zone: PriceZone::Se3,
            api_base: "https://www.elprisetjustnu.se/api/v1/prices".to_string(),
            timezone: "Europe/Stockholm".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            min_temp: 10,
            default_temp: 22,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: String::new(),
            session_ttl_minutes: 12 * 60,
            secure_cookie: false,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: 900,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/heatgate.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            price: PriceConfig::default(),
            thresholds: Thresholds::default(),
            temperatures: TemperatureConfig::default(),
            auth: AuthConfig::default(),
            automation: AutomationConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
