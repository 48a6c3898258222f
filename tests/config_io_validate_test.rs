use heatgate::config::Config;
use heatgate::price::PriceZone;
use std::collections::HashMap;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.device.device_id = "abc123".to_string();
    cfg.price.zone = PriceZone::Se4;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    fs::write(&path, serde_yaml::to_string(&cfg).unwrap()).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.device.device_id, "abc123");
    assert_eq!(loaded.price.zone, PriceZone::Se4);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn partial_yaml_keeps_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        b"price:\n  zone: se1\nthresholds:\n  start_price: 3.5\n  stop_price: 9\n",
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.price.zone, PriceZone::Se1);
    assert_eq!(cfg.thresholds.start_price, 3.5);
    assert_eq!(cfg.temperatures.default_temp, 22);
    assert_eq!(cfg.web.port, 5001);
    cfg.validate().unwrap();
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    // Start above stop
    cfg.thresholds.start_price = 12.0;
    cfg.thresholds.stop_price = 8.0;
    assert!(cfg.validate().is_err());

    // Temperatures out of range
    cfg = Config::default();
    cfg.temperatures.default_temp = 40;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.temperatures.min_temp = 25;
    cfg.temperatures.default_temp = 20;
    assert!(cfg.validate().is_err());

    // Unknown timezone
    cfg = Config::default();
    cfg.price.timezone = "Mars/Olympus".to_string();
    assert!(cfg.validate().is_err());

    // Port zero
    cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    assert!(Config::default().validate().is_ok());
}

#[test]
fn env_overrides_apply() {
    let env: HashMap<&str, &str> = [
        ("SENSIBO_API_KEY", " key "),
        ("SENSIBO_DEVICE_ID", "pod1"),
        ("PRIS_KLASSE", "SE2"),
        ("MIN_TEMP", "12"),
        ("DEFAULT_TEMP", "21"),
        ("START_PRICE", "4.5"),
        ("STOP_PRICE", "11"),
        ("ADMIN_PASSWORD", "hunter2"),
        ("HEATGATE_PORT", ""),
    ]
    .into_iter()
    .collect();

    let mut cfg = Config::default();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(cfg.device.api_key, "key");
    assert_eq!(cfg.device.device_id, "pod1");
    assert_eq!(cfg.price.zone, PriceZone::Se2);
    assert_eq!(cfg.temperatures.min_temp, 12);
    assert_eq!(cfg.temperatures.default_temp, 21);
    assert_eq!(cfg.thresholds.start_price, 4.5);
    assert_eq!(cfg.thresholds.stop_price, 11.0);
    assert_eq!(cfg.auth.admin_password, "hunter2");
    // Blank values are ignored
    assert_eq!(cfg.web.port, 5001);
}

#[test]
fn bad_env_values_fail() {
    let mut cfg = Config::default();
    let err = cfg
        .apply_overrides(|k| (k == "MIN_TEMP").then(|| "warm".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("MIN_TEMP"));

    let mut cfg = Config::default();
    assert!(
        cfg.apply_overrides(|k| (k == "PRIS_KLASSE").then(|| "SE9".to_string()))
            .is_err()
    );
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
