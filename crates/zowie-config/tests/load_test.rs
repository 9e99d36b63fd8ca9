// Config file loading and saving against temporary directories.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use zowie_config::{
    load_config_from, profile_to_device_config, save_config_to, Config, Profile,
};

const SAMPLE: &str = r#"
default_profile = "stage"

[defaults]
timeout = 5
scan_interval = 45

[bridge]
host = "10.0.0.2"
api_port = 11984

[profiles.stage]
host = "192.168.10.20"
password = "stage-pass"
managed_source_name = "Playout"

[profiles.booth]
host = "http://booth.local:8080"
username = "operator"
password = "booth-pass"
scan_interval = 120
"#;

#[test]
fn test_load_profiles_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.profiles.len(), 2);
    assert_eq!(config.defaults.timeout, 5);
    assert_eq!(config.defaults.cache_ttl, 300, "unset keys keep defaults");

    let (name, profile) = config.profile(None).unwrap();
    assert_eq!(name, "stage");
    assert_eq!(profile.username, "admin");

    let device = profile_to_device_config(&config, profile, name).unwrap();
    assert_eq!(device.url.as_str(), "http://192.168.10.20/");
    assert_eq!(device.timeout, Duration::from_secs(5));
    assert_eq!(device.scan_interval, Duration::from_secs(45));
    assert_eq!(device.managed_source_name, "Playout");
    let bridge = device.bridge.unwrap();
    assert_eq!(bridge.host, "10.0.0.2");
    assert_eq!(bridge.api_port, 11984);
    assert_eq!(bridge.rtsp_port, 8554);
}

#[test]
fn test_profile_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = load_config_from(&path).unwrap();
    let (name, profile) = config.profile(Some("booth")).unwrap();
    let device = profile_to_device_config(&config, profile, name).unwrap();

    assert_eq!(device.url.as_str(), "http://booth.local:8080/");
    assert_eq!(device.username, "operator");
    assert_eq!(device.scan_interval(), Duration::from_secs(120));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert!(config.profiles.is_empty());
    assert!(config.bridge.enabled);
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            host: "192.168.1.50".into(),
            username: "admin".into(),
            password: None,
            password_env: Some("STAGE_BOX_PASSWORD".into()),
            timeout: None,
            scan_interval: None,
            managed_source_name: None,
        },
    );
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let (_, profile) = loaded.profile(None).unwrap();
    assert_eq!(profile.host, "192.168.1.50");
    assert_eq!(profile.password_env.as_deref(), Some("STAGE_BOX_PASSWORD"));
}
