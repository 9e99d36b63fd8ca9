//! Configuration for ZowieBox tools.
//!
//! TOML profiles, credential resolution (env + plaintext), and
//! translation to `zowie_core::DeviceConfig`. The core never reads files;
//! binaries load a [`Config`] here and hand the resulting `DeviceConfig` in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zowie_api::{BridgeConfig, ProtocolClient};
use zowie_core::DeviceConfig;

/// Environment variable consulted for a password when the profile names none.
pub const PASSWORD_ENV: &str = "ZOWIE_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Stream bridge (go2rtc) used for sources the decoder cannot play.
    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            bridge: BridgeSettings::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Refresh interval, seconds. Clamped to 10..=300 by the core.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    #[serde(default = "default_unavailable_threshold")]
    pub unavailable_threshold: u32,

    /// Conversion endpoint retention after last use, seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
            unavailable_threshold: default_unavailable_threshold(),
            cache_ttl: default_cache_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_scan_interval() -> u64 {
    30
}
fn default_unavailable_threshold() -> u32 {
    3
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_sweep_interval() -> u64 {
    60
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BridgeSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_bridge_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_rtsp_port")]
    pub rtsp_port: u16,

    #[serde(default = "default_stream_prefix")]
    pub stream_prefix: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_bridge_host(),
            api_port: default_api_port(),
            rtsp_port: default_rtsp_port(),
            stream_prefix: default_stream_prefix(),
        }
    }
}

impl BridgeSettings {
    /// `None` when bridging is turned off.
    pub fn to_bridge_config(&self, timeout: Duration) -> Option<BridgeConfig> {
        self.enabled.then(|| BridgeConfig {
            host: self.host.clone(),
            api_port: self.api_port,
            rtsp_port: self.rtsp_port,
            stream_prefix: self.stream_prefix.clone(),
            timeout,
        })
    }
}

fn default_true() -> bool {
    true
}
fn default_bridge_host() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    1984
}
fn default_rtsp_port() -> u16 {
    8554
}
fn default_stream_prefix() -> String {
    "zowie_".into()
}

/// A named device profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Device address (`192.168.1.50`, `box.local:8080`, or a full URL).
    pub host: String,

    #[serde(default = "default_username")]
    pub username: String,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override request timeout.
    pub timeout: Option<u64>,

    /// Override refresh interval.
    pub scan_interval: Option<u64>,

    /// Decoder source name used for URL playback.
    pub managed_source_name: Option<String>,
}

fn default_username() -> String {
    "admin".into()
}

impl Config {
    /// Pick a profile: the named one, else the configured default.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "zowie", "zowie").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("zowie");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file is not an
/// error; defaults and environment still apply.
///
/// Environment keys nest on a double underscore:
/// `ZOWIE_DEFAULTS__SCAN_INTERVAL=60`, `ZOWIE_BRIDGE__HOST=10.0.0.2`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ZOWIE_").ignore(&["PASSWORD"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the device password: the profile's `password_env`, then
/// `ZOWIE_PASSWORD`, then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `DeviceConfig` from a profile plus global defaults.
pub fn profile_to_device_config(
    config: &Config,
    profile: &Profile,
    profile_name: &str,
) -> Result<DeviceConfig, ConfigError> {
    let url = ProtocolClient::parse_host(&profile.host).map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid device address: {}", profile.host),
    })?;
    let password = resolve_password(profile, profile_name)?;

    let defaults = &config.defaults;
    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    let scan_interval =
        Duration::from_secs(profile.scan_interval.unwrap_or(defaults.scan_interval));

    let base = DeviceConfig::new(url, profile.username.clone(), password);
    Ok(DeviceConfig {
        timeout,
        scan_interval,
        unavailable_threshold: defaults.unavailable_threshold,
        cache_ttl: Duration::from_secs(defaults.cache_ttl),
        sweep_interval: Duration::from_secs(defaults.sweep_interval),
        managed_source_name: profile
            .managed_source_name
            .clone()
            .unwrap_or_else(|| base.managed_source_name.clone()),
        bridge: config.bridge.to_bridge_config(timeout),
        ..base
    })
}
