// ── Runtime device configuration ──
//
// Describes how to reach one ZowieBox and how aggressively to poll it.
// Carries credentials and tuning, but never touches disk: the CLI (or any
// other host) builds a `DeviceConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;
use zowie_api::transport::DEFAULT_RETRY_DELAYS;
use zowie_api::BridgeConfig;

/// Lower bound for the refresh interval.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound for the refresh interval.
pub const MAX_SCAN_INTERVAL: Duration = Duration::from_secs(300);
/// Lower bound for the conversion sweep period.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for talking to a single device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device base URL (e.g., `http://192.168.1.50`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Backoff schedule for transiently failing reads.
    pub retry_delays: Vec<Duration>,
    /// Time between refresh cycles. Clamped by [`DeviceConfig::scan_interval`].
    pub scan_interval: Duration,
    /// Consecutive all-groups-failed cycles before the device is Unavailable.
    pub unavailable_threshold: u32,
    /// Retention of a conversion endpoint after its last acquire.
    pub cache_ttl: Duration,
    /// How often expired conversion endpoints are swept. Clamped by
    /// [`DeviceConfig::sweep_interval`].
    pub sweep_interval: Duration,
    /// Name of the decoder source this library manages for URL playback.
    pub managed_source_name: String,
    /// Identifier sent in discovery requests.
    pub requester_id: String,
    /// Stream bridge location and naming. `None` disables bridged playback.
    pub bridge: Option<BridgeConfig>,
}

impl DeviceConfig {
    /// A config with default tuning for the device at `url`.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            timeout: Duration::from_secs(10),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            scan_interval: Duration::from_secs(30),
            unavailable_threshold: 3,
            cache_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            managed_source_name: "Zowie".into(),
            requester_id: "zowie".into(),
            bridge: Some(BridgeConfig::default()),
        }
    }

    /// The refresh interval, clamped to 10..=300 seconds.
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval.clamp(MIN_SCAN_INTERVAL, MAX_SCAN_INTERVAL)
    }

    /// The sweep period, never below one second.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval.max(MIN_SWEEP_INTERVAL)
    }

    /// The threshold, never below one cycle.
    pub fn unavailable_threshold(&self) -> u32 {
        self.unavailable_threshold.max(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> DeviceConfig {
        DeviceConfig::new(
            Url::parse("http://192.168.1.50").unwrap(),
            "admin",
            SecretString::from("admin".to_owned()),
        )
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.scan_interval(), Duration::from_secs(30));
        assert_eq!(config.unavailable_threshold(), 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.bridge.is_some());
    }

    #[test]
    fn scan_interval_is_clamped() {
        let mut config = DeviceConfig {
            scan_interval: Duration::from_secs(1),
            ..config()
        };
        assert_eq!(config.scan_interval(), MIN_SCAN_INTERVAL);

        config.scan_interval = Duration::from_secs(3600);
        assert_eq!(config.scan_interval(), MAX_SCAN_INTERVAL);

        config.scan_interval = Duration::from_secs(45);
        assert_eq!(config.scan_interval(), Duration::from_secs(45));
    }

    #[test]
    fn zero_sweep_interval_is_raised() {
        let mut config = DeviceConfig {
            sweep_interval: Duration::ZERO,
            ..config()
        };
        assert_eq!(config.sweep_interval(), MIN_SWEEP_INTERVAL);

        config.sweep_interval = Duration::from_secs(90);
        assert_eq!(config.sweep_interval(), Duration::from_secs(90));
    }

    #[test]
    fn threshold_never_zero() {
        let config = DeviceConfig {
            unavailable_threshold: 0,
            ..config()
        };
        assert_eq!(config.unavailable_threshold(), 1);
    }
}
