// Shared transport configuration for building reqwest::Client instances.
//
// The control client and the stream bridge share timeout and user-agent
// settings through this module. Devices speak plain HTTP on the LAN, so
// there is no TLS knob here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

/// Backoff schedule applied to read requests that fail transiently.
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(200),
    Duration::from_millis(500),
    Duration::from_millis(1000),
];

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Delay before each retry of a transiently failing read. Empty disables retries.
    pub retry_delays: Vec<Duration>,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("zowie/", env!("CARGO_PKG_VERSION")));

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(crate::error::Error::Transport)
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }

    /// Replace the retry schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }
}
