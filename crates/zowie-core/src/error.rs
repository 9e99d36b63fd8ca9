// ── Core error types ──
//
// User-facing errors from zowie-core. Each variant maps to a different
// user action: wait for the device, check its configuration, fix the
// request, or pick another source. The `From<zowie_api::Error>` impl
// translates protocol-layer errors into these.

use thiserror::Error;
use zowie_api::FeatureDomain;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Reachability ─────────────────────────────────────────────────
    #[error("Cannot reach device at {url}: {reason}")]
    DeviceUnreachable { url: String, reason: String },

    #[error("Device is unavailable")]
    DeviceUnavailable,

    #[error("Device is busy: {message}")]
    DeviceBusy { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Request errors ───────────────────────────────────────────────
    #[error("Request rejected by device (status {code}): {message}")]
    ValidationFailed { code: String, message: String },

    #[error("{domain} feature error (status {code}): {message}")]
    Feature {
        domain: FeatureDomain,
        code: String,
        message: String,
    },

    #[error("Device error (status {code}): {message}")]
    Device { code: String, message: String },

    // ── Playback ─────────────────────────────────────────────────────
    #[error("Source is not playable: {source_ref}")]
    UnsupportedSource { source_ref: String },

    #[error("Stream conversion unavailable for {url}: {reason}")]
    ConversionUnavailable { url: String, reason: String },

    #[error("Source not found: {identifier}")]
    SourceNotFound { identifier: String },

    #[error("Cannot {action} while decoder is {state}")]
    InvalidTransition { action: String, state: String },

    // ── Discovery ────────────────────────────────────────────────────
    #[error("Discovery unavailable: {reason}")]
    Discovery { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when the device itself could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::DeviceUnreachable { .. } | Self::DeviceUnavailable)
    }
}

// ── Conversion from protocol-layer errors ────────────────────────────

impl From<zowie_api::Error> for CoreError {
    fn from(err: zowie_api::Error) -> Self {
        match err {
            zowie_api::Error::AuthRequired => CoreError::AuthenticationFailed {
                message: "device rejected the session after re-authentication".into(),
            },
            zowie_api::Error::AuthFailed { message } => CoreError::AuthenticationFailed { message },
            zowie_api::Error::Transport(ref e) if e.is_timeout() || e.is_connect() => {
                CoreError::DeviceUnreachable {
                    url: e
                        .url()
                        .map_or_else(|| "<unknown>".into(), ToString::to_string),
                    reason: e.to_string(),
                }
            }
            zowie_api::Error::Transport(e) => CoreError::Device {
                code: e
                    .status()
                    .map_or_else(|| "http".into(), |s| s.as_u16().to_string()),
                message: e.to_string(),
            },
            zowie_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            zowie_api::Error::Validation { code, message } => {
                CoreError::ValidationFailed { code, message }
            }
            zowie_api::Error::TransientBusy { message, .. } => CoreError::DeviceBusy { message },
            zowie_api::Error::Feature {
                domain,
                code,
                message,
            } => CoreError::Feature {
                domain,
                code,
                message,
            },
            zowie_api::Error::Device { code, message } => CoreError::Device { code, message },
            zowie_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            zowie_api::Error::Discovery(e) => CoreError::Discovery {
                reason: e.to_string(),
            },
            zowie_api::Error::Bridge { message } => CoreError::ConversionUnavailable {
                url: String::new(),
                reason: message,
            },
        }
    }
}
