use thiserror::Error;

use crate::status::FeatureDomain;

/// Top-level error type for the `zowie-api` crate.
///
/// Covers the control protocol, multicast discovery, and the stream bridge.
/// `zowie-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Device reported "not logged in" and re-authentication did not help.
    #[error("Authentication required -- device rejected the session")]
    AuthRequired,

    /// Login rejected (wrong password, account locked, etc.)
    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, non-2xx, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Device status ───────────────────────────────────────────────
    /// Request rejected for missing or invalid parameters.
    #[error("Invalid request (status {code}): {message}")]
    Validation { code: String, message: String },

    /// Device not ready or restarting its media pipeline.
    #[error("Device busy (status {code}): {message}")]
    TransientBusy { code: String, message: String },

    /// Feature-specific failure from one of the numeric code ranges.
    #[error("{domain} error (status {code}): {message}")]
    Feature {
        domain: FeatureDomain,
        code: String,
        message: String,
    },

    /// Status code outside every known range.
    #[error("Device error (status {code}): {message}")]
    Device { code: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Discovery ───────────────────────────────────────────────────
    /// Multicast socket could not be created or the group joined.
    #[error("Multicast discovery unavailable: {0}")]
    Discovery(#[source] std::io::Error),

    // ── Bridge ──────────────────────────────────────────────────────
    /// Stream bridge rejected or could not serve the request.
    #[error("Stream bridge error: {message}")]
    Bridge { message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::TransientBusy { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the device could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout() || e.is_connect())
    }

    /// Returns `true` if the firmware does not implement the operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Feature {
                domain: FeatureDomain::Unsupported,
                ..
            }
        )
    }

    /// Returns `true` for authentication failures of either kind.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::AuthFailed { .. })
    }

    /// The raw device status code, if the error came from an envelope.
    pub fn status_code(&self) -> Option<&str> {
        match self {
            Self::Validation { code, .. }
            | Self::TransientBusy { code, .. }
            | Self::Feature { code, .. }
            | Self::Device { code, .. } => Some(code),
            _ => None,
        }
    }
}
