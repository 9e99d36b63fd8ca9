//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use zowie_config::ConfigError;
use zowie_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach device at {url}")]
    #[diagnostic(
        code(zowie::unreachable),
        help(
            "Check that the device is powered and on this network.\n\
             Reason: {reason}\n\
             Try: zowie discover"
        )
    )]
    Unreachable { url: String, reason: String },

    #[error("Device is busy: {message}")]
    #[diagnostic(code(zowie::busy), help("Retry in a few seconds."))]
    Busy { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(zowie::auth_failed),
        help(
            "Verify the username and password for this device.\n\
             Set them in your profile or with --username / ZOWIE_PASSWORD."
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(zowie::no_credentials),
        help(
            "Add `password` or `password_env` to the profile,\n\
             or set the ZOWIE_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(zowie::not_found),
        help("Run: zowie {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Device ───────────────────────────────────────────────────────

    #[error("Device rejected the request (status {code}): {message}")]
    #[diagnostic(code(zowie::rejected))]
    Rejected { code: String, message: String },

    #[error("Device error (status {code}): {message}")]
    #[diagnostic(code(zowie::device_error))]
    Device { code: String, message: String },

    #[error("{operation} is not supported: {reason}")]
    #[diagnostic(
        code(zowie::unsupported),
        help("The device firmware or work mode does not offer this feature.")
    )]
    Unsupported { operation: String, reason: String },

    #[error("Cannot {action} while the decoder is {state}")]
    #[diagnostic(code(zowie::invalid_state))]
    InvalidState { action: String, state: String },

    // ── Playback ─────────────────────────────────────────────────────

    #[error("Cannot play '{source_ref}'")]
    #[diagnostic(
        code(zowie::unsupported_source),
        help("Supported: rtsp://, rtmp://, srt://, http(s)://, camera.<id>, #<index>, peer:<serial>")
    )]
    UnsupportedSource { source_ref: String },

    #[error("Stream conversion unavailable for {url}")]
    #[diagnostic(
        code(zowie::bridge),
        help(
            "Check that go2rtc is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    BridgeUnavailable { url: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(zowie::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(zowie::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Or pass the device address with --host."
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device configured")]
    #[diagnostic(
        code(zowie::no_config),
        help(
            "Pass --host (or set ZOWIE_HOST), or add a profile to:\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(zowie::config))]
    Config(Box<ConfigError>),

    // ── Internal ─────────────────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(zowie::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(zowie::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::Busy { .. } | Self::BridgeUnavailable { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidState { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::UnsupportedSource { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceUnreachable { url, reason } => CliError::Unreachable { url, reason },

            CoreError::DeviceUnavailable => CliError::Unreachable {
                url: "(configured device)".into(),
                reason: "the device stopped answering".into(),
            },

            CoreError::DeviceBusy { message } => CliError::Busy { message },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::ValidationFailed { code, message } => CliError::Rejected { code, message },

            CoreError::Feature {
                domain,
                code,
                message,
            } => CliError::Unsupported {
                operation: format!("{domain} request"),
                reason: format!("status {code}: {message}"),
            },

            CoreError::Device { code, message } => CliError::Device { code, message },

            CoreError::UnsupportedSource { source_ref } => {
                CliError::UnsupportedSource { source_ref }
            }

            CoreError::ConversionUnavailable { url, reason } => {
                CliError::BridgeUnavailable { url, reason }
            }

            CoreError::SourceNotFound { identifier } => CliError::NotFound {
                resource_type: "source".into(),
                identifier,
                list_command: "discover".into(),
            },

            CoreError::InvalidTransition { action, state } => {
                CliError::InvalidState { action, state }
            }

            CoreError::Discovery { reason } => CliError::Unsupported {
                operation: "Discovery".into(),
                reason,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<zowie_api::Error> for CliError {
    fn from(err: zowie_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
