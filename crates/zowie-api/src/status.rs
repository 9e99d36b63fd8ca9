// Device status-code classification
//
// Every response envelope carries a zero-padded `status` string. The device
// family shares one numeric code space across all modules, so classification
// is a single lookup in `STATUS_TABLE`. New ranges go in the table, never in
// call sites.

use serde::Serialize;

/// Feature area a non-generic error code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FeatureDomain {
    /// Operation or group not implemented by this firmware/workmode.
    Unsupported,
    /// HDMI input has no signal (operations that need live video).
    Signal,
    /// Publishing (RTMP/SRT/NDI encode) errors.
    Streaming,
    /// Decoder/streamplay errors.
    Playback,
    /// Network configuration errors.
    Network,
    /// Account and credential errors.
    User,
}

/// Classification of a raw status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusOutcome {
    Success,
    /// Device not ready, or restarting its media pipeline.
    TransientBusy,
    /// Missing or invalid parameters. Never retried.
    ValidationError,
    /// Session not logged in.
    AuthRequired,
    FeatureError(FeatureDomain),
    Fatal,
}

#[derive(Debug, Clone, Copy)]
struct StatusRule {
    low: u32,
    high: u32,
    outcome: StatusOutcome,
}

const fn exact(code: u32, outcome: StatusOutcome) -> StatusRule {
    StatusRule {
        low: code,
        high: code,
        outcome,
    }
}

const fn range(low: u32, high: u32, outcome: StatusOutcome) -> StatusRule {
    StatusRule { low, high, outcome }
}

/// First match wins, so exact codes precede the ranges containing them.
const STATUS_TABLE: &[StatusRule] = &[
    exact(0, StatusOutcome::Success),
    exact(2, StatusOutcome::TransientBusy),
    exact(3, StatusOutcome::ValidationError),
    exact(4, StatusOutcome::FeatureError(FeatureDomain::Unsupported)),
    exact(10000, StatusOutcome::TransientBusy),
    exact(10001, StatusOutcome::FeatureError(FeatureDomain::Signal)),
    range(50000, 59999, StatusOutcome::FeatureError(FeatureDomain::Streaming)),
    range(60000, 69999, StatusOutcome::FeatureError(FeatureDomain::Playback)),
    range(70000, 79999, StatusOutcome::FeatureError(FeatureDomain::Network)),
    exact(80003, StatusOutcome::AuthRequired),
    range(80000, 89999, StatusOutcome::FeatureError(FeatureDomain::User)),
];

/// Classify a status code string.
///
/// Width is irrelevant: `"00000"`, `"000000"` and `"0"` all denote success.
/// Anything non-numeric or absent from the table is `Fatal`.
pub fn classify(code: &str) -> StatusOutcome {
    let Ok(value) = code.trim().parse::<u32>() else {
        return StatusOutcome::Fatal;
    };
    STATUS_TABLE
        .iter()
        .find(|rule| (rule.low..=rule.high).contains(&value))
        .map_or(StatusOutcome::Fatal, |rule| rule.outcome)
}
