// ── Device snapshot ──
//
// The local mirror of one device. One typed slot per data group, each
// keeping the last good payload alongside the last error, plus the
// aggregate availability. Published copy-on-write: readers load an
// `Arc<DeviceSnapshot>` and never observe a half-applied cycle.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use zowie_api::models::{
    AudioInfo, Dashboard, DecoderStatus, EncoderChannel, InputSignal, NdiConfig, NdiSource,
    OutputInfo, PublishEntry, RunStatus, StreamplaySource, SystemAttributes,
};

// ── Availability ─────────────────────────────────────────────────────

/// Aggregate device availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Availability {
    /// No cycle has produced data yet (or the device just came back).
    #[default]
    Initializing,
    /// Every group refreshed on the last cycle.
    Healthy,
    /// Some groups failed on the last cycle; their last good data is kept.
    Degraded,
    /// The device is not answering.
    Unavailable,
}

/// A data group refreshed by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Group {
    System,
    Video,
    Audio,
    Stream,
    Decoder,
}

// ── Group payloads ───────────────────────────────────────────────────

/// Identity plus optional load figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemGroup {
    pub attributes: SystemAttributes,
    pub dashboard: Option<Dashboard>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoGroup {
    pub input: InputSignal,
    pub output: Option<OutputInfo>,
    pub encoders: Vec<EncoderChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamGroup {
    pub publish: Vec<PublishEntry>,
    pub ndi: Option<NdiConfig>,
}

impl StreamGroup {
    /// Output kinds currently streaming: enabled publish entries plus `ndi`.
    pub fn active_outputs(&self) -> Vec<String> {
        let mut active: Vec<String> = self
            .publish
            .iter()
            .filter(|entry| entry.is_enabled())
            .filter_map(|entry| entry.kind.clone())
            .collect();
        if self.ndi.as_ref().is_some_and(NdiConfig::is_enabled) {
            active.push("ndi".into());
        }
        active
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecoderGroup {
    pub sources: Vec<StreamplaySource>,
    pub status: Option<DecoderStatus>,
    pub ndi_sources: Option<Vec<NdiSource>>,
    pub run_status: Option<RunStatus>,
}

impl DecoderGroup {
    pub fn active_source(&self) -> Option<&StreamplaySource> {
        self.sources.iter().find(|source| source.is_active())
    }

    pub fn is_standby(&self) -> bool {
        self.run_status.is_some_and(|status| status.is_standby())
    }
}

// ── Slots ────────────────────────────────────────────────────────────

/// Last good payload of one group plus its refresh bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSlot<T> {
    pub payload: Option<Arc<T>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl<T> Default for GroupSlot<T> {
    fn default() -> Self {
        Self {
            payload: None,
            last_success: None,
            last_error: None,
        }
    }
}

impl<T> GroupSlot<T> {
    /// Replace the payload wholesale.
    pub(crate) fn succeed(&mut self, payload: T, at: DateTime<Utc>) {
        self.payload = Some(Arc::new(payload));
        self.last_success = Some(at);
        self.last_error = None;
    }

    /// Record a failure, keeping the previous payload.
    pub(crate) fn fail(&mut self, error: String) {
        self.last_error = Some(error);
    }

    /// Fresh as of the last cycle.
    pub fn is_fresh(&self) -> bool {
        self.payload.is_some() && self.last_error.is_none()
    }
}

// ── DeviceSnapshot ───────────────────────────────────────────────────

/// Point-in-time view of one device.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceSnapshot {
    pub system: GroupSlot<SystemGroup>,
    pub video: GroupSlot<VideoGroup>,
    pub audio: GroupSlot<AudioInfo>,
    pub stream: GroupSlot<StreamGroup>,
    pub decoder: GroupSlot<DecoderGroup>,
    pub availability: Availability,
    /// Completed refresh cycles.
    pub cycles: u64,
    pub last_cycle: Option<DateTime<Utc>>,
}

impl DeviceSnapshot {
    pub fn last_error(&self, group: Group) -> Option<&str> {
        match group {
            Group::System => self.system.last_error.as_deref(),
            Group::Video => self.video.last_error.as_deref(),
            Group::Audio => self.audio.last_error.as_deref(),
            Group::Stream => self.stream.last_error.as_deref(),
            Group::Decoder => self.decoder.last_error.as_deref(),
        }
    }

    pub fn last_success(&self, group: Group) -> Option<DateTime<Utc>> {
        match group {
            Group::System => self.system.last_success,
            Group::Video => self.video.last_success,
            Group::Audio => self.audio.last_success,
            Group::Stream => self.stream.last_success,
            Group::Decoder => self.decoder.last_success,
        }
    }

    /// Serial number, once the system group has been read.
    pub fn serial(&self) -> Option<&str> {
        self.system
            .payload
            .as_deref()
            .and_then(|system| system.attributes.serial.as_deref())
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Single-writer, multi-reader holder for the current snapshot.
#[derive(Default)]
pub struct SnapshotStore {
    current: ArcSwap<DeviceSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot (cheap `Arc` clone).
    pub fn load(&self) -> Arc<DeviceSnapshot> {
        self.current.load_full()
    }

    /// Publish a fully built snapshot.
    pub(crate) fn publish(&self, snapshot: DeviceSnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
