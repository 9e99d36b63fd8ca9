//! Device-side logic between `zowie-api` and its consumers.
//!
//! - **[`Device`]**: facade owning one device's client, coordinator,
//!   resolver, and conversion cache. [`start()`](Device::start) spawns the
//!   refresh loop and cache sweep; [`shutdown()`](Device::shutdown) stops
//!   them and releases held conversions.
//!
//! - **[`SyncCoordinator`]**: periodic, single-flight polling of the
//!   device's data groups into an [`ArcSwap`](arc_swap::ArcSwap)-published
//!   [`DeviceSnapshot`], with an availability state machine and typed
//!   [`DeviceEvent`]s.
//!
//! - **[`PlaybackResolver`]**: maps a [`StreamSourceRef`] onto decoder
//!   commands, bridging sources the decoder cannot play through a
//!   [`StreamBridge`] and the reference-counted [`ConversionCache`].
//!
//! - **[`configure`]**: read-merge-write helpers for endpoints the device
//!   only accepts whole.

pub mod bridge;
pub mod cache;
pub mod config;
pub mod configure;
pub mod coordinator;
pub mod decoder;
pub mod device;
pub mod error;
pub mod resolver;
pub mod snapshot;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Go2rtcBridge, Provisioned, StreamBridge};
pub use cache::{ConversionCache, ConversionCacheEntry};
pub use config::DeviceConfig;
pub use configure::{configure_ndi, NdiChange};
pub use coordinator::{AvailabilityChange, CycleSummary, DeviceEvent, SyncCoordinator};
pub use decoder::{DecoderInput, DecoderState};
pub use device::Device;
pub use error::CoreError;
pub use resolver::{PlayCommand, PlaybackResolver};
pub use snapshot::{Availability, DeviceSnapshot, Group, GroupSlot};
pub use source::{Route, SourceScheme, StreamSourceRef};
