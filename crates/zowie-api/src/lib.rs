// zowie-api: Async Rust client for the ZowieBox control protocol, multicast
// discovery, and the go2rtc stream bridge.

pub mod bridge;
pub mod client;
pub mod discovery;
pub mod envelope;
pub mod error;
pub mod models;
pub mod session;
pub mod status;
pub mod transport;

mod audio;
mod ptz;
mod stream;
mod streamplay;
mod system;
mod video;

pub use bridge::{BridgeConfig, Go2rtcClient};
pub use client::ProtocolClient;
pub use discovery::{Announcement, DeviceDescriptor, Directory, DiscoveryService};
pub use envelope::{Access, Module, Point, Request, Response};
pub use error::Error;
pub use session::{Credentials, Session};
pub use status::{classify, FeatureDomain, StatusOutcome};
pub use transport::TransportConfig;
