//! Zero-configuration device discovery over UDP multicast.
//!
//! Devices listen on `224.170.1.242:21007` and answer a
//! `check_devices_request` with a `check_devices_result` carrying their
//! address and identity. They also send unsolicited `keepalive` datagrams.
//! Delivery is best-effort: replies are deduplicated by serial, loss is
//! bounded by the collection timeout, and arrival order is irrelevant.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::lenient;

/// Discovery multicast group.
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 170, 1, 242);

/// Discovery port (requests, replies, and keepalives).
pub const DISCOVERY_PORT: u16 = 21007;

/// How long `discover` collects replies unless told otherwise.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

const MULTICAST_TTL: u32 = 2;
const MAX_DATAGRAM: usize = 4096;

// ── Descriptor ───────────────────────────────────────────────────────

/// A device located on the local network. Identity is the serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub address: Ipv4Addr,
    pub port: u16,
    pub serial: String,
    pub name: String,
    pub product_id: Option<i64>,
    pub workmode_id: Option<i64>,
    pub last_seen: DateTime<Utc>,
}

impl DeviceDescriptor {
    /// Control-protocol base URL for this device.
    pub fn base_url(&self) -> String {
        if self.port == 80 {
            format!("http://{}", self.address)
        } else {
            format!("http://{}:{}", self.address, self.port)
        }
    }
}

/// `data` of a `check_devices_result`.
#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default, deserialize_with = "lenient::string")]
    ip: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    web_port: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    device_sn: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    product_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    workmode_id: Option<i64>,
}

/// A datagram worth acting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// Reply to a discovery request.
    Device(DeviceDescriptor),
    /// Unsolicited heartbeat.
    Keepalive { serial: String, from: SocketAddr },
}

/// Parse one datagram. Malformed or irrelevant messages yield `None`.
pub(crate) fn parse_datagram(bytes: &[u8], from: SocketAddr) -> Option<Announcement> {
    let message: Value = match serde_json::from_slice(bytes) {
        Ok(message) => message,
        Err(e) => {
            debug!(%from, error = %e, "ignoring malformed discovery datagram");
            return None;
        }
    };

    match message.get("opt").and_then(Value::as_str) {
        Some("check_devices_result") => {
            let data: ResultData = serde_json::from_value(message.get("data")?.clone()).ok()?;
            let serial = data.device_sn.filter(|sn| !sn.is_empty())?;
            let address = data
                .ip
                .and_then(|ip| ip.parse().ok())
                .or(match from.ip() {
                    IpAddr::V4(v4) => Some(v4),
                    IpAddr::V6(_) => None,
                })?;
            let port = data
                .web_port
                .and_then(|port| u16::try_from(port).ok())
                .unwrap_or(80);

            Some(Announcement::Device(DeviceDescriptor {
                address,
                port,
                name: data.device_name.unwrap_or_else(|| serial.clone()),
                serial,
                product_id: data.product_id,
                workmode_id: data.workmode_id,
                last_seen: Utc::now(),
            }))
        }
        Some("keepalive") => {
            let serial = ["device_sn", "sn"]
                .iter()
                .find_map(|key| {
                    message
                        .get(key)
                        .or_else(|| message.get("data").and_then(|data| data.get(key)))
                })
                .and_then(Value::as_str)
                .filter(|sn| !sn.is_empty())?
                .to_owned();
            Some(Announcement::Keepalive { serial, from })
        }
        other => {
            debug!(%from, opt = ?other, "ignoring discovery message");
            None
        }
    }
}

// ── Directory ────────────────────────────────────────────────────────

/// Known devices keyed by serial, fed by discovery passes and keepalives.
///
/// Entries are replaced, never edited in place: a serial seen at a new
/// address gets a fresh descriptor.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    devices: Arc<DashMap<String, DeviceDescriptor>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or supersede. Returns `true` when the serial is new or moved.
    pub fn upsert(&self, descriptor: DeviceDescriptor) -> bool {
        let changed = self.devices.get(&descriptor.serial).is_none_or(|known| {
            known.address != descriptor.address || known.port != descriptor.port
        });
        self.devices.insert(descriptor.serial.clone(), descriptor);
        changed
    }

    /// Refresh `last_seen` for a keepalive. Unknown serials are ignored,
    /// since a keepalive carries no address to build a descriptor from.
    pub fn touch(&self, serial: &str) -> bool {
        let Some(known) = self.get(serial) else {
            return false;
        };
        self.devices.insert(
            serial.to_owned(),
            DeviceDescriptor {
                last_seen: Utc::now(),
                ..known
            },
        );
        true
    }

    pub fn get(&self, serial: &str) -> Option<DeviceDescriptor> {
        self.devices.get(serial).map(|entry| entry.value().clone())
    }

    /// All known devices, ordered by serial.
    pub fn snapshot(&self) -> Vec<DeviceDescriptor> {
        let mut devices: Vec<_> = self
            .devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        devices.sort_by(|a, b| a.serial.cmp(&b.serial));
        devices
    }

    /// Drop devices not heard from within `max_age`. Returns how many went.
    pub fn prune(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;
        let before = self.devices.len();
        self.devices.retain(|_, device| device.last_seen >= cutoff);
        before.saturating_sub(self.devices.len())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// ── Service ──────────────────────────────────────────────────────────

/// Multicast discovery bound to one requester identity and directory.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    requester_id: String,
    target: SocketAddr,
    directory: Directory,
}

impl DiscoveryService {
    pub fn new(requester_id: impl Into<String>) -> Self {
        Self {
            requester_id: requester_id.into(),
            target: SocketAddr::V4(SocketAddrV4::new(MULTICAST_GROUP, DISCOVERY_PORT)),
            directory: Directory::new(),
        }
    }

    /// Share an existing directory.
    pub fn with_directory(mut self, directory: Directory) -> Self {
        self.directory = directory;
        self
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Send one discovery request and collect replies until `timeout`.
    ///
    /// No replies is an empty result, not an error. Only a socket that
    /// cannot join the group fails.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, Error> {
        let socket = multicast_socket()?;
        let request = json!({
            "opt": "check_devices_request",
            "master_device_sn": self.requester_id,
        });
        socket
            .send_to(request.to_string().as_bytes(), self.target)
            .await
            .map_err(Error::Discovery)?;
        debug!(target = %self.target, ?timeout, "discovery request sent");

        let devices = collect(&socket, timeout).await;
        for device in &devices {
            self.directory.upsert(device.clone());
        }
        debug!(found = devices.len(), "discovery pass complete");
        Ok(devices)
    }

    /// Receive datagrams until `cancel` fires, keeping the directory warm.
    ///
    /// `on_announce` sees every keepalive and discovery reply, including
    /// replies to other hosts' requests.
    pub async fn listen<F>(&self, on_announce: F, cancel: CancellationToken) -> Result<(), Error>
    where
        F: FnMut(&Announcement) + Send,
    {
        let socket = multicast_socket()?;
        self.listen_on(&socket, on_announce, cancel).await;
        Ok(())
    }

    pub(crate) async fn listen_on<F>(
        &self,
        socket: &UdpSocket,
        mut on_announce: F,
        cancel: CancellationToken,
    ) where
        F: FnMut(&Announcement) + Send,
    {
        let mut buf = vec![0_u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                received = socket.recv_from(&mut buf) => {
                    let (len, from) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            warn!(error = %e, "discovery receive failed");
                            continue;
                        }
                    };
                    let Some(announcement) = buf.get(..len).and_then(|bytes| parse_datagram(bytes, from)) else {
                        continue;
                    };
                    match announcement {
                        Announcement::Device(ref device) => {
                            self.directory.upsert(device.clone());
                        }
                        Announcement::Keepalive { ref serial, .. } => {
                            self.directory.touch(serial);
                        }
                    }
                    on_announce(&announcement);
                }
            }
        }
        debug!("discovery listener stopped");
    }
}

/// Collect `check_devices_result` replies until `timeout`, one per serial.
/// A later reply for a serial replaces the earlier one.
pub(crate) async fn collect(socket: &UdpSocket, timeout: Duration) -> Vec<DeviceDescriptor> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut found: HashMap<String, DeviceDescriptor> = HashMap::new();
    let mut buf = vec![0_u8; MAX_DATAGRAM];

    loop {
        let (len, from) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await
        {
            Err(_elapsed) => break,
            Ok(Err(e)) => {
                debug!(error = %e, "discovery receive failed");
                continue;
            }
            Ok(Ok(received)) => received,
        };
        if let Some(Announcement::Device(device)) =
            buf.get(..len).and_then(|bytes| parse_datagram(bytes, from))
        {
            found.insert(device.serial.clone(), device);
        }
    }

    let mut devices: Vec<_> = found.into_values().collect();
    devices.sort_by(|a, b| a.serial.cmp(&b.serial));
    devices
}

/// Socket joined to the discovery group and bound to its port.
///
/// - SO_REUSEADDR (and SO_REUSEPORT on Unix) so `discover` and `listen`
///   can run side by side
/// - multicast TTL 2
fn multicast_socket() -> Result<UdpSocket, Error> {
    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(Error::Discovery)?;

    if let Err(e) = socket.set_reuse_address(true) {
        warn!(error = %e, "failed to set SO_REUSEADDR");
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        warn!(error = %e, "failed to set SO_REUSEPORT");
    }

    if let Err(e) = socket.set_multicast_ttl_v4(MULTICAST_TTL) {
        warn!(error = %e, "failed to set multicast TTL");
    }

    socket
        .join_multicast_v4(&MULTICAST_GROUP, &Ipv4Addr::UNSPECIFIED)
        .map_err(Error::Discovery)?;

    socket.set_nonblocking(true).map_err(Error::Discovery)?;

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DISCOVERY_PORT));
    socket.bind(&bind_addr.into()).map_err(Error::Discovery)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(Error::Discovery)
}
