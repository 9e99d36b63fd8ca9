// ── Device facade ──
//
// Owns everything needed to drive one ZowieBox: the protocol client, the
// sync coordinator, the playback resolver and its conversion cache, and
// the peer directory. `start()` spawns the background activities, each on
// a child of one cancellation token; `shutdown()` tears them down and
// releases every conversion still held at the bridge.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zowie_api::models::NdiConfig;
use zowie_api::{
    Credentials, DeviceDescriptor, Directory, DiscoveryService, ProtocolClient, TransportConfig,
};

use crate::bridge::{Go2rtcBridge, StreamBridge};
use crate::cache::ConversionCache;
use crate::config::DeviceConfig;
use crate::configure::{configure_ndi, NdiChange};
use crate::coordinator::{AvailabilityChange, CycleSummary, DeviceEvent, SyncCoordinator};
use crate::decoder::DecoderState;
use crate::error::CoreError;
use crate::resolver::{PlayCommand, PlaybackResolver};
use crate::snapshot::{Availability, DeviceSnapshot};
use crate::source::StreamSourceRef;

/// Handle to one managed device. Cheaply cloneable.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    config: DeviceConfig,
    client: Arc<ProtocolClient>,
    coordinator: Arc<SyncCoordinator>,
    resolver: Arc<PlaybackResolver>,
    cache: Option<Arc<ConversionCache>>,
    directory: Directory,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Device {
    /// Build a device from configuration, with the go2rtc bridge when one
    /// is configured. Does not touch the network.
    pub fn new(config: DeviceConfig) -> Result<Self, CoreError> {
        let bridge = match config.bridge {
            Some(ref bridge) => {
                let bridge: Arc<dyn StreamBridge> = Arc::new(Go2rtcBridge::from_config(bridge)?);
                Some(bridge)
            }
            None => None,
        };
        Self::with_bridge(config, bridge)
    }

    /// Build a device with an explicit bridge (or none).
    pub fn with_bridge(
        config: DeviceConfig,
        bridge: Option<Arc<dyn StreamBridge>>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        }
        .with_retry_delays(config.retry_delays.clone());
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_owned(),
        );
        let client = Arc::new(ProtocolClient::new(
            config.url.clone(),
            credentials,
            &transport,
        )?);

        let cancel = CancellationToken::new();
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&client),
            config.scan_interval(),
            config.unavailable_threshold(),
            cancel.child_token(),
        ));
        let cache = bridge.map(|bridge| Arc::new(ConversionCache::new(bridge, config.cache_ttl)));
        let directory = Directory::new();
        let resolver = Arc::new(PlaybackResolver::new(
            Arc::clone(&client),
            directory.clone(),
            cache.clone(),
            config.managed_source_name.clone(),
        ));

        Ok(Self {
            inner: Arc::new(DeviceInner {
                config,
                client,
                coordinator,
                resolver,
                cache,
                directory,
                cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<ProtocolClient> {
        &self.inner.client
    }

    pub fn directory(&self) -> &Directory {
        &self.inner.directory
    }

    pub fn cache(&self) -> Option<&Arc<ConversionCache>> {
        self.inner.cache.as_ref()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the refresh loop, the cache sweep, and availability
    /// forwarding into the decoder state.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("device already started");
            return;
        }

        // Subscribe before the first cycle can publish.
        let events = self.inner.coordinator.events();
        let availability = self.inner.coordinator.availability();
        let initial = *availability.borrow();
        handles.push(tokio::spawn(availability_task(
            events,
            availability,
            initial,
            Arc::clone(&self.inner.resolver),
            self.inner.cancel.child_token(),
        )));

        handles.push(tokio::spawn(Arc::clone(&self.inner.coordinator).run()));

        if let Some(ref cache) = self.inner.cache {
            handles.push(tokio::spawn(sweep_task(
                Arc::clone(cache),
                self.inner.config.sweep_interval(),
                self.inner.cancel.child_token(),
            )));
        }

        info!(url = %self.inner.config.url, "device started");
    }

    /// Keep the peer directory warm from multicast announcements until
    /// shutdown.
    pub async fn listen_for_peers(&self) {
        let discovery = self.discovery();
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(async move {
            if let Err(e) = discovery.listen(|_| {}, cancel).await {
                warn!(error = %e, "discovery listener failed");
            }
        });
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Cancel background work, wait for it, and release all conversions.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.coordinator.shutdown().await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Some(ref cache) = self.inner.cache {
            cache.release_all().await;
        }
        debug!("device shut down");
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        self.inner.coordinator.snapshot()
    }

    pub fn availability(&self) -> watch::Receiver<Availability> {
        self.inner.coordinator.availability()
    }

    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.coordinator.events()
    }

    /// Events as a stream. Notifications dropped to lag are skipped.
    pub fn event_stream(&self) -> impl Stream<Item = DeviceEvent> + Send + 'static {
        BroadcastStream::new(self.events()).filter_map(Result::ok)
    }

    /// The current availability, then every change.
    pub fn availability_stream(&self) -> WatchStream<Availability> {
        WatchStream::new(self.availability())
    }

    pub fn decoder_state(&self) -> DecoderState {
        self.inner.resolver.state()
    }

    pub fn decoder_updates(&self) -> watch::Receiver<DecoderState> {
        self.inner.resolver.subscribe()
    }

    /// Run one refresh cycle now.
    pub async fn refresh_now(&self) -> Option<CycleSummary> {
        self.inner.coordinator.refresh_now().await
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// A discovery service sharing this device's peer directory.
    pub fn discovery(&self) -> DiscoveryService {
        DiscoveryService::new(self.inner.config.requester_id.clone())
            .with_directory(self.inner.directory.clone())
    }

    /// One discovery pass; results also land in the peer directory.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, CoreError> {
        Ok(self.discovery().discover(timeout).await?)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn play(&self, source: StreamSourceRef) -> Result<PlayCommand, CoreError> {
        self.inner.resolver.resolve(source).await
    }

    pub async fn stop(&self) -> Result<(), CoreError> {
        self.inner.resolver.stop().await
    }

    pub async fn standby(&self) -> Result<(), CoreError> {
        self.inner.resolver.standby().await
    }

    pub async fn wake(&self) -> Result<(), CoreError> {
        self.inner.resolver.wake().await
    }

    pub async fn configure_ndi(&self, change: &NdiChange) -> Result<NdiConfig, CoreError> {
        configure_ndi(&self.inner.client, change).await
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed coordinator availability transitions into the decoder state, in
/// order, so a short outage between two polls still reaches the decoder.
/// After a lag the watched value is the only record left.
async fn availability_task(
    mut events: broadcast::Receiver<DeviceEvent>,
    availability: watch::Receiver<Availability>,
    mut last: Availability,
    resolver: Arc<PlaybackResolver>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = events.recv() => match received {
                Ok(DeviceEvent::Availability(change)) => {
                    resolver.on_availability(change);
                    last = change.to;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    let current = *availability.borrow();
                    warn!(skipped, "availability events lagged, resyncing");
                    if current != last {
                        resolver.on_availability(AvailabilityChange { from: last, to: current });
                        last = current;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("availability task stopped");
}

async fn sweep_task(cache: Arc<ConversionCache>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; nothing can be expired yet.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let evicted = cache.sweep().await;
                if evicted > 0 {
                    debug!(evicted, remaining = cache.len(), "conversion sweep");
                }
            }
        }
    }
    debug!("sweep task stopped");
}
