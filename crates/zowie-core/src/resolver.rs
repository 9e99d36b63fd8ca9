// ── Playback resolver ──
//
// Turns a `StreamSourceRef` into a device play command. Native transports
// go straight to the decoder; HTTP-family sources and host cameras are
// converted through the stream bridge first, with the resulting endpoint
// held in the conversion cache for as long as it is playing. Owns the
// decoder state machine.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};
use zowie_api::models::{StreamType, StreamplaySource};
use zowie_api::{Directory, ProtocolClient};

use crate::cache::ConversionCache;
use crate::coordinator::AvailabilityChange;
use crate::decoder::{DecoderInput, DecoderState};
use crate::error::CoreError;
use crate::snapshot::Availability;
use crate::source::{Route, StreamSourceRef};

/// The command sent to the device for a resolved source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayCommand {
    /// Switch on a source already configured on the device.
    SelectConfigured { index: i64 },
    /// Play a URL through the decoder's source list.
    PlayUrl {
        url: String,
        stream_type: StreamType,
        /// The original source when `url` is a bridge endpoint.
        bridged_from: Option<String>,
    },
    /// Decode a named NDI source.
    PlayNdi { name: String },
}

/// Resolves playback sources for one device.
pub struct PlaybackResolver {
    client: Arc<ProtocolClient>,
    directory: Directory,
    cache: Option<Arc<ConversionCache>>,
    managed_source_name: String,
    state: watch::Sender<DecoderState>,
    /// Bridged source URL held by the current playback.
    lease: Mutex<Option<String>>,
}

impl PlaybackResolver {
    pub fn new(
        client: Arc<ProtocolClient>,
        directory: Directory,
        cache: Option<Arc<ConversionCache>>,
        managed_source_name: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(DecoderState::Idle);
        Self {
            client,
            directory,
            cache,
            managed_source_name: managed_source_name.into(),
            state,
            lease: Mutex::new(None),
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DecoderState> {
        self.state.subscribe()
    }

    pub fn cache(&self) -> Option<&Arc<ConversionCache>> {
        self.cache.as_ref()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Resolve `source`, send the play command, and move to Playing.
    ///
    /// Bridged sources that cannot be converted fail with
    /// `ConversionUnavailable`; they are never sent to the device as-is.
    pub async fn resolve(&self, source: StreamSourceRef) -> Result<PlayCommand, CoreError> {
        self.state().check(&DecoderInput::Play(source.clone()))?;

        let route = source.route()?;
        let (command, lease) = self.plan(&source, route).await?;
        debug!(%source, ?command, "source resolved");

        if let Err(e) = self.issue(&command).await {
            if let Some(ref url) = lease {
                self.release_url(url);
            }
            return Err(e);
        }

        self.replace_lease(lease);
        info!(%source, "playback started");
        self.transition(&DecoderInput::Play(source))?;
        Ok(command)
    }

    /// Stop playback. Stopping while idle is a no-op on the state.
    pub async fn stop(&self) -> Result<(), CoreError> {
        let current = self.state();
        current.check(&DecoderInput::Stop)?;

        if matches!(current, DecoderState::Playing(StreamSourceRef::DiscoveredPeer(_))) {
            self.client.disable_ndi_decoding().await?;
        } else {
            self.client.stop_streamplay().await?;
        }

        self.replace_lease(None);
        self.transition(&DecoderInput::Stop)
    }

    /// Put the device into standby, releasing any conversion in use.
    pub async fn standby(&self) -> Result<(), CoreError> {
        self.state().check(&DecoderInput::Standby)?;
        self.client.power_off().await?;
        self.replace_lease(None);
        self.transition(&DecoderInput::Standby)
    }

    /// Wake the device from standby.
    pub async fn wake(&self) -> Result<(), CoreError> {
        self.state().check(&DecoderInput::Wake)?;
        self.client.power_on().await?;
        self.transition(&DecoderInput::Wake)
    }

    /// Follow a coordinator availability transition.
    pub fn on_availability(&self, change: AvailabilityChange) {
        let input = match (change.from, change.to) {
            (_, Availability::Unavailable) => DecoderInput::DeviceUnreachable,
            (Availability::Unavailable, _) => DecoderInput::DeviceReachable,
            _ => return,
        };
        if input == DecoderInput::DeviceUnreachable {
            self.replace_lease(None);
        }
        // Reachability inputs are legal from every state.
        let _ = self.transition(&input);
    }

    // ── Planning ─────────────────────────────────────────────────────

    /// The command for `route`, plus the bridged URL it holds a cache
    /// reference on.
    async fn plan(
        &self,
        source: &StreamSourceRef,
        route: Route,
    ) -> Result<(PlayCommand, Option<String>), CoreError> {
        match route {
            Route::Configured(index) => Ok((PlayCommand::SelectConfigured { index }, None)),
            Route::Peer(serial) => {
                let peer = self
                    .directory
                    .get(&serial)
                    .ok_or_else(|| CoreError::SourceNotFound {
                        identifier: serial.clone(),
                    })?;
                Ok((PlayCommand::PlayNdi { name: peer.name }, None))
            }
            Route::Direct(stream_type) => Ok((
                PlayCommand::PlayUrl {
                    url: source.to_string(),
                    stream_type,
                    bridged_from: None,
                },
                None,
            )),
            Route::Bridged => {
                let original = source.to_string();
                let Some(ref cache) = self.cache else {
                    return Err(CoreError::ConversionUnavailable {
                        url: original,
                        reason: "no stream bridge configured".into(),
                    });
                };
                let endpoint = cache.acquire(&original).await?;
                let stream_type = endpoint
                    .split_once("://")
                    .and_then(|(scheme, _)| StreamType::from_scheme(scheme))
                    .unwrap_or(StreamType::Rtsp);
                Ok((
                    PlayCommand::PlayUrl {
                        url: endpoint,
                        stream_type,
                        bridged_from: Some(original.clone()),
                    },
                    Some(original),
                ))
            }
        }
    }

    async fn issue(&self, command: &PlayCommand) -> Result<(), CoreError> {
        match command {
            PlayCommand::SelectConfigured { index } => {
                self.client.switch_streamplay_source(*index, true).await?;
            }
            PlayCommand::PlayNdi { name } => self.client.enable_ndi_decoding(name).await?,
            PlayCommand::PlayUrl {
                url, stream_type, ..
            } => self.play_url(url, *stream_type).await?,
        }
        Ok(())
    }

    /// Load `url` into the decoder.
    ///
    /// A source already pointing at `url` is reused, cycled off first if it
    /// is on so the decoder reloads it. Otherwise the managed source is
    /// repointed (or created) and switched on.
    async fn play_url(&self, url: &str, stream_type: StreamType) -> Result<(), CoreError> {
        let sources = self.client.streamplay_sources().await?;

        if let Some((index, active)) = indexed(&sources, |s| s.url.as_deref() == Some(url)) {
            if active {
                debug!(index, "source already active, cycling to reload");
                self.client.switch_streamplay_source(index, false).await?;
            }
            self.client.switch_streamplay_source(index, true).await?;
            return Ok(());
        }

        let managed = indexed(&sources, |s| {
            s.name.as_deref() == Some(self.managed_source_name.as_str())
        });
        match managed {
            Some((index, active)) => {
                if active {
                    self.client.switch_streamplay_source(index, false).await?;
                }
                self.client
                    .modify_streamplay_source(index, &self.managed_source_name, url, stream_type)
                    .await?;
                self.client.switch_streamplay_source(index, true).await?;
            }
            None => {
                self.client
                    .add_streamplay_source(&self.managed_source_name, url, stream_type, true)
                    .await?;
            }
        }
        Ok(())
    }

    // ── State ────────────────────────────────────────────────────────

    fn transition(&self, input: &DecoderInput) -> Result<(), CoreError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match state.next(input) {
            Ok(next) if next == *state => false,
            Ok(next) => {
                debug!(from = state.name(), to = next.name(), "decoder state changed");
                *state = next;
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    fn replace_lease(&self, next: Option<String>) {
        let previous = {
            let mut lease = self.lease.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *lease, next)
        };
        if let Some(ref url) = previous {
            self.release_url(url);
        }
    }

    fn release_url(&self, url: &str) {
        if let Some(ref cache) = self.cache {
            cache.release(url);
        }
    }
}

/// Index and on/off state of the first source matching `predicate`.
fn indexed(
    sources: &[StreamplaySource],
    predicate: impl Fn(&StreamplaySource) -> bool,
) -> Option<(i64, bool)> {
    sources
        .iter()
        .filter(|source| predicate(source))
        .find_map(|source| source.index.map(|index| (index, source.is_active())))
}
