// ── Sync coordinator ──
//
// Keeps a `DeviceSnapshot` fresh by polling the device's data groups on
// a fixed interval. Groups fail independently: a failing group keeps its
// last good payload while the others move on. Per-cycle results feed the
// availability state machine, and every real transition is broadcast as
// a typed `DeviceEvent`.

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zowie_api::{Error as ApiError, ProtocolClient};

use crate::snapshot::{
    Availability, DecoderGroup, DeviceSnapshot, Group, GroupSlot, SnapshotStore, StreamGroup,
    SystemGroup, VideoGroup,
};

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Events ───────────────────────────────────────────────────────────

/// One availability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityChange {
    pub from: Availability,
    pub to: Availability,
}

/// Typed notifications emitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Availability(AvailabilityChange),
    /// An output (`rtmp`, `srt`, `ndi`) started streaming.
    StreamingStarted { output: String },
    StreamingStopped { output: String },
    VideoInputDetected {
        width: Option<i64>,
        height: Option<i64>,
    },
    VideoInputLost,
}

// ── Availability state machine ───────────────────────────────────────

/// Outcome of one refresh cycle, as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// At least one failure was a connect error or timeout.
    pub unreachable: bool,
}

impl CycleSummary {
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0 && self.failed > 0
    }
}

/// Availability bookkeeping across cycles.
#[derive(Debug, Clone)]
pub struct AvailabilityTracker {
    state: Availability,
    consecutive_failures: u32,
    threshold: u32,
}

impl AvailabilityTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: Availability::Initializing,
            consecutive_failures: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn state(&self) -> Availability {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Fold one cycle into the state and return the transitions it caused.
    ///
    /// Recovering from Unavailable passes through Initializing, so such a
    /// cycle yields two transitions.
    pub fn record(&mut self, cycle: CycleSummary) -> Vec<AvailabilityChange> {
        let mut changes = Vec::new();

        if cycle.all_failed() {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if cycle.unreachable || self.consecutive_failures >= self.threshold {
                self.transition(Availability::Unavailable, &mut changes);
            }
            return changes;
        }
        if cycle.succeeded == 0 {
            return changes;
        }

        self.consecutive_failures = 0;
        if self.state == Availability::Unavailable {
            self.transition(Availability::Initializing, &mut changes);
        }
        let settled = if cycle.failed == 0 {
            Availability::Healthy
        } else {
            Availability::Degraded
        };
        self.transition(settled, &mut changes);
        changes
    }

    fn transition(&mut self, to: Availability, changes: &mut Vec<AvailabilityChange>) {
        if self.state != to {
            changes.push(AvailabilityChange {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }
}

// ── Group fetches ────────────────────────────────────────────────────

/// Sub-requests some firmware does not implement. A feature or validation
/// answer leaves the field absent instead of failing the group.
async fn optional<T>(
    what: &'static str,
    fetch: impl Future<Output = Result<T, ApiError>>,
) -> Result<Option<T>, ApiError> {
    match fetch.await {
        Ok(value) => Ok(Some(value)),
        Err(e @ (ApiError::Feature { .. } | ApiError::Validation { .. })) => {
            debug!(what, error = %e, "optional sub-request unavailable");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn fetch_system(client: &ProtocolClient) -> Result<SystemGroup, ApiError> {
    let attributes = client.system_attributes().await?;
    let dashboard = optional("dashboard", client.dashboard()).await?;
    Ok(SystemGroup {
        attributes,
        dashboard,
    })
}

async fn fetch_video(client: &ProtocolClient) -> Result<VideoGroup, ApiError> {
    let input = client.input_signal().await?;
    let output = optional("output_info", client.output_info()).await?;
    let encoders = optional("venc", client.encoder_channels())
        .await?
        .unwrap_or_default();
    Ok(VideoGroup {
        input,
        output,
        encoders,
    })
}

async fn fetch_stream(client: &ProtocolClient) -> Result<StreamGroup, ApiError> {
    let publish = client.publish_list().await?;
    let ndi = optional("ndi_config", client.ndi_config()).await?;
    Ok(StreamGroup { publish, ndi })
}

async fn fetch_decoder(client: &ProtocolClient) -> Result<DecoderGroup, ApiError> {
    let sources = client.streamplay_sources().await?;
    let status = optional("decoder_status", client.decoder_status()).await?;
    let ndi_sources = optional("ndi_sources", client.ndi_sources()).await?;
    let run_status = optional("run_status", client.run_status()).await?;
    Ok(DecoderGroup {
        sources,
        status,
        ndi_sources,
        run_status,
    })
}

/// Abandon a group fetch, between any of its sub-requests or retries, once
/// teardown begins.
async fn unless_cancelled<T>(
    cancel: &CancellationToken,
    fetch: impl Future<Output = Result<T, ApiError>>,
) -> Option<Result<T, ApiError>> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        result = fetch => Some(result),
    }
}

/// Apply one group result to its slot and tally it.
fn apply<T>(
    group: Group,
    slot: &mut GroupSlot<T>,
    result: Result<T, ApiError>,
    summary: &mut CycleSummary,
) {
    match result {
        Ok(payload) => {
            slot.succeed(payload, Utc::now());
            summary.succeeded += 1;
        }
        Err(e) => {
            debug!(%group, error = %e, "group refresh failed");
            summary.unreachable |= e.is_unreachable();
            summary.failed += 1;
            slot.fail(e.to_string());
        }
    }
}

// ── SyncCoordinator ──────────────────────────────────────────────────

/// Periodic, non-overlapping refresh of one device.
pub struct SyncCoordinator {
    client: Arc<ProtocolClient>,
    store: SnapshotStore,
    tracker: StdMutex<AvailabilityTracker>,
    availability: watch::Sender<Availability>,
    events: broadcast::Sender<DeviceEvent>,
    /// Held for the duration of a cycle; `try_lock` failure means skip.
    cycle: Mutex<()>,
    cancel: CancellationToken,
    interval: Duration,
}

impl SyncCoordinator {
    pub fn new(
        client: Arc<ProtocolClient>,
        interval: Duration,
        unavailable_threshold: u32,
        cancel: CancellationToken,
    ) -> Self {
        let (availability, _) = watch::channel(Availability::Initializing);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            client,
            store: SnapshotStore::new(),
            tracker: StdMutex::new(AvailabilityTracker::new(unavailable_threshold)),
            availability,
            events,
            cycle: Mutex::new(()),
            cancel,
            interval,
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        self.store.load()
    }

    pub fn availability(&self) -> watch::Receiver<Availability> {
        self.availability.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    pub fn client(&self) -> &Arc<ProtocolClient> {
        &self.client
    }

    /// Run one cycle now. Returns `None` if a cycle was already running or
    /// the coordinator has been torn down.
    pub async fn refresh_now(&self) -> Option<CycleSummary> {
        let Ok(_cycle) = self.cycle.try_lock() else {
            debug!("refresh cycle already running, skipping");
            return None;
        };
        if self.cancel.is_cancelled() {
            return None;
        }

        let client = self.client.as_ref();
        let cancel = &self.cancel;
        let (system, video, audio, stream, decoder) = tokio::join!(
            unless_cancelled(cancel, fetch_system(client)),
            unless_cancelled(cancel, fetch_video(client)),
            unless_cancelled(cancel, client.audio_info()),
            unless_cancelled(cancel, fetch_stream(client)),
            unless_cancelled(cancel, fetch_decoder(client)),
        );

        if self.cancel.is_cancelled() {
            debug!("coordinator torn down mid-cycle, discarding results");
            return None;
        }
        let (Some(system), Some(video), Some(audio), Some(stream), Some(decoder)) =
            (system, video, audio, stream, decoder)
        else {
            return None;
        };

        let previous = self.store.load();
        let mut next = DeviceSnapshot::clone(&previous);
        let mut summary = CycleSummary::default();

        apply(Group::System, &mut next.system, system, &mut summary);
        apply(Group::Video, &mut next.video, video, &mut summary);
        apply(Group::Audio, &mut next.audio, audio, &mut summary);
        apply(Group::Stream, &mut next.stream, stream, &mut summary);
        apply(Group::Decoder, &mut next.decoder, decoder, &mut summary);

        let changes = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(summary);

        next.availability = changes.last().map_or(previous.availability, |c| c.to);
        next.cycles += 1;
        next.last_cycle = Some(Utc::now());

        let mut events: Vec<DeviceEvent> = changes
            .iter()
            .copied()
            .map(DeviceEvent::Availability)
            .collect();
        events.extend(content_events(&previous, &next));

        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            availability = %next.availability,
            "refresh cycle complete"
        );
        self.store.publish(next);

        for change in &changes {
            info!(from = %change.from, to = %change.to, "device availability changed");
            self.availability.send_replace(change.to);
        }
        for event in events {
            let _ = self.events.send(event);
        }

        Some(summary)
    }

    /// Refresh loop: one cycle per tick until cancelled. Ticks missed while
    /// a cycle runs are skipped, not queued.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    if self.refresh_now().await.is_none() {
                        debug!("refresh tick produced no cycle");
                    }
                }
            }
        }
        debug!("refresh loop stopped");
    }

    /// Stop scheduling and wait for any in-flight cycle to finish. No
    /// device I/O happens after this returns.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let _drained = self.cycle.lock().await;
        debug!("coordinator shut down");
    }
}

/// Streaming and video-input transitions between two successful reads.
fn content_events(previous: &DeviceSnapshot, next: &DeviceSnapshot) -> Vec<DeviceEvent> {
    let mut events = Vec::new();

    if let (Some(before), Some(after)) = (&previous.video.payload, &next.video.payload) {
        if !Arc::ptr_eq(before, after) {
            match (before.input.has_signal(), after.input.has_signal()) {
                (false, true) => events.push(DeviceEvent::VideoInputDetected {
                    width: after.input.width,
                    height: after.input.height,
                }),
                (true, false) => events.push(DeviceEvent::VideoInputLost),
                _ => {}
            }
        }
    }

    if let (Some(before), Some(after)) = (&previous.stream.payload, &next.stream.payload) {
        if !Arc::ptr_eq(before, after) {
            let was = before.active_outputs();
            let now = after.active_outputs();
            for output in now.iter().filter(|o| !was.contains(o)) {
                events.push(DeviceEvent::StreamingStarted {
                    output: output.clone(),
                });
            }
            for output in was.iter().filter(|o| !now.contains(o)) {
                events.push(DeviceEvent::StreamingStopped {
                    output: output.clone(),
                });
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cycle(succeeded: usize, failed: usize) -> CycleSummary {
        CycleSummary {
            succeeded,
            failed,
            unreachable: false,
        }
    }

    #[test]
    fn first_success_settles_healthy_or_degraded() {
        let mut tracker = AvailabilityTracker::new(3);
        let changes = tracker.record(cycle(4, 1));
        assert_eq!(
            changes,
            vec![AvailabilityChange {
                from: Availability::Initializing,
                to: Availability::Degraded,
            }]
        );

        let changes = tracker.record(cycle(5, 0));
        assert_eq!(changes.len(), 1);
        assert_eq!(tracker.state(), Availability::Healthy);
    }

    #[test]
    fn partial_failure_stays_degraded() {
        let mut tracker = AvailabilityTracker::new(3);
        tracker.record(cycle(5, 0));
        for _ in 0..3 {
            tracker.record(cycle(4, 1));
        }
        assert_eq!(tracker.state(), Availability::Degraded);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn unavailable_after_threshold_fires_once() {
        let mut tracker = AvailabilityTracker::new(3);
        tracker.record(cycle(5, 0));

        let mut fired = Vec::new();
        for _ in 0..6 {
            fired.extend(tracker.record(cycle(0, 5)));
        }
        assert_eq!(
            fired,
            vec![AvailabilityChange {
                from: Availability::Healthy,
                to: Availability::Unavailable,
            }]
        );
    }

    #[test]
    fn unreachable_is_immediate() {
        let mut tracker = AvailabilityTracker::new(3);
        let changes = tracker.record(CycleSummary {
            succeeded: 0,
            failed: 5,
            unreachable: true,
        });
        assert_eq!(changes.len(), 1);
        assert_eq!(tracker.state(), Availability::Unavailable);
    }

    #[test]
    fn recovery_passes_through_initializing() {
        let mut tracker = AvailabilityTracker::new(1);
        tracker.record(cycle(0, 5));
        assert_eq!(tracker.state(), Availability::Unavailable);

        let changes = tracker.record(cycle(5, 0));
        let path: Vec<Availability> = changes.iter().map(|c| c.to).collect();
        assert_eq!(path, vec![Availability::Initializing, Availability::Healthy]);
    }

    #[test]
    fn failures_below_threshold_do_not_transition() {
        let mut tracker = AvailabilityTracker::new(3);
        tracker.record(cycle(5, 0));
        assert!(tracker.record(cycle(0, 5)).is_empty());
        assert!(tracker.record(cycle(0, 5)).is_empty());
        assert_eq!(tracker.state(), Availability::Healthy);

        tracker.record(cycle(1, 4));
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn video_input_events() {
        use zowie_api::models::InputSignal;

        let mut previous = DeviceSnapshot::default();
        previous.video.succeed(VideoGroup::default(), Utc::now());

        let mut next = previous.clone();
        next.video.succeed(
            VideoGroup {
                input: InputSignal {
                    signal: Some(1),
                    width: Some(1920),
                    height: Some(1080),
                    ..InputSignal::default()
                },
                ..VideoGroup::default()
            },
            Utc::now(),
        );

        assert_eq!(
            content_events(&previous, &next),
            vec![DeviceEvent::VideoInputDetected {
                width: Some(1920),
                height: Some(1080),
            }]
        );
        assert_eq!(content_events(&next, &previous), vec![DeviceEvent::VideoInputLost]);
    }
}
