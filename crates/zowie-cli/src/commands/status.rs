//! Status command: one refresh cycle, then the snapshot.

use chrono::{DateTime, Utc};
use strum::IntoEnumIterator;
use zowie_core::{Device, DeviceSnapshot, Group};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(cycle) = device.refresh_now().await {
        tracing::debug!(
            succeeded = cycle.succeeded,
            failed = cycle.failed,
            "refresh cycle finished"
        );
    }
    let snapshot = device.snapshot();
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        snapshot.as_ref(),
        |snap| detail(snap, color),
        |snap| snap.availability.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(snap: &DeviceSnapshot, color: bool) -> String {
    let system = snap.system.payload.as_deref();
    let attributes = system.map(|s| &s.attributes);
    let video = snap.video.payload.as_deref();
    let stream = snap.stream.payload.as_deref();
    let decoder = snap.decoder.payload.as_deref();

    let resolution = video
        .and_then(|v| Some((v.input.width?, v.input.height?)))
        .map(|(w, h)| format!("{w}x{h}"))
        .unwrap_or_default();

    let mut pairs = vec![
        (
            "Availability",
            output::availability_label(snap.availability, color),
        ),
        ("Serial", output::opt(snap.serial())),
        (
            "Name",
            output::opt(attributes.and_then(|a| a.device_name.as_deref())),
        ),
        (
            "Model",
            output::opt(attributes.and_then(|a| a.model.as_deref())),
        ),
        (
            "Firmware",
            output::opt(attributes.and_then(|a| a.firmware_version.as_deref())),
        ),
        ("Input", resolution),
        (
            "Streaming",
            stream.map(|s| s.active_outputs().join(", ")).unwrap_or_default(),
        ),
        (
            "Decoder",
            decoder
                .and_then(|d| d.active_source())
                .and_then(|s| s.url.clone().or_else(|| s.name.clone()))
                .unwrap_or_default(),
        ),
        (
            "Standby",
            if decoder.is_some_and(|d| d.is_standby()) {
                "yes".into()
            } else {
                String::new()
            },
        ),
        ("Last cycle", timestamp(snap.last_cycle)),
    ];

    for group in Group::iter() {
        if let Some(error) = snap.last_error(group) {
            pairs.push(("Error", format!("{group}: {error}")));
        }
    }

    output::detail_lines(&pairs)
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}
