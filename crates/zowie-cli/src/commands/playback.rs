//! Decoder control: play, stop, standby, wake.

use std::time::Duration;

use serde::Serialize;
use zowie_core::{DecoderState, Device, PlayCommand, StreamSourceRef};

use crate::cli::{GlobalOpts, PlayArgs};
use crate::error::CliError;
use crate::output;

/// Parse a source argument: `#<index>`, `peer:<serial>`, or a URL.
pub fn parse_source(input: &str) -> Result<StreamSourceRef, CliError> {
    let input = input.trim();
    if let Some(index) = input.strip_prefix('#') {
        let index = index.parse::<i64>().map_err(|_| CliError::Validation {
            field: "source".into(),
            reason: format!("'{input}' is not a source index"),
        })?;
        return Ok(StreamSourceRef::ConfiguredOutput(index));
    }
    if let Some(serial) = input.strip_prefix("peer:") {
        if serial.is_empty() {
            return Err(CliError::Validation {
                field: "source".into(),
                reason: "peer serial is empty".into(),
            });
        }
        return Ok(StreamSourceRef::DiscoveredPeer(serial.to_owned()));
    }
    Ok(StreamSourceRef::url(input)?)
}

#[derive(Debug, Serialize)]
struct PlayOutcome {
    source: String,
    method: &'static str,
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bridged_from: Option<String>,
}

impl PlayOutcome {
    fn new(source: &StreamSourceRef, command: PlayCommand) -> Self {
        let source = source.to_string();
        match command {
            PlayCommand::SelectConfigured { index } => Self {
                source,
                method: "configured",
                target: format!("#{index}"),
                stream_type: None,
                bridged_from: None,
            },
            PlayCommand::PlayUrl {
                url,
                stream_type,
                bridged_from,
            } => Self {
                source,
                method: if bridged_from.is_some() { "bridged" } else { "direct" },
                target: url,
                stream_type: Some(stream_type.to_string()),
                bridged_from,
            },
            PlayCommand::PlayNdi { name } => Self {
                source,
                method: "ndi",
                target: name,
                stream_type: None,
                bridged_from: None,
            },
        }
    }

    fn detail(&self) -> String {
        output::detail_lines(&[
            ("Playing", self.source.clone()),
            ("Method", self.method.to_owned()),
            ("Target", self.target.clone()),
            ("Type", self.stream_type.clone().unwrap_or_default()),
        ])
    }
}

pub async fn play(device: &Device, args: &PlayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let source = parse_source(&args.source)?;

    if matches!(source, StreamSourceRef::DiscoveredPeer(_)) {
        let peers = device
            .discover(Duration::from_secs(args.discover_wait))
            .await?;
        tracing::debug!(count = peers.len(), "peers discovered");
    }

    let command = device.play(source.clone()).await?;
    let outcome = PlayOutcome::new(&source, command);
    let out = output::render_single(&global.output, &outcome, PlayOutcome::detail, |o| {
        o.target.clone()
    })?;
    output::print_output(&out, global.quiet);

    // A bridged stream lives only as long as this process holds the
    // conversion.
    if device.cache().is_some_and(|cache| !cache.is_empty()) {
        if !global.quiet {
            eprintln!("Holding stream conversion; press Ctrl-C to stop playback");
        }
        tokio::signal::ctrl_c().await?;
        device.stop().await?;
    }

    device.shutdown().await;
    Ok(())
}

pub async fn stop(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    device.stop().await?;
    done("Playback stopped", global);
    Ok(())
}

pub async fn standby(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    device.standby().await?;
    done("Device is entering standby", global);
    Ok(())
}

pub async fn wake(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    // Decoder state is per process and a fresh one never starts in Standby.
    if device.decoder_state() == DecoderState::Standby {
        device.wake().await?;
    } else {
        device.client().power_on().await?;
    }
    done("Device is waking", global);
    Ok(())
}

fn done(message: &str, global: &GlobalOpts) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
