//! Watch command: run the refresh loop and print device events until
//! interrupted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_stream::StreamExt;
use zowie_core::{Device, DeviceEvent};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct EventLine {
    at: DateTime<Utc>,
    event: &'static str,
    detail: String,
}

impl EventLine {
    fn new(event: &DeviceEvent, color: bool) -> Self {
        let (name, detail) = match event {
            DeviceEvent::Availability(change) => (
                "availability",
                format!(
                    "{} -> {}",
                    change.from,
                    output::availability_label(change.to, color)
                ),
            ),
            DeviceEvent::StreamingStarted { output } => ("streaming_started", output.clone()),
            DeviceEvent::StreamingStopped { output } => ("streaming_stopped", output.clone()),
            DeviceEvent::VideoInputDetected { width, height } => (
                "video_input_detected",
                match (width, height) {
                    (Some(w), Some(h)) => format!("{w}x{h}"),
                    _ => String::new(),
                },
            ),
            DeviceEvent::VideoInputLost => ("video_input_lost", String::new()),
        };
        Self {
            at: Utc::now(),
            event: name,
            detail,
        }
    }

    fn render(&self, format: &OutputFormat) -> Result<String, CliError> {
        Ok(match format {
            OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(self)?,
            OutputFormat::Plain => self.event.to_owned(),
            OutputFormat::Table => format!(
                "{}  {:<22} {}",
                self.at.format("%H:%M:%S"),
                self.event,
                self.detail
            ),
        })
    }
}

pub async fn handle(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut events = std::pin::pin!(device.event_stream());
    let mut interrupt = std::pin::pin!(tokio::signal::ctrl_c());
    device.start().await;

    if !global.quiet {
        eprintln!(
            "Watching {} every {}s (Ctrl-C to stop)",
            device.config().url,
            device.config().scan_interval().as_secs()
        );
    }

    loop {
        tokio::select! {
            biased;
            _ = &mut interrupt => break,
            event = events.next() => {
                let Some(event) = event else { break };
                let line = EventLine::new(&event, color).render(&global.output)?;
                output::print_output(&line, global.quiet);
            }
        }
    }

    device.shutdown().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zowie_core::{Availability, AvailabilityChange};

    use super::*;

    #[test]
    fn availability_change_renders_both_states() {
        let event = DeviceEvent::Availability(AvailabilityChange {
            from: Availability::Healthy,
            to: Availability::Unavailable,
        });
        let line = EventLine::new(&event, false);
        assert_eq!(line.event, "availability");
        assert_eq!(line.detail, "healthy -> unavailable");

        let json: serde_json::Value =
            serde_json::from_str(&line.render(&OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["event"], "availability");
    }

    #[test]
    fn video_input_without_size_has_empty_detail() {
        let event = DeviceEvent::VideoInputDetected {
            width: None,
            height: Some(1080),
        };
        assert_eq!(EventLine::new(&event, false).detail, "");
    }
}
