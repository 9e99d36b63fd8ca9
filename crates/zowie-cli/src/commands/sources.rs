//! Decoder source listing.

use tabled::Tabled;
use zowie_api::models::StreamplaySource;
use zowie_core::Device;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "#")]
    index: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    streamtype: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&StreamplaySource> for SourceRow {
    fn from(s: &StreamplaySource) -> Self {
        Self {
            index: output::opt(s.index),
            name: s.name.clone().unwrap_or_default(),
            streamtype: output::opt(s.streamtype),
            url: s.url.clone().unwrap_or_default(),
            active: if s.is_active() { "yes".into() } else { String::new() },
        }
    }
}

pub async fn handle(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    let sources = device.client().streamplay_sources().await?;
    let out = output::render_list(&global.output, &sources, |s| SourceRow::from(s), |s| {
        output::opt(s.index)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
