//! Discover command handler.

use std::time::Duration;

use tabled::Tabled;
use zowie_api::{DeviceDescriptor, DiscoveryService};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Work mode")]
    workmode: String,
}

impl From<&DeviceDescriptor> for DeviceRow {
    fn from(d: &DeviceDescriptor) -> Self {
        Self {
            serial: d.serial.clone(),
            name: d.name.clone(),
            address: d.base_url(),
            product: output::opt(d.product_id),
            workmode: output::opt(d.workmode_id),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &DiscoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let service = DiscoveryService::new("zowie");
    let mut found = service.discover(Duration::from_secs(args.wait)).await?;
    found.sort_by(|a, b| a.serial.cmp(&b.serial));

    if found.is_empty() && !global.quiet {
        eprintln!("No devices answered within {}s", args.wait);
    }

    let out = output::render_list(&global.output, &found, |d| DeviceRow::from(d), |d| {
        d.serial.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
