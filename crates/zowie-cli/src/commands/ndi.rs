//! NDI settings: show, and read-merge-write changes.

use zowie_api::models::NdiConfig;
use zowie_core::{Device, NdiChange};

use crate::cli::{GlobalOpts, NdiArgs, NdiCommand};
use crate::error::CliError;
use crate::output;

fn detail(config: &NdiConfig) -> String {
    output::detail_lines(&[
        (
            "Enabled",
            if config.is_enabled() { "yes" } else { "no" }.to_owned(),
        ),
        ("Machine name", output::opt(config.machinename.as_deref())),
        ("Groups", output::opt(config.groups.as_deref())),
        ("Mode", output::opt(config.mode_id)),
    ])
}

pub async fn handle(device: &Device, args: NdiArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = match args.command {
        NdiCommand::Show => device.client().ndi_config().await?,
        NdiCommand::Set {
            enable,
            disable,
            name,
            groups,
            mode,
        } => {
            let change = NdiChange {
                enabled: match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                machine_name: name,
                groups,
                mode_id: mode,
            };
            if change.is_empty() && !global.quiet {
                eprintln!("Nothing to change; showing current settings");
            }
            device.configure_ndi(&change).await?
        }
    };

    let out = output::render_single(&global.output, &config, detail, |c| {
        output::opt(c.machinename.as_deref())
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
