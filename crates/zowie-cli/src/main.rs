mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zowie_core::Device;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Neither needs a configured device
        Command::Config(ref args) => commands::config_cmd::handle(args, &cli.global),
        Command::Discover(ref args) => commands::discover::handle(args, &cli.global).await,

        cmd => {
            let file = zowie_config::load_config_or_default();
            let device_config = config::resolve_device(&cli.global, &file)?;
            let device = Device::new(device_config)?;

            tracing::debug!(command = ?cmd, url = %device.config().url, "dispatching command");
            commands::dispatch(cmd, &device, &cli.global).await
        }
    }
}
