//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod discover;
pub mod ndi;
pub mod playback;
pub mod sources;
pub mod status;
pub mod watch;

use zowie_core::Device;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(device, global).await,
        Command::Watch => watch::handle(device, global).await,
        Command::Sources => sources::handle(device, global).await,
        Command::Play(args) => playback::play(device, &args, global).await,
        Command::Stop => playback::stop(device, global).await,
        Command::Standby => playback::standby(device, global).await,
        Command::Wake => playback::wake(device, global).await,
        Command::Ndi(args) => ndi::handle(device, args, global).await,
        // Handled before a device is built
        Command::Discover(_) | Command::Config(_) => Ok(()),
    }
}
