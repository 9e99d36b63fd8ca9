//! Clap derive structures for the `zowie` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// zowie -- control ZowieBox encoders and decoders
#[derive(Debug, Parser)]
#[command(
    name = "zowie",
    version,
    about = "Discover, monitor and drive ZowieBox devices from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "ZOWIE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device address, e.g. 192.168.1.50 (overrides profile)
    #[arg(long, short = 'H', env = "ZOWIE_HOST", global = true)]
    pub host: Option<String>,

    /// Device username (overrides profile)
    #[arg(long, short = 'u', env = "ZOWIE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Device password
    #[arg(long, env = "ZOWIE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ZOWIE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ZOWIE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find devices on the local network
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Refresh once and show the device snapshot
    #[command(alias = "st")]
    Status,

    /// Follow availability and streaming changes until interrupted
    Watch,

    /// List decoder sources configured on the device
    Sources,

    /// Play a source on the decoder
    Play(PlayArgs),

    /// Stop decoder playback
    Stop,

    /// Put the device into standby
    Standby,

    /// Wake the device from standby
    Wake,

    /// Show or change NDI settings
    Ndi(NdiArgs),

    /// Inspect the configuration file
    Config(ConfigArgs),
}

// ── Discover ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Seconds to collect replies
    #[arg(long, short = 't', default_value = "3")]
    pub wait: u64,
}

// ── Play ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// Source: a URL (rtsp://, rtmp://, srt://, http(s)://), a camera
    /// entity (camera.<id>), a configured source (#<index>), or a peer
    /// device (peer:<serial>)
    pub source: String,

    /// Seconds to search for peers before playing a peer:<serial> source
    #[arg(long, default_value = "3")]
    pub discover_wait: u64,
}

// ── NDI ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NdiArgs {
    #[command(subcommand)]
    pub command: NdiCommand,
}

#[derive(Debug, Subcommand)]
pub enum NdiCommand {
    /// Show current NDI settings
    Show,

    /// Change NDI settings; unspecified fields keep their device values
    Set {
        /// Enable NDI output
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable NDI output
        #[arg(long)]
        disable: bool,

        /// NDI machine name
        #[arg(long)]
        name: Option<String>,

        /// Comma-separated NDI groups
        #[arg(long)]
        groups: Option<String>,

        /// NDI mode id
        #[arg(long)]
        mode: Option<i64>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (passwords redacted)
    Show,

    /// Print the configuration file path
    Path,

    /// List configured profiles
    Profiles,
}
