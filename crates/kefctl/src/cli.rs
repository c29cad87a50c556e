//! Clap derive structures for the `kefctl` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kefctl -- control a KEF wireless speaker over its HTTP API
#[derive(Debug, Parser)]
#[command(
    name = "kefctl",
    version,
    about = "Control KEF wireless speakers from the command line",
    long_about = "Reads and changes volume, mute and input of a KEF LSX II,\n\
        LS50 Wireless II or LS60 over the speaker's local HTTP API.",
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
    /// Speaker profile to use
    #[arg(long, short = 'p', env = "KEF_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Speaker address: IP, host:port or URL (overrides profile)
    #[arg(long, short = 'a', env = "KEF_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Output format [default: `defaults.output` from the config file]
    #[arg(long, short = 'o', env = "KEF_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

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
    #[arg(long, env = "KEF_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    /// The output format after config defaults have been applied.
    pub fn output_format(&self) -> OutputFormat {
        self.output.unwrap_or_default()
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the speaker's identity and playback state
    #[command(alias = "st")]
    Status,

    /// Toggle mute (powers the speaker on first)
    Mute,

    /// Change volume by a relative amount, e.g. `5` or `-10`
    #[command(alias = "vol")]
    Volume(VolumeArgs),

    /// Switch the speaker to USB input if it is in standby
    On,

    /// Stream state changes until interrupted
    Watch,

    /// Manage speaker profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct VolumeArgs {
    /// Amount to add to the current volume (0-100 scale)
    #[arg(allow_hyphen_values = true)]
    pub delta: i32,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Add or replace a speaker profile
    Init(ConfigInitArgs),

    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Speaker address: IP, host:port or URL
    #[arg(long = "speaker", value_name = "ADDRESS")]
    pub speaker: String,

    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Request timeout in seconds for this profile
    #[arg(long = "profile-timeout", value_name = "SECS")]
    pub profile_timeout: Option<u64>,

    /// Make this the default profile
    #[arg(long)]
    pub set_default: bool,

    /// Replace an existing profile with the same name
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
