//! Clap derive structures for the `smartcocoon` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// smartcocoon -- control SmartCocoon smart fans from the command line
#[derive(Debug, Parser)]
#[command(
    name = "smartcocoon",
    version,
    about = "Monitor and control SmartCocoon smart fans",
    long_about = "Monitor and control SmartCocoon smart vent fans through the\n\
        SmartCocoon cloud service.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "SMARTCOCOON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SMARTCOCOON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive setup: log in, pick systems and fans, save a profile
    Setup,

    /// Log in again and store fresh session tokens
    Login,

    /// List systems (locations) on the account
    #[command(alias = "sys")]
    Systems(SystemsArgs),

    /// Inspect and control fans
    #[command(alias = "f")]
    Fans(FansArgs),

    /// Poll periodically and print fan state as it changes
    Watch(WatchArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Systems ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SystemsArgs {
    #[command(subcommand)]
    pub command: SystemsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemsCommand {
    /// List systems with their room and fan counts
    #[command(alias = "ls")]
    List,
}

// ── Fans ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FansArgs {
    #[command(subcommand)]
    pub command: FansCommand,
}

#[derive(Debug, Subcommand)]
pub enum FansCommand {
    /// List fans
    #[command(alias = "ls")]
    List(FanListArgs),

    /// Show one fan in detail
    Show(FanTarget),

    /// Change mode, power or speed
    Set(FanSetArgs),

    /// Switch a fan on
    On(FanOnArgs),

    /// Switch a fan off
    Off(FanTarget),

    /// Put a fan in auto mode
    Auto(FanTarget),

    /// Put a fan in eco mode
    Eco(FanTarget),
}

#[derive(Debug, Args)]
pub struct FanListArgs {
    /// Include fans that are not selected in the profile
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// A fan addressed by numeric id or vendor fan id.
#[derive(Debug, Args)]
pub struct FanTarget {
    /// Fan id (numeric) or vendor fan id
    pub fan: String,
}

#[derive(Debug, Args)]
pub struct FanSetArgs {
    #[command(flatten)]
    pub target: FanTarget,

    /// Mode: auto, eco, always_on, always_off
    #[arg(long, short = 'm')]
    pub mode: Option<String>,

    /// Power in percent (0-100)
    #[arg(long)]
    pub power: Option<String>,

    /// Speed bucket, e.g. 50_pct
    #[arg(long, short = 's')]
    pub speed: Option<String>,
}

#[derive(Debug, Args)]
pub struct FanOnArgs {
    #[command(flatten)]
    pub target: FanTarget,

    /// Mode to switch on in (default: always_on)
    #[arg(long, short = 'm', value_parser = ["auto", "eco", "always_on", "always_off"])]
    pub mode: Option<String>,

    /// Power in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub power: Option<u8>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many refreshes
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
