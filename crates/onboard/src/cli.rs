//! Clap derive structures for the `onboard` CLI.
//!
//! Every command works offline against declaration and state files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// onboard -- reconcile appliance onboarding declarations
#[derive(Debug, Parser)]
#[command(
    name = "onboard",
    version,
    about = "Normalize and diff appliance onboarding declarations",
    long_about = "Resolve a declarative onboarding document against recorded device state.\n\n\
        Shows the effective configuration, the change set, and the order the\n\
        appliers would run in, without touching a device.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "ONBOARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ONBOARD_OUTPUT",
        default_value = "json",
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
    /// One line per item
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the effective configuration a declaration resolves to
    Normalize(StateArgs),

    /// Print the change set between the device and a declaration
    Diff(StateArgs),

    /// Print the applier order and what each applier would receive
    Plan(StateArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

/// Declaration plus recorded device state.
///
/// When only one of `--current` and `--original` is given it stands in
/// for both; with neither the device is treated as empty.
#[derive(Debug, Args)]
pub struct StateArgs {
    /// Declaration JSON file
    #[arg(long, short = 'd')]
    pub declaration: PathBuf,

    /// Current device config (JSON, tenant → class → body)
    #[arg(long)]
    pub current: Option<PathBuf>,

    /// Device config captured before the first declaration was applied
    #[arg(long)]
    pub original: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the resolved configuration (secrets redacted)
    Show,
}
