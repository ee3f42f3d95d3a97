//! Clap derive structures for the `panelwatch` CLI.
//!
//! Also compiled by `build.rs` for man pages, so this file must only
//! depend on clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// panelwatch -- expiry and quota watcher for X-UI panels
#[derive(Debug, Parser)]
#[command(
    name = "panelwatch",
    version,
    about = "Watch X-UI panels and notify viewers about expiring clients",
    long_about = "Polls every configured X-UI panel, classifies each client as\n\
        online, expiring or expired, and notifies each viewer when one of\n\
        their clients newly enters the expiring or expired state.",
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
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "PANELWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PANELWATCH_OUTPUT",
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

    /// Log line format
    #[arg(long, env = "PANELWATCH_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,
}

// ── Output, Color & Log Enums ────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Online,
    Expiring,
    Expired,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler (interval checks + daily report) until Ctrl-C
    Run,

    /// Run one check cycle and print the resulting events
    Check(CheckArgs),

    /// Show the per-panel report for a viewer (does not touch stored state)
    Report(ReportArgs),

    /// List client ids of one status, per panel
    #[command(alias = "ls")]
    Lists(ListsArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Cycle commands ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Only check this viewer (default: every configured viewer)
    #[arg(long)]
    pub viewer: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Viewer whose scope to report
    #[arg(long)]
    pub viewer: String,

    /// Only this panel (also shown when it has no users)
    #[arg(long)]
    pub panel: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListsArgs {
    /// Viewer whose scope to list
    #[arg(long)]
    pub viewer: String,

    /// Which list to print
    #[arg(long, short = 's')]
    pub status: StatusArg,

    /// Only this panel
    #[arg(long)]
    pub panel: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
