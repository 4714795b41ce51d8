//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use bulwark_core::RunMode;

/// Bulwark -- declarative Docker host compliance enforcer and auditor.
///
/// Use `bulwark <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "bulwark", version, about, long_about = None)]
pub struct Cli {
    /// Path to the bulwark.toml configuration file
    /// (default: /etc/bulwark/bulwark.toml, built-in defaults if absent).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Run mode: apply (default), check, dry-run.
    #[arg(short, long, global = true, default_value = "apply", value_parser = parse_mode)]
    pub mode: RunMode,

    /// Override the report file location (single-domain commands only).
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report stream.
    Text,
    /// Machine-readable JSON report.
    Json,
}

fn parse_mode(value: &str) -> Result<RunMode, bulwark_core::UsageError> {
    value.parse()
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host OS accounts, docker service override and host security.
    Host,

    /// Docker daemon configuration and running container audit.
    Daemon,

    /// Docker network topology and container network audit.
    Network,

    /// Server folder layout, ownership and permissions.
    Folders,

    /// Run host, daemon, network (and folders when configured) in sequence.
    All,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- config ----

/// Manage bulwark configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, host, daemon, network, folders).
        #[arg(long)]
        section: Option<String>,
    },
}
