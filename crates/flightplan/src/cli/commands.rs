//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Arguments naming a single flight plan.
#[derive(Debug, Args)]
pub struct PlanIdArgs {
    /// Flight plan identifier
    pub flight_plan_id: String,
}

/// Arguments for commands that print flight plans.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

/// Get command arguments.
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Flight plan identifier
    pub flight_plan_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

/// File command arguments.
#[derive(Debug, Args)]
pub struct FileCommand {
    /// JSON file holding the flight plan (`-` reads stdin)
    pub input: PathBuf,
}

/// Update command arguments.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Identifier of the plan to amend
    pub flight_plan_id: String,

    /// JSON file holding the amended flight plan (`-` reads stdin)
    pub input: PathBuf,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// One summary line per plan
    Plain,
}
