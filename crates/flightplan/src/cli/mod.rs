//! Command-line interface for flightplan.
//!
//! This module provides the CLI structure and the small formatting helpers
//! used by the `fplan` binary.

mod commands;

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Duration;
use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FileCommand, GetCommand, OutputFormat, PlanIdArgs, ShowArgs, StatusCommand,
    UpdateCommand,
};

use crate::error::Result;
use crate::plan::FlightPlan;

/// fplan - File and manage aviation flight plans
///
/// Stores flight plans in a local document store and reports the outcome of
/// every filing, amendment and withdrawal.
#[derive(Debug, Parser)]
#[command(name = "fplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every filed flight plan
    List(ShowArgs),

    /// Show one flight plan
    Get(GetCommand),

    /// File a new flight plan
    File(FileCommand),

    /// Amend an existing flight plan
    Update(UpdateCommand),

    /// Withdraw a flight plan
    Delete(PlanIdArgs),

    /// Show a plan's departure airport
    Departure(PlanIdArgs),

    /// Show a plan's route
    Route(PlanIdArgs),

    /// Show a plan's estimated time en route
    Enroute(PlanIdArgs),

    /// Show store status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// Read a flight plan from a JSON file, or from stdin when `input` is `-`.
///
/// # Errors
///
/// Returns an error if the input cannot be read or is not a valid plan.
pub fn read_plan(input: &Path) -> Result<FlightPlan> {
    let raw = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Format a duration as `1h30m`, with a leading `-` when negative.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_minutes();
    let sign = if total < 0 { "-" } else { "" };
    let minutes = total.abs();
    format!("{sign}{}h{:02}m", minutes / 60, minutes % 60)
}

/// One-line summary of a plan for plain output.
#[must_use]
pub fn summary_line(plan: &FlightPlan) -> String {
    format!(
        "{}  {:<8} {} -> {}  dep {}  ete {}",
        plan.flight_plan_id.as_deref().unwrap_or("-"),
        plan.aircraft_identification,
        plan.departure_airport,
        plan.arrival_airport,
        plan.departure_time.format("%Y-%m-%d %H:%MZ"),
        format_duration(plan.time_enroute()),
    )
}
