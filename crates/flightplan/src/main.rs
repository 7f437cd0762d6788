//! `fplan` - CLI for flightplan
//!
//! This binary files, lists, amends and withdraws flight plans in the
//! configured document store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use flightplan::cli::{
    format_duration, read_plan, summary_line, Cli, Command, ConfigCommand, OutputFormat,
};
use flightplan::{init_logging, store, Config, DocumentStore, FlightPlanAdapter};

type Adapter = FlightPlanAdapter<dyn DocumentStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(&config, config_cmd),
        command => command,
    };

    // One store handle for the whole run, shared by the adapter
    let store: Arc<dyn DocumentStore> = store::open(&config).context("opening document store")?;
    let adapter = FlightPlanAdapter::new(
        store,
        config.storage.collection.clone(),
        config.filing.clone(),
    );

    run(&adapter, &config, command).await
}

/// Dispatch a store-backed command.
async fn run(adapter: &Adapter, config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List(args) => handle_list(adapter, args.format).await,
        Command::Get(cmd) => handle_get(adapter, &cmd.flight_plan_id, cmd.format).await,
        Command::File(cmd) => {
            let plan = read_plan(&cmd.input)
                .with_context(|| format!("reading flight plan from {}", cmd.input.display()))?;
            let outcome = adapter.file(&plan).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            exit_unless(outcome.result.is_success());
            Ok(())
        }
        Command::Update(cmd) => {
            let plan = read_plan(&cmd.input)
                .with_context(|| format!("reading flight plan from {}", cmd.input.display()))?;
            let result = adapter.update(&cmd.flight_plan_id, &plan).await;
            println!("{result}");
            exit_unless(result.is_success());
            Ok(())
        }
        Command::Delete(args) => {
            let deleted = adapter.delete_by_id(&args.flight_plan_id).await?;
            if deleted {
                println!("deleted {}", args.flight_plan_id);
            } else {
                println!("not_found");
            }
            exit_unless(deleted);
            Ok(())
        }
        Command::Departure(args) => {
            let airport = adapter.departure_airport(&args.flight_plan_id).await?;
            print_or_not_found(airport)
        }
        Command::Route(args) => {
            let route = adapter.route(&args.flight_plan_id).await?;
            print_or_not_found(route)
        }
        Command::Enroute(args) => {
            let ete = adapter.time_enroute(&args.flight_plan_id).await?;
            print_or_not_found(ete.map(format_duration))
        }
        Command::Status(cmd) => handle_status(adapter, config, cmd.json).await,
        Command::Config(config_cmd) => handle_config(config, config_cmd),
    }
}

/// Exit with status 1 when an operation was not applied.
fn exit_unless(applied: bool) {
    if !applied {
        std::process::exit(1);
    }
}

fn print_or_not_found(value: Option<String>) -> anyhow::Result<()> {
    match value {
        Some(value) => println!("{value}"),
        None => {
            println!("not_found");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn handle_list(adapter: &Adapter, format: OutputFormat) -> anyhow::Result<()> {
    let plans = adapter.list_all().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plans)?),
        OutputFormat::Plain => {
            if plans.is_empty() {
                println!("No flight plans filed.");
            }
            for plan in &plans {
                println!("{}", summary_line(plan));
            }
        }
    }
    Ok(())
}

async fn handle_get(
    adapter: &Adapter,
    flight_plan_id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let Some(plan) = adapter.get_by_id(flight_plan_id).await? else {
        println!("not_found");
        std::process::exit(1);
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Plain => println!("{}", summary_line(&plan)),
    }
    Ok(())
}

async fn handle_status(adapter: &Adapter, config: &Config, json: bool) -> anyhow::Result<()> {
    let count = adapter.store().count(adapter.collection()).await?;
    if json {
        let status = serde_json::json!({
            "backend": adapter.store().backend_name(),
            "database_path": config.database_path(),
            "collection": adapter.collection(),
            "flight_plans": count,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fplan status");
        println!("------------");
        println!("Backend:       {}", adapter.store().backend_name());
        println!("Database:      {}", config.database_path().display());
        println!("Collection:    {}", adapter.collection());
        println!("Flight plans:  {count}");
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Database name:      {}", config.storage.database_name);
                println!("  Collection:         {}", config.storage.collection);
                println!();
                println!("[Filing]");
                println!(
                    "  Reject inverted:    {}",
                    config.filing.reject_inverted_times
                );
                println!(
                    "  Airport codes:      {}",
                    config.filing.validate_airport_codes
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
