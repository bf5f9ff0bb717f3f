//! shiftboard - operator tool for the monthly shift roster
//!
//! Reads and writes the same data root a web front end would use:
//! - `show`: month view (schedule, roster, shift table) as JSON
//! - `save`: decode submitted form fields and merge them into a month
//! - `employees`: print or replace a store's roster
//! - `migrate`: rewrite a legacy month file in canonical shape

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shiftboard_common::config::{resolve_root_folder, ShiftboardConfig};
use shiftboard_common::roster::RosterInput;
use shiftboard_common::service::ScheduleService;
use shiftboard_common::store::SaveOutcome;
use shiftboard_common::{Period, StoreId};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "shiftboard")]
#[command(version)]
#[command(about = "Monthly shift roster storage tool", long_about = None)]
struct Cli {
    /// Data root (overrides SHIFTBOARD_ROOT and the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (default: <config dir>/shiftboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the month view as JSON
    Show {
        #[arg(long)]
        store: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Save submitted form fields into a month
    Save {
        #[arg(long)]
        store: String,

        /// JSON object of form fields, `-` for stdin
        #[arg(long)]
        fields: Option<PathBuf>,

        /// Extra field as key=value, may repeat
        #[arg(long = "field", value_parser = parse_key_val)]
        field: Vec<(String, String)>,
    },
    /// Print the employee roster, or replace it with --set
    Employees {
        #[arg(long)]
        store: String,

        /// New roster, names separated by commas or newlines
        #[arg(long)]
        set: Option<String>,
    },
    /// Rewrite a month file in canonical shape
    Migrate {
        #[arg(long)]
        store: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ShiftboardConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging.level);

    info!("Starting shiftboard v{}", env!("CARGO_PKG_VERSION"));

    let root = resolve_root_folder(cli.root.as_deref(), &config);
    info!("Data root: {}", root.display());

    let service = ScheduleService::from_config(&root, &config)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Show { store, year, month } => {
            let store = StoreId::new(store)?;
            let period = Period::new(
                year.unwrap_or_else(|| today.year()),
                month.unwrap_or_else(|| today.month()),
            )?;
            print_json(&service.month_view(&store, period))?;
        }
        Commands::Save {
            store,
            fields,
            field,
        } => {
            let store = StoreId::new(store)?;
            let mut submitted = match fields {
                Some(path) => load_fields(&path)?,
                None => HashMap::new(),
            };
            submitted.extend(field);
            save(&service, &store, &submitted, today)?;
        }
        Commands::Employees { store, set } => {
            let store = StoreId::new(store)?;
            let names = match set {
                Some(text) => service.update_roster(&store, RosterInput::Text(text), true)?,
                None => service.roster().read(&store),
            };
            print_json(&names)?;
        }
        Commands::Migrate { store, year, month } => {
            let store = StoreId::new(store)?;
            let period = Period::new(year, month)?;
            let outcome = service.store().migrate(&store, period)?;
            report(period, &outcome);
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn save(
    service: &ScheduleService,
    store: &StoreId,
    fields: &HashMap<String, String>,
    today: NaiveDate,
) -> Result<()> {
    // The operator has direct access to the data root, so writes are allowed
    let (period, outcome) = service
        .save_submission(store, fields, true, today)
        .with_context(|| format!("Failed to save schedule for store {}", store))?;
    report(period, &outcome);
    Ok(())
}

fn report(period: Period, outcome: &SaveOutcome) {
    match outcome {
        SaveOutcome::Saved {
            updated_entries,
            total_days,
            backup,
        } => {
            println!(
                "Saved {}: {} entries updated, {} days scheduled",
                period, updated_entries, total_days
            );
            if let Some(backup) = backup {
                println!("Previous version kept at {}", backup.display());
            }
        }
        SaveOutcome::NothingToSave => {
            println!("Nothing to save for {}: no schedule fields recognised", period);
        }
    }
}

/// Read a JSON object of form fields from a file or stdin
fn load_fields(path: &Path) -> Result<HashMap<String, String>> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fields file {}", path.display()))?
    };

    let parsed = serde_json::from_str::<Value>(&text).context("Fields must be JSON")?;
    let Value::Object(map) = parsed else {
        bail!("Fields must be a JSON object of name/value pairs");
    };

    Ok(map
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    Ok((key.to_string(), value.to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
