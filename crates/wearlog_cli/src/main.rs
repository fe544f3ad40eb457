//! WearLog command-line entry point.
//!
//! # Responsibility
//! - Drive the wardrobe use-cases against a local SQLite file.
//! - Resolve defaults from `WEARLOG_*` variables; flags take precedence.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;
use wearlog_core::db::open_db;
use wearlog_core::{
    init_logging, CoreConfig, DayBoundaryZone, DerivedState, GarmentSummary, Identity,
    LedgerEngine, LedgerPhase, NewGarment, SqliteEventStore, SqliteGarmentRepository,
    WardrobeService,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wearlog: track how often garments are worn between washes",
    long_about = None
)]
struct Cli {
    /// SQLite file to use (default: `WEARLOG_DB_PATH` or the temp dir).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Day boundary zone: `local`, `utc` or an IANA name.
    #[arg(long, global = true)]
    zone: Option<DayBoundaryZone>,

    /// Acting user id; omitted means signed out.
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a garment.
    Add(AddArgs),
    /// List garments with wear counts and today's eligibility.
    List,
    /// Show one garment.
    Status(GarmentArgs),
    /// Log that a garment was worn.
    Wear(LogArgs),
    /// Log that a garment was washed.
    Wash(LogArgs),
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Display name.
    #[arg(long)]
    name: String,

    /// Image reference in the content store.
    #[arg(long)]
    image: String,

    /// Optional size label.
    #[arg(long)]
    size: Option<String>,
}

#[derive(Args, Debug)]
struct GarmentArgs {
    /// Garment id.
    id: Uuid,
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Garment id.
    id: Uuid,

    /// Event time as RFC 3339 (default: now).
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())
            .context("failed to start logging")?;
    }
    run(&cli, &config)
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = CoreConfig::from_env().context("invalid WEARLOG_* environment")?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(zone) = cli.zone {
        config.day_zone = zone;
    }
    Ok(config)
}

fn run(cli: &Cli, config: &CoreConfig) -> Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let wardrobe = WardrobeService::new(
        SqliteGarmentRepository::try_new(&conn)?,
        LedgerEngine::new(SqliteEventStore::try_new(&conn)?, config.day_zone),
    );
    let identity = Identity::from_raw(cli.owner.as_deref());
    let now = Utc::now();

    match &cli.command {
        Commands::Add(args) => {
            let garment = wardrobe.add_garment(
                &identity,
                NewGarment {
                    name: args.name.clone(),
                    image_ref: args.image.clone(),
                    size: args.size.clone(),
                },
                now,
            )?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&garment)?);
            } else {
                println!("Added {} ({})", garment.name, garment.id);
            }
        }
        Commands::List => {
            let summaries = wardrobe.list_wardrobe(&identity, now)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No garments.");
            } else {
                for summary in &summaries {
                    println!("{}", render_summary(summary, config.day_zone));
                }
            }
        }
        Commands::Status(args) => {
            let summary = wardrobe.garment_status(&identity, args.id, now)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", render_summary(&summary, config.day_zone));
            }
        }
        Commands::Wear(args) => {
            let state = wardrobe.log_wear(&identity, args.id, args.at.unwrap_or(now))?;
            print_state(cli.json, "Wear logged.", &state, config.day_zone)?;
        }
        Commands::Wash(args) => {
            let state = wardrobe.log_wash(&identity, args.id, args.at.unwrap_or(now))?;
            print_state(cli.json, "Wash logged.", &state, config.day_zone)?;
        }
    }
    Ok(())
}

fn print_state(
    json: bool,
    headline: &str,
    state: &DerivedState,
    zone: DayBoundaryZone,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        println!("{headline} {}", describe_state(state, zone));
    }
    Ok(())
}

fn render_summary(summary: &GarmentSummary, zone: DayBoundaryZone) -> String {
    let size = summary
        .garment
        .size
        .as_deref()
        .map(|size| format!(" [{size}]"))
        .unwrap_or_default();
    format!(
        "{}  {}{}  {}  today({}): wear={} wash={}",
        summary.garment.id,
        summary.garment.name,
        size,
        describe_state(&summary.state, zone),
        summary.today.date,
        yes_no(summary.today.can_wear),
        yes_no(summary.today.can_wash),
    )
}

fn describe_state(state: &DerivedState, zone: DayBoundaryZone) -> String {
    match state.phase() {
        LedgerPhase::NoHistory => "never worn".to_string(),
        LedgerPhase::NeverWashed(wears) => format!("worn {wears}x, never washed"),
        LedgerPhase::SinceWash(wears) => {
            let washed = state
                .last_wash_at
                .map(|at| zone.date_of(at).to_string())
                .unwrap_or_default();
            format!("worn {wears}x since wash on {washed}")
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
