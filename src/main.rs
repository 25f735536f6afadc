use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_sync::calculate::{PercentileMap, StatCollection};
use roster_sync::config::AppConfig;
use roster_sync::fetch::{Fetcher, NbaStatsProvider, StatsProvider};
use roster_sync::models::{StatField, TeamCode};
use roster_sync::storage::{self, StorageConfig};
use roster_sync::store::Slot;
use roster_sync::sync::{SyncConfig, SyncOrchestrator, SyncReport};

#[derive(Parser)]
#[command(name = "roster-sync")]
#[command(about = "NBA roster tables with minutes-weighted percentile coloring")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create empty team tables and the master table
    Init {
        /// Overwrite existing tables
        #[arg(long)]
        force: bool,
    },

    /// Run a full cycle: rosters, free agents, colors
    Sync {
        /// Only update these teams' rosters (repeatable)
        #[arg(long = "team")]
        teams: Vec<String>,

        /// Skip the pauses between teams
        #[arg(long)]
        no_delay: bool,
    },

    /// Recompute percentiles and colors from the stored tables
    Recolor {
        /// Skip the pauses between teams
        #[arg(long)]
        no_delay: bool,
    },

    /// Print a team table with league percentiles
    Show {
        /// Team code, e.g. BOS
        #[arg(long)]
        team: String,
    },

    /// List master rows marked free agent
    FreeAgents,
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let mut config = load_config(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting roster-sync v{}", env!("CARGO_PKG_VERSION"));
    if !config_found {
        tracing::warn!("No config at {}, using defaults", cli.config.display());
    }

    let storage = config.storage();

    match cli.command {
        Commands::Init { force } => {
            let store = storage::init_store(
                &storage,
                &config.team_codes(),
                config.league.team_capacity,
                config.league.master_capacity,
                force,
            )?;
            println!(
                "Initialized {} teams x {} slots and {} master rows in {}",
                store.teams().count(),
                config.league.team_capacity,
                store.master().len(),
                storage.data_dir.display()
            );
        }

        Commands::Sync { teams, no_delay } => {
            let mut sync_config = SyncConfig::from_app_config(&config)?;
            if no_delay {
                sync_config = sync_config.without_delays();
            }
            if !teams.is_empty() {
                sync_config.only_teams = Some(teams.iter().map(TeamCode::new).collect());
            }

            let orchestrator = SyncOrchestrator::new(sync_config, build_provider(&config)?);
            let report = orchestrator.sync_once().await?;
            print_report(&report);
        }

        Commands::Recolor { no_delay } => {
            let mut sync_config = SyncConfig::from_app_config(&config)?;
            if no_delay {
                sync_config = sync_config.without_delays();
            }

            let orchestrator = SyncOrchestrator::new(sync_config, build_provider(&config)?);
            let colors = orchestrator.recolor().await?;
            println!("\n=== Recolor Results ===");
            println!("Players ranked:   {}", colors.players_ranked);
            println!("Fields ranked:    {}/{}", colors.fields_ranked, StatField::ALL.len());
            println!("Master rows:      {}", colors.master_rows_colored);
        }

        Commands::Show { team } => {
            show_team(&config, &storage, &TeamCode::new(&team))?;
        }

        Commands::FreeAgents => {
            let store =
                storage::load_store(&storage, &config.team_codes(), config.league.team_capacity)?;
            let free: Vec<_> = store.master().free_agents().collect();
            println!("\n=== Free Agents ({}) ===", free.len());
            for (row, entry) in free {
                println!(
                    "{:>4}  {:<28} {:>6}  {}",
                    row,
                    entry.record.name,
                    entry.record.id.as_str(),
                    entry.record.position
                );
            }
        }
    }

    Ok(())
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn StatsProvider>> {
    let fetcher = Fetcher::new(config.fetcher_config())?;
    Ok(Arc::new(NbaStatsProvider::new(
        fetcher,
        config.source_urls()?,
        config.league.season.clone(),
    )))
}

fn print_report(report: &SyncReport) {
    println!("\n=== Sync Results ===");
    for team in &report.teams {
        println!(
            "{:<4} +{} ={} -{} ({} without stats)",
            team.team.as_str(),
            team.added,
            team.retained,
            team.removed,
            team.without_stats
        );
    }
    println!("Free agents:      {}", report.free_agents_promoted);
    if let Some(colors) = &report.colors {
        println!("Players ranked:   {}", colors.players_ranked);
        println!("Fields ranked:    {}/{}", colors.fields_ranked, StatField::ALL.len());
    }
    if let (Some(start), Some(end)) = (report.started_at, report.completed_at) {
        println!("Duration:         {}s", (end - start).num_seconds());
    }
}

fn show_team(config: &AppConfig, storage: &StorageConfig, team: &TeamCode) -> Result<()> {
    let store = storage::load_store(storage, &config.team_codes(), config.league.team_capacity)?;
    let Ok(table) = store.team(team) else {
        bail!("Team {} is not part of the configured league", team);
    };
    let map = PercentileMap::compute(&StatCollection::gather(store.teams()));
    let ranked: Vec<_> = map.team_rows(team).collect();

    print!("{:>4}  {:<24}", "#", "Player");
    for field in StatField::ALL {
        print!(" {:>6}", field.label());
    }
    println!();

    for (index, slot) in table.slots().iter().enumerate() {
        match slot {
            Slot::Empty { hardship } => {
                let label = if *hardship { "(hardship)" } else { "-" };
                println!("{:>4}  {:<24}", index, label);
            }
            Slot::Occupied(record) => {
                print!("{:>4}  {:<24}", index, record.name);
                let row = ranked.iter().find(|r| r.slot.slot == index);
                for field in StatField::ALL {
                    match row.and_then(|r| r.display_percentile(field)) {
                        Some(p) => print!(" {:>6.1}", p),
                        None => print!(" {:>6}", "?"),
                    }
                }
                println!();
            }
        }
    }
    Ok(())
}
