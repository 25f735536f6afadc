//! Sync orchestrator.
//!
//! One cycle runs two passes over the league:
//! 1. Rosters: fetch each team, reconcile it into its table, persist the team
//!    and master tables, then mark everyone who was dropped as a free agent
//! 2. Colors: rank every stat field league-wide and persist cell colors for
//!    every team table and the master table
//!
//! Teams are handled one at a time with a fixed pause between them. The first
//! failure aborts the rest of the cycle; teams already written stay written.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::calculate::{team_colors, Gradient, PercentileMap, StatCollection};
use crate::config::{AppConfig, ConfigError};
use crate::fetch::StatsProvider;
use crate::models::{RosterEntry, StatLine, TeamCode};
use crate::reconcile::{promote_free_agents, reconcile, FreeAgentPool, ReconcileOptions};
use crate::storage::{self, StorageConfig};
use crate::store::{SlotLookup, StatStore};

/// Errors that can occur during sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] crate::reconcile::ReconcileError),

    #[error("Team {0} is not part of the configured league")]
    UnknownTeam(TeamCode),
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Every team in the league, in processing order
    pub teams: Vec<TeamCode>,

    /// Restrict the roster pass to these teams (None = all)
    pub only_teams: Option<Vec<TeamCode>>,

    pub team_capacity: usize,
    pub hardship_window: usize,
    pub season: String,

    /// Pause between teams in the roster pass
    pub team_delay: Duration,

    /// Pause between teams in the color pass
    pub color_delay: Duration,

    pub gradient: Gradient,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl SyncConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            teams: config.team_codes(),
            only_teams: None,
            team_capacity: config.league.team_capacity,
            hardship_window: config.league.hardship_window,
            season: config.league.season.clone(),
            team_delay: config.team_delay()?,
            color_delay: config.color_delay()?,
            gradient: config.gradient()?,
            storage: config.storage(),
        })
    }

    /// Drop both inter-team pauses.
    pub fn without_delays(mut self) -> Self {
        self.team_delay = Duration::ZERO;
        self.color_delay = Duration::ZERO;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Roster pass outcome for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamReport {
    pub team: TeamCode,
    pub added: usize,
    pub retained: usize,
    pub removed: usize,
    /// Players on the roster without stats for the season
    pub without_stats: usize,
}

/// Color pass outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorReport {
    pub players_ranked: usize,
    /// Fields that had a usable ranking
    pub fields_ranked: usize,
    pub teams_colored: usize,
    pub master_rows_colored: usize,
}

/// Report of one cycle, persisted as `state/last_sync.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub teams: Vec<TeamReport>,
    pub free_agents_promoted: usize,
    pub colors: Option<ColorReport>,
    pub errors: Vec<String>,
}

/// Sync orchestrator.
pub struct SyncOrchestrator {
    config: SyncConfig,
    provider: Arc<dyn StatsProvider>,
}

impl SyncOrchestrator {
    /// Create a new sync orchestrator.
    pub fn new(config: SyncConfig, provider: Arc<dyn StatsProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run a full cycle: roster pass, free agents, color pass.
    pub async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport {
            started_at: Some(Utc::now()),
            status: SyncStatus::Running,
            ..SyncReport::default()
        };
        info!("Starting sync using {} provider", self.provider.name());

        let result = self.run_cycle(&mut report).await;
        report.completed_at = Some(Utc::now());
        match &result {
            Ok(()) => report.status = SyncStatus::Completed,
            Err(e) => {
                error!("Sync aborted: {}", e);
                report.status = SyncStatus::Failed;
                report.errors.push(e.to_string());
            }
        }

        if let Err(e) = self.save_report(&report) {
            warn!("Could not write sync report: {}", e);
        }
        result.map(|()| report)
    }

    /// Color pass only, from the stored tables.
    pub async fn recolor(&self) -> Result<ColorReport, SyncError> {
        let mut store = self.load()?;
        self.colorize(&mut store).await
    }

    async fn run_cycle(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let mut store = self.load()?;
        let teams = self.roster_teams()?;
        let as_of = Utc::now().date_naive();
        let mut pool = FreeAgentPool::new();

        for (i, team) in teams.iter().enumerate() {
            if i > 0 {
                self.pause(self.config.team_delay).await;
            }
            let team_report = self.sync_team(&mut store, team, as_of, &mut pool).await?;
            report.teams.push(team_report);
        }

        if !pool.is_empty() {
            info!("Moving {} released players to free agency", pool.len());
        }
        report.free_agents_promoted = promote_free_agents(&mut store, &pool)?;
        storage::save_master(&self.config.storage, store.master())?;

        report.colors = Some(self.colorize(&mut store).await?);
        Ok(())
    }

    async fn sync_team(
        &self,
        store: &mut StatStore,
        team: &TeamCode,
        as_of: NaiveDate,
        pool: &mut FreeAgentPool,
    ) -> Result<TeamReport, SyncError> {
        let roster = self.fetch_team(team).await?;
        let without_stats = roster.iter().filter(|e| e.stats.is_none()).count();

        let options = ReconcileOptions {
            as_of,
            hardship_window: self.config.hardship_window,
        };
        let plan = reconcile(store.team(team)?, store.master(), &roster, &options)?;
        plan.apply(store)?;

        storage::save_team(&self.config.storage, store.team(team)?)?;
        storage::save_master(&self.config.storage, store.master())?;
        storage::save_team_formatting(&self.config.storage, store, team)?;
        pool.absorb(&plan);

        info!("{} table updated", team);
        Ok(TeamReport {
            team: team.clone(),
            added: plan.added_count(),
            retained: plan.retained_count(),
            removed: plan.removed_count(),
            without_stats,
        })
    }

    /// Roster plus stats for every player on it.
    async fn fetch_team(&self, team: &TeamCode) -> Result<Vec<RosterEntry>, SyncError> {
        let players = self.provider.fetch_roster(team).await?;
        info!("Fetched {} roster: {} players", team, players.len());

        let mut entries = Vec::with_capacity(players.len());
        for player in players {
            let bundle = self
                .provider
                .fetch_stat_bundle(&player.id, &self.config.season)
                .await?;
            let stats = match bundle {
                Some(bundle) => {
                    let rating = self.provider.fetch_external_rating(&player.id).await?;
                    Some(StatLine::from_bundle(&bundle, rating.as_ref()))
                }
                None => {
                    debug!("No {} stats for {}", self.config.season, player.name);
                    None
                }
            };
            entries.push(RosterEntry { player, stats });
        }
        Ok(entries)
    }

    /// Rank the league and persist colors for every team and the master table.
    async fn colorize(&self, store: &mut StatStore) -> Result<ColorReport, SyncError> {
        let collection = StatCollection::gather(store.teams());
        let map = PercentileMap::compute(&collection);
        let gradient = &self.config.gradient;

        let mut by_team = team_colors(&map, gradient);
        let teams: Vec<TeamCode> = store.teams().map(|t| t.team.clone()).collect();
        for (i, team) in teams.iter().enumerate() {
            if i > 0 {
                self.pause(self.config.color_delay).await;
            }
            store.set_team_colors(team, by_team.remove(team).unwrap_or_default());
            storage::save_team_formatting(&self.config.storage, store, team)?;
            info!("Colors applied to {} table", team);
        }

        let mut master_colors = BTreeMap::new();
        for row in map.rows() {
            match store.master().find(&row.slot.player) {
                SlotLookup::Found(index) => {
                    master_colors.insert(index, row.colors(gradient));
                }
                SlotLookup::NotFound => {
                    warn!("Player {} has no master row", row.slot.player);
                }
            }
        }
        let master_rows_colored = master_colors.len();
        store.set_master_colors(master_colors);
        storage::save_master_formatting(&self.config.storage, store)?;
        info!("Colors applied to master table");

        Ok(ColorReport {
            players_ranked: map.len(),
            fields_ranked: map.ranked_fields(),
            teams_colored: teams.len(),
            master_rows_colored,
        })
    }

    fn load(&self) -> Result<StatStore, SyncError> {
        Ok(storage::load_store(
            &self.config.storage,
            &self.config.teams,
            self.config.team_capacity,
        )?)
    }

    fn roster_teams(&self) -> Result<Vec<TeamCode>, SyncError> {
        match &self.config.only_teams {
            None => Ok(self.config.teams.clone()),
            Some(only) => {
                for team in only {
                    if !self.config.teams.contains(team) {
                        return Err(SyncError::UnknownTeam(team.clone()));
                    }
                }
                Ok(only.clone())
            }
        }
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            debug!("Waiting {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn save_report(&self, report: &SyncReport) -> Result<(), SyncError> {
        storage::write_json(&self.config.storage.last_sync_path(), report)?;
        Ok(())
    }
}
