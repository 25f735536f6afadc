//! Roster reconciliation.
//!
//! Diffs a freshly fetched roster against a team's slots and produces a
//! [`ReconcilePlan`]:
//! - departed players are cleared and reported as removed
//! - new players take the oldest vacancy
//! - continuing players keep their slot and get refreshed
//! - anyone missing from the master table reserves an unused master row
//!
//! Building a plan never mutates anything. [`ReconcilePlan::apply`] updates the
//! team table and master table together or not at all.

mod free_agents;

pub use free_agents::{promote_free_agents, FreeAgentPool};

use std::collections::{HashSet, VecDeque};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{PlayerId, PlayerRecord, RosterEntry, TeamCode};
use crate::store::{MasterTable, SlotLookup, StatStore, StoreError, TeamAssignment, TeamTable};

/// Errors that abort a team's reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No empty slot on {team} for player {player} (capacity {capacity})")]
    CapacityExceeded {
        team: TeamCode,
        player: PlayerId,
        capacity: usize,
    },

    #[error("No unused master row for player {player} ({team})")]
    MasterCapacityExceeded { team: TeamAssignment, player: PlayerId },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Knobs for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Date ages are derived against
    pub as_of: NaiveDate,
    /// How many of the most recent vacancies get the hardship flag
    pub hardship_window: usize,
}

/// A change to one team slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    Clear { slot: usize },
    Assign { slot: usize, record: PlayerRecord },
    Refresh { slot: usize, record: PlayerRecord },
}

/// A change to one master row.
#[derive(Debug, Clone, PartialEq)]
pub enum MasterUpdate {
    /// Mark the row free agent if it still belongs to this team
    Release { row: usize },
    Upsert { row: usize, record: PlayerRecord },
}

/// A player cleared from the team, with their last known record.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedPlayer {
    pub slot: usize,
    pub record: PlayerRecord,
}

/// Everything needed to bring one team table and the master table in line
/// with a roster.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub team: TeamCode,
    pub slot_updates: Vec<SlotUpdate>,
    pub master_updates: Vec<MasterUpdate>,
    /// Vacancy queue after the pass, oldest first
    pub vacancies: VecDeque<usize>,
    pub hardship_window: usize,
    pub removed: Vec<RemovedPlayer>,
}

/// Build the plan for one team.
pub fn reconcile(
    table: &TeamTable,
    master: &MasterTable,
    roster: &[RosterEntry],
    options: &ReconcileOptions,
) -> Result<ReconcilePlan, ReconcileError> {
    let team = &table.team;
    let roster = dedupe_roster(team, roster);
    let on_roster: HashSet<&PlayerId> = roster.iter().map(|e| &e.player.id).collect();

    let mut slot_updates = Vec::new();
    let mut master_updates = Vec::new();
    let mut removed = Vec::new();
    let mut vacancies = table.vacancies().clone();

    for (slot, record) in table.occupied() {
        if on_roster.contains(&record.id) {
            continue;
        }

        info!("Player ID #{} removed from {} table", record.id, team);
        slot_updates.push(SlotUpdate::Clear { slot });
        vacancies.push_back(slot);
        if let SlotLookup::Found(row) = master.find(&record.id) {
            master_updates.push(MasterUpdate::Release { row });
        }
        removed.push(RemovedPlayer {
            slot,
            record: record.clone(),
        });
    }

    let mut reserved: Vec<usize> = Vec::new();
    for entry in &roster {
        let id = &entry.player.id;

        let record = match table.find_by_id(id) {
            SlotLookup::Found(slot) => {
                debug!("Updating {}", entry.player.name);
                let mut record = table
                    .get(slot)
                    .and_then(|s| s.record())
                    .cloned()
                    .unwrap_or_else(|| PlayerRecord::new_from_roster(entry, options.as_of));
                record.refresh(entry, options.as_of);
                slot_updates.push(SlotUpdate::Refresh {
                    slot,
                    record: record.clone(),
                });
                record
            }
            SlotLookup::NotFound => {
                let slot = vacancies
                    .pop_front()
                    .ok_or_else(|| ReconcileError::CapacityExceeded {
                        team: team.clone(),
                        player: id.clone(),
                        capacity: table.capacity(),
                    })?;
                info!("Adding {} to {} in slot {}", entry.player.name, team, slot);

                let mut record = PlayerRecord::new_from_roster(entry, options.as_of);
                if let Some(existing) = master.find(id).index().and_then(|row| master.entry(row)) {
                    record = record.with_personalized_from(&existing.record);
                }
                slot_updates.push(SlotUpdate::Assign {
                    slot,
                    record: record.clone(),
                });
                record
            }
        };

        let row = match master.find(id) {
            SlotLookup::Found(row) => {
                debug!("Updating {} on master table in row {}", entry.player.name, row);
                row
            }
            SlotLookup::NotFound => {
                let row = master.first_unused(&reserved).ok_or_else(|| {
                    ReconcileError::MasterCapacityExceeded {
                        team: TeamAssignment::Team(team.clone()),
                        player: id.clone(),
                    }
                })?;
                reserved.push(row);
                info!("Adding {} on master table in row {}", entry.player.name, row);
                row
            }
        };
        master_updates.push(MasterUpdate::Upsert { row, record });
    }

    Ok(ReconcilePlan {
        team: team.clone(),
        slot_updates,
        master_updates,
        vacancies,
        hardship_window: options.hardship_window,
        removed,
    })
}

fn dedupe_roster<'a>(team: &TeamCode, roster: &'a [RosterEntry]) -> Vec<&'a RosterEntry> {
    let mut seen = HashSet::new();
    roster
        .iter()
        .filter(|entry| {
            let fresh = seen.insert(&entry.player.id);
            if !fresh {
                warn!("Duplicate roster entry for {} on {}", entry.player.id, team);
            }
            fresh
        })
        .collect()
}

impl ReconcilePlan {
    /// Players given a new slot.
    pub fn added(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.slot_updates.iter().filter_map(|u| match u {
            SlotUpdate::Assign { record, .. } => Some(record),
            _ => None,
        })
    }

    pub fn added_count(&self) -> usize {
        self.added().count()
    }

    pub fn retained_count(&self) -> usize {
        self.slot_updates
            .iter()
            .filter(|u| matches!(u, SlotUpdate::Refresh { .. }))
            .count()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Apply the plan. Both tables change together; on error the store is
    /// left untouched.
    pub fn apply(&self, store: &mut StatStore) -> Result<(), ReconcileError> {
        let mut staged = store.clone();
        self.apply_to(&mut staged)?;
        *store = staged;

        info!(
            "{} table updated: {} added, {} retained, {} removed",
            self.team,
            self.added_count(),
            self.retained_count(),
            self.removed_count()
        );
        Ok(())
    }

    fn apply_to(&self, store: &mut StatStore) -> Result<(), ReconcileError> {
        for update in &self.slot_updates {
            if let SlotUpdate::Clear { slot } = update {
                store.clear_slot(&self.team, *slot)?;
            }
        }
        for update in &self.slot_updates {
            match update {
                SlotUpdate::Assign { slot, record } | SlotUpdate::Refresh { slot, record } => {
                    store.set_slot(&self.team, *slot, record.clone())?;
                }
                SlotUpdate::Clear { .. } => {}
            }
        }

        let table = store.team_mut(&self.team)?;
        table.set_vacancies(self.vacancies.clone());
        table.mark_hardship(self.hardship_window);

        let master = store.master_mut();
        for update in &self.master_updates {
            match update {
                MasterUpdate::Release { row } => {
                    master.release(*row, &self.team)?;
                }
                MasterUpdate::Upsert { row, record } => {
                    master.upsert(
                        *row,
                        record.clone(),
                        TeamAssignment::Team(self.team.clone()),
                    )?;
                }
            }
        }

        Ok(())
    }
}
