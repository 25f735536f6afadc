//! Slot-addressed stat store.
//!
//! Logical view over the league's tables:
//! - one fixed-capacity [`TeamTable`] per team
//! - the league-wide [`MasterTable`]
//! - per-cell background colors for both
//!
//! Nothing here touches the filesystem; see [`crate::storage`] for that.

mod master;
mod team;

pub use master::*;
pub use team::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculate::color::Rgb;
use crate::models::{PlayerId, PlayerRecord, TeamCode};

/// Errors raised by slot addressing.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown team: {0}")]
    UnknownTeam(TeamCode),

    #[error("Slot {index} out of range for {team} (capacity {capacity})")]
    SlotOutOfRange {
        team: TeamCode,
        index: usize,
        capacity: usize,
    },

    #[error("Player {id} already occupies slot {index} on {team}")]
    DuplicateSlotId {
        team: TeamCode,
        id: PlayerId,
        index: usize,
    },

    #[error("{team} table has {stored} slots but {configured} are configured")]
    CapacityMismatch {
        team: TeamCode,
        stored: usize,
        configured: usize,
    },

    #[error("Master row {row} out of range (table has {len} rows)")]
    MasterRowOutOfRange { row: usize, len: usize },

    #[error("Player {id} already has master row {row}")]
    DuplicateMasterId { id: PlayerId, row: usize },
}

/// Result of looking a player up by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLookup {
    Found(usize),
    NotFound,
}

impl SlotLookup {
    pub fn index(self) -> Option<usize> {
        match self {
            SlotLookup::Found(i) => Some(i),
            SlotLookup::NotFound => None,
        }
    }
}

/// Background colors for one row, aligned with [`crate::models::StatField::ALL`].
/// `None` means the cell has no fill.
pub type RowColors = Vec<Option<Rgb>>;

/// Cell colors for every table, keyed by slot / master row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Formatting {
    pub teams: BTreeMap<TeamCode, BTreeMap<usize, RowColors>>,
    pub master: BTreeMap<usize, RowColors>,
}

/// All team tables, the master table and their formatting.
#[derive(Debug, Clone, Default)]
pub struct StatStore {
    teams: BTreeMap<TeamCode, TeamTable>,
    master: MasterTable,
    formatting: Formatting,
}

impl StatStore {
    /// Create an empty league.
    pub fn new(teams: &[TeamCode], capacity: usize, master_capacity: usize) -> Self {
        Self {
            teams: teams
                .iter()
                .map(|t| (t.clone(), TeamTable::new(t.clone(), capacity)))
                .collect(),
            master: MasterTable::new(master_capacity),
            formatting: Formatting::default(),
        }
    }

    /// Assemble a store from loaded parts.
    pub fn from_parts(tables: Vec<TeamTable>, master: MasterTable, formatting: Formatting) -> Self {
        Self {
            teams: tables.into_iter().map(|t| (t.team.clone(), t)).collect(),
            master,
            formatting,
        }
    }

    pub fn team(&self, team: &TeamCode) -> Result<&TeamTable, StoreError> {
        self.teams
            .get(team)
            .ok_or_else(|| StoreError::UnknownTeam(team.clone()))
    }

    pub(crate) fn team_mut(&mut self, team: &TeamCode) -> Result<&mut TeamTable, StoreError> {
        self.teams
            .get_mut(team)
            .ok_or_else(|| StoreError::UnknownTeam(team.clone()))
    }

    pub fn teams(&self) -> impl Iterator<Item = &TeamTable> {
        self.teams.values()
    }

    pub fn master(&self) -> &MasterTable {
        &self.master
    }

    pub(crate) fn master_mut(&mut self) -> &mut MasterTable {
        &mut self.master
    }

    pub fn formatting(&self) -> &Formatting {
        &self.formatting
    }

    pub fn get_slot(&self, team: &TeamCode, index: usize) -> Result<&Slot, StoreError> {
        let table = self.team(team)?;
        table.get(index).ok_or_else(|| StoreError::SlotOutOfRange {
            team: team.clone(),
            index,
            capacity: table.capacity(),
        })
    }

    /// Put a record into a slot, replacing whatever was there.
    pub fn set_slot(
        &mut self,
        team: &TeamCode,
        index: usize,
        record: PlayerRecord,
    ) -> Result<(), StoreError> {
        self.check_slot(team, index)?;
        let table = self.team_mut(team)?;
        if let SlotLookup::Found(existing) = table.find_by_id(&record.id) {
            if existing != index {
                return Err(StoreError::DuplicateSlotId {
                    team: team.clone(),
                    id: record.id,
                    index: existing,
                });
            }
        }
        table.set(index, record);
        Ok(())
    }

    /// Empty a slot and drop its cell colors. Returns the evicted record.
    pub fn clear_slot(
        &mut self,
        team: &TeamCode,
        index: usize,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        self.check_slot(team, index)?;
        let removed = self.team_mut(team)?.clear(index);
        if let Some(colors) = self.formatting.teams.get_mut(team) {
            colors.remove(&index);
        }
        Ok(removed)
    }

    pub fn find_by_id(&self, team: &TeamCode, id: &PlayerId) -> Result<SlotLookup, StoreError> {
        Ok(self.team(team)?.find_by_id(id))
    }

    /// Replace every cell color of one team.
    pub fn set_team_colors(&mut self, team: &TeamCode, colors: BTreeMap<usize, RowColors>) {
        self.formatting.teams.insert(team.clone(), colors);
    }

    /// Replace every cell color of the master table.
    pub fn set_master_colors(&mut self, colors: BTreeMap<usize, RowColors>) {
        self.formatting.master = colors;
    }

    pub fn check_slot(&self, team: &TeamCode, index: usize) -> Result<(), StoreError> {
        self.get_slot(team, index).map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::models::{PlayerId, PlayerRecord, RosterEntry, RosterPlayer, StatBundle, StatLine};

    pub fn roster_entry(id: &str, stats: Option<StatLine>) -> RosterEntry {
        RosterEntry {
            player: RosterPlayer {
                id: PlayerId::from(id),
                name: format!("Player {}", id),
                number: "0".to_string(),
                experience: "R".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2000, 1, 1),
                height: "6-6".to_string(),
                weight: "210".to_string(),
            },
            stats,
        }
    }

    pub fn stat_line(minutes: f64, points: f64) -> StatLine {
        let bundle = StatBundle {
            games_played: 10,
            minutes,
            points,
            ..Default::default()
        };
        StatLine::from_bundle(&bundle, None)
    }

    pub fn record(id: &str) -> PlayerRecord {
        PlayerRecord::new_from_roster(&roster_entry(id, None), as_of())
    }

    pub fn record_with_stats(id: &str, minutes: f64, points: f64) -> PlayerRecord {
        PlayerRecord::new_from_roster(
            &roster_entry(id, Some(stat_line(minutes, points))),
            as_of(),
        )
    }

    pub fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;

    fn store() -> StatStore {
        StatStore::new(&[TeamCode::from("BOS"), TeamCode::from("NYK")], 3, 10)
    }

    #[test]
    fn test_new_store_shape() {
        let store = store();
        assert_eq!(store.teams().count(), 2);
        assert_eq!(store.master().len(), 10);
        assert!(store.get_slot(&TeamCode::from("BOS"), 2).unwrap().is_empty());
    }

    #[test]
    fn test_set_and_find_slot() {
        let mut store = store();
        let bos = TeamCode::from("BOS");
        store.set_slot(&bos, 1, record("a")).unwrap();

        assert_eq!(
            store.find_by_id(&bos, &PlayerId::from("a")).unwrap(),
            SlotLookup::Found(1)
        );
        assert_eq!(
            store.find_by_id(&bos, &PlayerId::from("b")).unwrap(),
            SlotLookup::NotFound
        );
    }

    #[test]
    fn test_set_slot_rejects_second_slot_for_same_player() {
        let mut store = store();
        let bos = TeamCode::from("BOS");
        store.set_slot(&bos, 0, record("a")).unwrap();

        let err = store.set_slot(&bos, 2, record("a")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlotId { index: 0, .. }));
    }

    #[test]
    fn test_unknown_team_and_out_of_range() {
        let store = store();
        assert!(matches!(
            store.get_slot(&TeamCode::from("LAL"), 0),
            Err(StoreError::UnknownTeam(_))
        ));
        assert!(matches!(
            store.get_slot(&TeamCode::from("BOS"), 3),
            Err(StoreError::SlotOutOfRange { capacity: 3, .. })
        ));
    }

    #[test]
    fn test_clear_slot_drops_colors() {
        let mut store = store();
        let bos = TeamCode::from("BOS");
        store.set_slot(&bos, 0, record("a")).unwrap();

        let mut colors = BTreeMap::new();
        colors.insert(0, vec![Some(Rgb::new(1, 2, 3))]);
        store.set_team_colors(&bos, colors);

        let removed = store.clear_slot(&bos, 0).unwrap();
        assert_eq!(removed.unwrap().id, PlayerId::from("a"));
        assert!(store.formatting().teams[&bos].is_empty());
        assert!(store.get_slot(&bos, 0).unwrap().is_empty());
    }
}
