//! League-wide master table mirroring every tracked player.

use serde::{Deserialize, Serialize};

use super::{SlotLookup, StoreError};
use crate::models::{PlayerId, PlayerRecord, TeamCode};

/// Which team a master row currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAssignment {
    Team(TeamCode),
    FreeAgent,
}

impl TeamAssignment {
    pub fn is_team(&self, team: &TeamCode) -> bool {
        matches!(self, TeamAssignment::Team(t) if t == team)
    }

    /// Whether the row belongs to any team.
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Team(_))
    }
}

impl std::fmt::Display for TeamAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamAssignment::Team(team) => write!(f, "{}", team),
            TeamAssignment::FreeAgent => write!(f, "FA"),
        }
    }
}

/// A player's master row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterEntry {
    pub team: TeamAssignment,
    pub record: PlayerRecord,
}

/// One row of the master table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MasterRow {
    /// Free to be reserved ("-")
    Unused,
    Used(Box<MasterEntry>),
}

impl MasterRow {
    pub fn entry(&self) -> Option<&MasterEntry> {
        match self {
            MasterRow::Used(entry) => Some(entry.as_ref()),
            MasterRow::Unused => None,
        }
    }

    pub fn is_unused(&self) -> bool {
        matches!(self, MasterRow::Unused)
    }
}

/// Fixed-size list of master rows. A player id appears at most once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MasterTable {
    rows: Vec<MasterRow>,
}

impl MasterTable {
    /// Create a table of `capacity` unused rows.
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: vec![MasterRow::Unused; capacity],
        }
    }

    /// Build from persisted rows, rejecting duplicate player ids.
    pub fn from_rows(rows: Vec<MasterRow>) -> Result<Self, StoreError> {
        let mut table = Self { rows: Vec::new() };
        for row in rows {
            if let Some(entry) = row.entry() {
                if let SlotLookup::Found(existing) = table.find(&entry.record.id) {
                    return Err(StoreError::DuplicateMasterId {
                        id: entry.record.id.clone(),
                        row: existing,
                    });
                }
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[MasterRow] {
        &self.rows
    }

    pub fn get(&self, row: usize) -> Option<&MasterRow> {
        self.rows.get(row)
    }

    pub fn entry(&self, row: usize) -> Option<&MasterEntry> {
        self.rows.get(row).and_then(MasterRow::entry)
    }

    pub fn find(&self, id: &PlayerId) -> SlotLookup {
        self.rows
            .iter()
            .position(|row| row.entry().is_some_and(|e| &e.record.id == id))
            .map(SlotLookup::Found)
            .unwrap_or(SlotLookup::NotFound)
    }

    /// First unused row that is not already in `reserved`.
    pub fn first_unused(&self, reserved: &[usize]) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .find(|(i, row)| row.is_unused() && !reserved.contains(i))
            .map(|(i, _)| i)
    }

    /// Write a player into a row.
    pub fn upsert(
        &mut self,
        row: usize,
        record: PlayerRecord,
        team: TeamAssignment,
    ) -> Result<(), StoreError> {
        self.check_row(row)?;
        if let SlotLookup::Found(existing) = self.find(&record.id) {
            if existing != row {
                return Err(StoreError::DuplicateMasterId {
                    id: record.id,
                    row: existing,
                });
            }
        }
        self.rows[row] = MasterRow::Used(Box::new(MasterEntry { team, record }));
        Ok(())
    }

    /// Mark a row as a free agent, but only while it still belongs to
    /// `team`. Returns whether the row changed.
    pub fn release(&mut self, row: usize, team: &TeamCode) -> Result<bool, StoreError> {
        self.check_row(row)?;
        match &mut self.rows[row] {
            MasterRow::Used(entry) if entry.team.is_team(team) => {
                entry.team = TeamAssignment::FreeAgent;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Rows currently marked free agent.
    pub fn free_agents(&self) -> impl Iterator<Item = (usize, &MasterEntry)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.entry().map(|e| (i, e)))
            .filter(|(_, e)| e.team == TeamAssignment::FreeAgent)
    }

    pub fn check_row(&self, row: usize) -> Result<(), StoreError> {
        if row >= self.rows.len() {
            return Err(StoreError::MasterRowOutOfRange {
                row,
                len: self.rows.len(),
            });
        }
        Ok(())
    }
}
