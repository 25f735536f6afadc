//! Fixed-capacity team tables.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{SlotLookup, StoreError};
use crate::models::{PlayerId, PlayerRecord, TeamCode};

/// One addressable row of a team table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Slot {
    /// No player. `hardship` marks one of the most recently vacated slots.
    Empty {
        #[serde(default)]
        hardship: bool,
    },
    Occupied(Box<PlayerRecord>),
}

impl Slot {
    pub fn empty() -> Self {
        Slot::Empty { hardship: false }
    }

    pub fn record(&self) -> Option<&PlayerRecord> {
        match self {
            Slot::Occupied(record) => Some(record.as_ref()),
            Slot::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty { .. })
    }

    pub fn is_hardship(&self) -> bool {
        matches!(self, Slot::Empty { hardship: true })
    }
}

/// The slots of one team plus the order in which they became empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTable {
    pub team: TeamCode,
    slots: Vec<Slot>,
    /// Indices of empty slots, oldest vacancy first.
    vacancies: VecDeque<usize>,
}

impl TeamTable {
    /// Create a table with `capacity` empty slots.
    pub fn new(team: TeamCode, capacity: usize) -> Self {
        Self {
            team,
            slots: vec![Slot::empty(); capacity],
            vacancies: (0..capacity).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn vacancies(&self) -> &VecDeque<usize> {
        &self.vacancies
    }

    /// Occupied slots in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &PlayerRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.record().map(|r| (i, r)))
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn find_by_id(&self, id: &PlayerId) -> SlotLookup {
        self.occupied()
            .find(|(_, record)| &record.id == id)
            .map(|(i, _)| SlotLookup::Found(i))
            .unwrap_or(SlotLookup::NotFound)
    }

    /// Put a record into a slot. Callers check the index beforehand.
    pub(crate) fn set(&mut self, index: usize, record: PlayerRecord) {
        self.slots[index] = Slot::Occupied(Box::new(record));
        self.vacancies.retain(|&i| i != index);
    }

    /// Empty a slot, queueing it behind existing vacancies.
    /// Returns the record that was there, if any.
    pub(crate) fn clear(&mut self, index: usize) -> Option<PlayerRecord> {
        let previous = std::mem::replace(&mut self.slots[index], Slot::empty());
        match previous {
            Slot::Occupied(record) => {
                self.vacancies.push_back(index);
                Some(*record)
            }
            Slot::Empty { .. } => None,
        }
    }

    /// Replace the vacancy queue. Every index must point at an empty slot.
    pub(crate) fn set_vacancies(&mut self, vacancies: VecDeque<usize>) {
        self.vacancies = vacancies;
        self.normalize();
    }

    /// Flag the `window` most recent vacancies as hardship slots and reset
    /// the flag everywhere else.
    pub fn mark_hardship(&mut self, window: usize) {
        let flagged: Vec<usize> = self
            .vacancies
            .iter()
            .rev()
            .take(window)
            .copied()
            .collect();

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Empty { hardship } = slot {
                *hardship = flagged.contains(&i);
            }
        }
    }

    /// Repair the vacancy queue after loading: drop entries that are out of
    /// range, duplicated or occupied, and append empty slots that are missing
    /// in index order.
    pub fn normalize(&mut self) {
        let mut seen = vec![false; self.slots.len()];
        let slots = &self.slots;
        self.vacancies.retain(|&i| {
            if i >= slots.len() || seen[i] || !slots[i].is_empty() {
                return false;
            }
            seen[i] = true;
            true
        });

        for (i, slot) in self.slots.iter().enumerate() {
            if slot.is_empty() && !seen[i] {
                self.vacancies.push_back(i);
            }
        }
    }

    /// Check a loaded table against the configured capacity and for players
    /// stored in more than one slot.
    pub fn validate(&self, capacity: usize) -> Result<(), StoreError> {
        if self.slots.len() != capacity {
            return Err(StoreError::CapacityMismatch {
                team: self.team.clone(),
                stored: self.slots.len(),
                configured: capacity,
            });
        }

        for (index, record) in self.occupied() {
            if let SlotLookup::Found(first) = self.find_by_id(&record.id) {
                if first != index {
                    return Err(StoreError::DuplicateSlotId {
                        team: self.team.clone(),
                        id: record.id.clone(),
                        index: first,
                    });
                }
            }
        }
        Ok(())
    }
}
