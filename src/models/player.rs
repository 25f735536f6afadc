//! Player roster entries and stored player records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{PlayerId, StatLine};

/// Placeholder for personalized fields nobody has filled in yet.
pub const UNKNOWN_FIELD: &str = "?";

/// Blank scouting notes put on every new or cleared slot.
pub const NOTES_TEMPLATE: &str = "\n\n---------------------------------------------------------\n\nStrengths:\n - \n\nWeaknesses:\n - \n\nOther notes:\n - ";

/// A player as listed on a team's current roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: PlayerId,
    pub name: String,
    /// Jersey number (kept as text; some rosters use "00")
    pub number: String,
    /// Years of experience ("R" for rookies)
    pub experience: String,
    pub birth_date: Option<NaiveDate>,
    /// Height as "feet-inches", e.g. "6-7"
    pub height: String,
    pub weight: String,
}

impl RosterPlayer {
    /// Age in years on `as_of`, to one decimal place.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<f64> {
        self.birth_date.map(|birth| calculate_age(birth, as_of))
    }
}

/// A roster player together with whatever stats could be fetched for them.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub player: RosterPlayer,
    pub stats: Option<StatLine>,
}

/// A player as stored in a team slot or master row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    /// Hand-maintained position
    pub position: String,
    pub number: String,
    pub experience: String,
    pub age: Option<f64>,
    /// Display height, e.g. `6'7"`
    pub height: String,
    /// Hand-maintained wingspan
    pub wingspan: String,
    pub weight: String,
    pub notes: String,

    /// `None` when the provider had no data for the season
    pub stats: Option<StatLine>,
}

impl PlayerRecord {
    /// Build a fresh record for a player entering a slot for the first time.
    pub fn new_from_roster(entry: &RosterEntry, as_of: NaiveDate) -> Self {
        let player = &entry.player;
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            position: UNKNOWN_FIELD.to_string(),
            number: player.number.clone(),
            experience: player.experience.clone(),
            age: player.age_on(as_of),
            height: format_height(&player.height),
            wingspan: UNKNOWN_FIELD.to_string(),
            weight: player.weight.clone(),
            notes: NOTES_TEMPLATE.to_string(),
            stats: entry.stats.clone(),
        }
    }

    /// Copy hand-maintained fields (position, wingspan) from another record.
    pub fn with_personalized_from(mut self, other: &PlayerRecord) -> Self {
        self.position = other.position.clone();
        self.wingspan = other.wingspan.clone();
        self
    }

    /// Refresh provider-owned fields in place, keeping hand-maintained ones.
    pub fn refresh(&mut self, entry: &RosterEntry, as_of: NaiveDate) {
        let player = &entry.player;
        self.name = player.name.clone();
        self.number = player.number.clone();
        self.experience = player.experience.clone();
        self.age = player.age_on(as_of);
        self.height = format_height(&player.height);
        self.weight = player.weight.clone();
        self.stats = entry.stats.clone();
    }

    pub fn has_stats(&self) -> bool {
        self.stats.is_some()
    }
}

/// Age in years (days / 365.25) rounded to one decimal place.
pub fn calculate_age(birth_date: NaiveDate, as_of: NaiveDate) -> f64 {
    let days = (as_of - birth_date).num_days() as f64;
    super::round1(days / 365.25)
}

/// Reformat "6-7" as `6'7"`. Anything else is passed through untouched.
pub fn format_height(raw: &str) -> String {
    match raw.split_once('-') {
        Some((feet, inches)) if !feet.is_empty() && !inches.is_empty() => {
            format!("{}'{}\"", feet.trim(), inches.trim())
        }
        _ => raw.to_string(),
    }
}

/// Parse a roster birth date. The roster feed uses "Jan 05, 1999"; ISO
/// timestamps are accepted as well.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
