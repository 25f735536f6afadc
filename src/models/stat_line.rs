//! Per-player stat lines and the fields they are ranked on.

use serde::{Deserialize, Serialize};

/// Number of ranked stat fields on a stat line.
pub const STAT_FIELD_COUNT: usize = 19;

/// A ranked stat field, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    GamesPlayed,
    Minutes,
    OffensiveRating,
    DefensiveRating,
    Points,
    TrueShootingPct,
    TwoPointAttempts,
    TwoPointPct,
    ThreePointAttempts,
    ThreePointPct,
    FreeThrowAttempts,
    FreeThrowPct,
    Assists,
    Turnovers,
    OffensiveRebounds,
    DefensiveRebounds,
    Steals,
    Blocks,
    Fouls,
}

impl StatField {
    pub const ALL: [StatField; STAT_FIELD_COUNT] = [
        StatField::GamesPlayed,
        StatField::Minutes,
        StatField::OffensiveRating,
        StatField::DefensiveRating,
        StatField::Points,
        StatField::TrueShootingPct,
        StatField::TwoPointAttempts,
        StatField::TwoPointPct,
        StatField::ThreePointAttempts,
        StatField::ThreePointPct,
        StatField::FreeThrowAttempts,
        StatField::FreeThrowPct,
        StatField::Assists,
        StatField::Turnovers,
        StatField::OffensiveRebounds,
        StatField::DefensiveRebounds,
        StatField::Steals,
        StatField::Blocks,
        StatField::Fouls,
    ];

    /// Position of this field in [`StatField::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short column label.
    pub fn label(self) -> &'static str {
        match self {
            StatField::GamesPlayed => "GP",
            StatField::Minutes => "MIN",
            StatField::OffensiveRating => "ORAPM",
            StatField::DefensiveRating => "DRAPM",
            StatField::Points => "PTS",
            StatField::TrueShootingPct => "TS%",
            StatField::TwoPointAttempts => "2PA",
            StatField::TwoPointPct => "2P%",
            StatField::ThreePointAttempts => "3PA",
            StatField::ThreePointPct => "3P%",
            StatField::FreeThrowAttempts => "FTA",
            StatField::FreeThrowPct => "FT%",
            StatField::Assists => "AST",
            StatField::Turnovers => "TOV",
            StatField::OffensiveRebounds => "OREB",
            StatField::DefensiveRebounds => "DREB",
            StatField::Steals => "STL",
            StatField::Blocks => "BLK",
            StatField::Fouls => "PF",
        }
    }

    /// Lower raw values are better for these fields, so their rank is
    /// flipped before it is rendered.
    pub fn is_inverted(self) -> bool {
        matches!(self, StatField::Turnovers | StatField::Fouls)
    }
}

impl std::fmt::Display for StatField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Raw season numbers for one player as returned by the stats provider.
///
/// Counting stats are per 100 possessions; percentages are fractions (0.0-1.0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBundle {
    pub games_played: u32,
    /// Total minutes played (advanced splits)
    pub minutes: f64,
    pub points: f64,
    pub field_goals_made: f64,
    pub field_goals_attempted: f64,
    pub threes_made: f64,
    pub threes_attempted: f64,
    pub three_pct: f64,
    pub free_throws_attempted: f64,
    pub free_throw_pct: f64,
    pub true_shooting_pct: f64,
    pub assists: f64,
    pub turnovers: f64,
    pub offensive_rebounds: f64,
    pub defensive_rebounds: f64,
    pub steals: f64,
    pub blocks: f64,
    pub fouls: f64,
}

/// Plus-minus style impact ratings from the external ratings feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalRating {
    pub offensive: f64,
    pub defensive: f64,
}

/// The 19 ranked values for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub games_played: f64,
    pub minutes: f64,
    pub offensive_rating: f64,
    pub defensive_rating: f64,
    pub points: f64,
    pub true_shooting_pct: f64,
    pub two_point_attempts: f64,
    pub two_point_pct: f64,
    pub three_point_attempts: f64,
    pub three_point_pct: f64,
    pub free_throw_attempts: f64,
    pub free_throw_pct: f64,
    pub assists: f64,
    pub turnovers: f64,
    pub offensive_rebounds: f64,
    pub defensive_rebounds: f64,
    pub steals: f64,
    pub blocks: f64,
    pub fouls: f64,
}

impl StatLine {
    /// Derive a stat line from the provider's bundle and an optional
    /// external rating. Missing ratings count as 0.
    pub fn from_bundle(bundle: &StatBundle, rating: Option<&ExternalRating>) -> Self {
        let two_pa = bundle.field_goals_attempted - bundle.threes_attempted;
        let two_pct = if two_pa != 0.0 {
            round1((bundle.field_goals_made - bundle.threes_made) / two_pa * 100.0)
        } else {
            0.0
        };

        let (offensive_rating, defensive_rating) = match rating {
            Some(r) => (round1(r.offensive), round1(r.defensive)),
            None => (0.0, 0.0),
        };

        Self {
            games_played: finite(bundle.games_played as f64),
            minutes: finite(bundle.minutes),
            offensive_rating: finite(offensive_rating),
            defensive_rating: finite(defensive_rating),
            points: finite(bundle.points),
            true_shooting_pct: finite(bundle.true_shooting_pct * 100.0),
            two_point_attempts: finite(two_pa),
            two_point_pct: finite(two_pct),
            three_point_attempts: finite(bundle.threes_attempted),
            three_point_pct: finite(bundle.three_pct * 100.0),
            free_throw_attempts: finite(bundle.free_throws_attempted),
            free_throw_pct: finite(bundle.free_throw_pct * 100.0),
            assists: finite(bundle.assists),
            turnovers: finite(bundle.turnovers),
            offensive_rebounds: finite(bundle.offensive_rebounds),
            defensive_rebounds: finite(bundle.defensive_rebounds),
            steals: finite(bundle.steals),
            blocks: finite(bundle.blocks),
            fouls: finite(bundle.fouls),
        }
    }

    /// Value of a single field.
    pub fn get(&self, field: StatField) -> f64 {
        match field {
            StatField::GamesPlayed => self.games_played,
            StatField::Minutes => self.minutes,
            StatField::OffensiveRating => self.offensive_rating,
            StatField::DefensiveRating => self.defensive_rating,
            StatField::Points => self.points,
            StatField::TrueShootingPct => self.true_shooting_pct,
            StatField::TwoPointAttempts => self.two_point_attempts,
            StatField::TwoPointPct => self.two_point_pct,
            StatField::ThreePointAttempts => self.three_point_attempts,
            StatField::ThreePointPct => self.three_point_pct,
            StatField::FreeThrowAttempts => self.free_throw_attempts,
            StatField::FreeThrowPct => self.free_throw_pct,
            StatField::Assists => self.assists,
            StatField::Turnovers => self.turnovers,
            StatField::OffensiveRebounds => self.offensive_rebounds,
            StatField::DefensiveRebounds => self.defensive_rebounds,
            StatField::Steals => self.steals,
            StatField::Blocks => self.blocks,
            StatField::Fouls => self.fouls,
        }
    }

    /// Weight used for percentile ranking: minutes played.
    pub fn weight(&self) -> f64 {
        self.minutes
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Stored lines must serialize as JSON numbers; NaN and infinities become 0.
fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
