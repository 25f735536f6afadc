//! NBA stats API provider.
//!
//! Endpoints answer with the `resultSets` shape: a list of tables, each with
//! `headers` and a `rowSet` of positional values. Impact ratings come from a
//! separate feed that is downloaded once per run.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use super::{FetchError, Fetcher, StatsProvider};
use crate::models::{parse_birth_date, ExternalRating, PlayerId, RosterPlayer, StatBundle, TeamCode};

const SOURCE: &str = "stats.nba.com";
const RATING_SOURCE: &str = "rating feed";

static NULL: Value = Value::Null;

/// Franchise ids used by the stats API.
const TEAM_IDS: [(&str, u32); 30] = [
    ("ATL", 1610612737),
    ("BOS", 1610612738),
    ("CLE", 1610612739),
    ("NOP", 1610612740),
    ("CHI", 1610612741),
    ("DAL", 1610612742),
    ("DEN", 1610612743),
    ("GSW", 1610612744),
    ("HOU", 1610612745),
    ("LAC", 1610612746),
    ("LAL", 1610612747),
    ("MIA", 1610612748),
    ("MIL", 1610612749),
    ("MIN", 1610612750),
    ("BKN", 1610612751),
    ("NYK", 1610612752),
    ("ORL", 1610612753),
    ("IND", 1610612754),
    ("PHI", 1610612755),
    ("PHX", 1610612756),
    ("POR", 1610612757),
    ("SAC", 1610612758),
    ("SAS", 1610612759),
    ("OKC", 1610612760),
    ("TOR", 1610612761),
    ("UTA", 1610612762),
    ("MEM", 1610612763),
    ("WAS", 1610612764),
    ("DET", 1610612765),
    ("CHA", 1610612766),
];

pub fn nba_team_id(team: &TeamCode) -> Option<u32> {
    TEAM_IDS
        .iter()
        .find(|(code, _)| *code == team.as_str())
        .map(|(_, id)| *id)
}

/// Where the provider fetches from.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    /// Base of the stats API, e.g. `https://stats.nba.com/stats`
    pub stats_base: Url,
    /// Impact rating feed
    pub rating: Url,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    fn column(&self, header: &str) -> Result<usize, FetchError> {
        self.headers
            .iter()
            .position(|h| h == header)
            .ok_or_else(|| {
                FetchError::shape(SOURCE, format!("{} has no {} column", self.name, header))
            })
    }

    fn first_row(&self) -> Option<Row<'_>> {
        self.rows().next()
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.row_set.iter().map(move |values| Row { set: self, values })
    }
}

/// One positional row, read by header name.
struct Row<'a> {
    set: &'a ResultSet,
    values: &'a [Value],
}

impl Row<'_> {
    fn value(&self, header: &str) -> Result<&Value, FetchError> {
        let index = self.set.column(header)?;
        Ok(self.values.get(index).unwrap_or(&NULL))
    }

    fn text(&self, header: &str) -> Result<String, FetchError> {
        Ok(value_to_string(self.value(header)?))
    }

    fn number(&self, header: &str) -> Result<f64, FetchError> {
        Ok(value_to_f64(self.value(header)?))
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numbers, numeric strings, and null (as zero). Non-finite values read as zero.
fn value_to_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn first_set(response: &StatsResponse) -> Result<&ResultSet, FetchError> {
    response
        .result_sets
        .first()
        .ok_or_else(|| FetchError::shape(SOURCE, "empty resultSets"))
}

fn parse_roster(response: &StatsResponse) -> Result<Vec<RosterPlayer>, FetchError> {
    let set = first_set(response)?;
    set.rows()
        .map(|row| {
            let raw_birth = row.text("BIRTH_DATE")?;
            let birth_date = parse_birth_date(&raw_birth);
            if birth_date.is_none() && !raw_birth.is_empty() {
                warn!("Unreadable birth date {:?}", raw_birth);
            }
            Ok(RosterPlayer {
                id: PlayerId::new(row.text("PLAYER_ID")?),
                name: row.text("PLAYER")?,
                number: row.text("NUM")?,
                experience: row.text("EXP")?,
                birth_date,
                height: row.text("HEIGHT")?,
                weight: row.text("WEIGHT")?,
            })
        })
        .collect()
}

/// Combine the per-100 base splits with the advanced splits.
/// `None` when the player has no base row for the season.
fn parse_stat_bundle(
    base: &StatsResponse,
    advanced: &StatsResponse,
) -> Result<Option<StatBundle>, FetchError> {
    let Some(row) = first_set(base)?.first_row() else {
        return Ok(None);
    };

    let (minutes, true_shooting_pct) = match first_set(advanced)?.first_row() {
        Some(adv) => (adv.number("MIN")?, adv.number("TS_PCT")?),
        None => {
            warn!("Advanced splits missing; minutes default to zero");
            (0.0, 0.0)
        }
    };

    Ok(Some(StatBundle {
        games_played: row.number("GP")?.max(0.0) as u32,
        minutes,
        points: row.number("PTS")?,
        field_goals_made: row.number("FGM")?,
        field_goals_attempted: row.number("FGA")?,
        threes_made: row.number("FG3M")?,
        threes_attempted: row.number("FG3A")?,
        three_pct: row.number("FG3_PCT")?,
        free_throws_attempted: row.number("FTA")?,
        free_throw_pct: row.number("FT_PCT")?,
        true_shooting_pct,
        assists: row.number("AST")?,
        turnovers: row.number("TOV")?,
        offensive_rebounds: row.number("OREB")?,
        defensive_rebounds: row.number("DREB")?,
        steals: row.number("STL")?,
        blocks: row.number("BLK")?,
        fouls: row.number("PF")?,
    }))
}

/// Parse the rating feed. The body may be the array itself or a JSON string
/// wrapping it.
fn parse_ratings(body: Value) -> Result<HashMap<PlayerId, ExternalRating>, FetchError> {
    let body = match body {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => other,
    };
    let Value::Array(entries) = body else {
        return Err(FetchError::shape(RATING_SOURCE, "expected a list of players"));
    };

    let mut ratings = HashMap::with_capacity(entries.len());
    for entry in &entries {
        let id = value_to_string(entry.get("player_id").unwrap_or(&NULL));
        if id.is_empty() {
            debug!("Skipping rating entry without player_id");
            continue;
        }
        let field = |name: &str| value_to_f64(entry.get(name).unwrap_or(&NULL));
        ratings.insert(
            PlayerId::new(id),
            ExternalRating {
                offensive: field("off_rapm"),
                defensive: field("def_rapm"),
            },
        );
    }
    Ok(ratings)
}

/// HTTP provider for the NBA stats API and the impact rating feed.
pub struct NbaStatsProvider {
    fetcher: Fetcher,
    urls: SourceUrls,
    /// Season rosters are requested for, e.g. "2024-25"
    season: String,
    ratings: OnceCell<HashMap<PlayerId, ExternalRating>>,
}

impl NbaStatsProvider {
    pub fn new(fetcher: Fetcher, urls: SourceUrls, season: impl Into<String>) -> Self {
        Self {
            fetcher,
            urls,
            season: season.into(),
            ratings: OnceCell::new(),
        }
    }

    fn endpoint(&self, name: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = self.urls.stats_base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.urls.stats_base.to_string()))?
            .pop_if_empty()
            .push(name);
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok(url)
    }

    fn dashboard_url(
        &self,
        player: &PlayerId,
        season: &str,
        measure: &str,
        per_mode: &str,
    ) -> Result<Url, FetchError> {
        self.endpoint(
            "playerdashboardbygeneralsplits",
            &[
                ("DateFrom", ""),
                ("DateTo", ""),
                ("GameSegment", ""),
                ("LastNGames", "0"),
                ("LeagueID", "00"),
                ("Location", ""),
                ("MeasureType", measure),
                ("Month", "0"),
                ("OpponentTeamID", "0"),
                ("Outcome", ""),
                ("PORound", "0"),
                ("PaceAdjust", "N"),
                ("PerMode", per_mode),
                ("Period", "0"),
                ("PlayerID", player.as_str()),
                ("PlusMinus", "N"),
                ("Rank", "N"),
                ("Season", season),
                ("SeasonSegment", ""),
                ("SeasonType", "Regular Season"),
                ("ShotClockRange", ""),
                ("VsConference", ""),
                ("VsDivision", ""),
            ],
        )
    }

    async fn ratings(&self) -> Result<&HashMap<PlayerId, ExternalRating>, FetchError> {
        self.ratings
            .get_or_try_init(|| async {
                let body: Value = self.fetcher.fetch_json(&self.urls.rating).await?;
                let ratings = parse_ratings(body)?;
                info!("Rating feed fetched: {} players", ratings.len());
                Ok::<_, FetchError>(ratings)
            })
            .await
    }
}

#[async_trait]
impl StatsProvider for NbaStatsProvider {
    fn name(&self) -> &'static str {
        "nba"
    }

    async fn fetch_roster(&self, team: &TeamCode) -> Result<Vec<RosterPlayer>, FetchError> {
        let team_id =
            nba_team_id(team).ok_or_else(|| FetchError::UnknownTeam(team.to_string()))?;
        let team_id = team_id.to_string();
        let url = self.endpoint(
            "commonteamroster",
            &[
                ("LeagueID", "00"),
                ("Season", self.season.as_str()),
                ("TeamID", team_id.as_str()),
            ],
        )?;

        let response: StatsResponse = self.fetcher.fetch_json(&url).await?;
        let roster = parse_roster(&response)?;
        debug!("{} roster has {} players", team, roster.len());
        Ok(roster)
    }

    async fn fetch_stat_bundle(
        &self,
        player: &PlayerId,
        season: &str,
    ) -> Result<Option<StatBundle>, FetchError> {
        let base_url = self.dashboard_url(player, season, "Base", "Per100Possessions")?;
        let base: StatsResponse = self.fetcher.fetch_json(&base_url).await?;
        if first_set(&base)?.first_row().is_none() {
            return Ok(None);
        }

        let advanced_url = self.dashboard_url(player, season, "Advanced", "Totals")?;
        let advanced: StatsResponse = self.fetcher.fetch_json(&advanced_url).await?;
        parse_stat_bundle(&base, &advanced)
    }

    async fn fetch_external_rating(
        &self,
        player: &PlayerId,
    ) -> Result<Option<ExternalRating>, FetchError> {
        Ok(self.ratings().await?.get(player).copied())
    }
}
