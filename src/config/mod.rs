//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::calculate::{Gradient, Rgb};
use crate::fetch::{FetcherConfig, SourceUrls};
use crate::models::TeamCode;
use crate::parse_duration;
use crate::storage::StorageConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// League shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueConfig {
    #[serde(default = "default_teams")]
    pub teams: Vec<String>,

    /// Slots per team table
    #[serde(default = "default_team_capacity")]
    pub team_capacity: usize,

    /// Rows in the master table
    #[serde(default = "default_master_capacity")]
    pub master_capacity: usize,

    /// Most recent vacancies flagged as hardship slots
    #[serde(default = "default_hardship_window")]
    pub hardship_window: usize,

    #[serde(default = "default_season")]
    pub season: String,
}

fn default_teams() -> Vec<String> {
    [
        "ATL", "BOS", "BKN", "CHA", "CHI", "CLE", "DAL", "DEN", "DET", "GSW", "HOU", "IND", "LAC",
        "LAL", "MEM", "MIA", "MIL", "MIN", "NOP", "NYK", "OKC", "ORL", "PHI", "PHX", "POR", "SAC",
        "SAS", "TOR", "UTA", "WAS",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_team_capacity() -> usize {
    23
}

fn default_master_capacity() -> usize {
    750
}

fn default_hardship_window() -> usize {
    4
}

fn default_season() -> String {
    "2024-25".to_string()
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            teams: default_teams(),
            team_capacity: default_team_capacity(),
            master_capacity: default_master_capacity(),
            hardship_window: default_hardship_window(),
            season: default_season(),
        }
    }
}

/// Remote data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_stats_base_url")]
    pub stats_base_url: String,

    #[serde(default = "default_rating_url")]
    pub rating_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Pause after every network request
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

fn default_stats_base_url() -> String {
    "https://stats.nba.com/stats".to_string()
}

fn default_rating_url() -> String {
    "https://www.gameflowpbp.com/api/rapm_1?season=2025".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_rate_limit() -> u64 {
    600
}

fn default_cache_ttl() -> u64 {
    6 * 3600
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            stats_base_url: default_stats_base_url(),
            rating_url: default_rating_url(),
            timeout_seconds: default_timeout(),
            rate_limit_ms: default_rate_limit(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Fixed pauses between teams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// After each team during the roster pass
    #[serde(default = "default_team_delay")]
    pub team_delay: String,

    /// After each team during the color pass
    #[serde(default = "default_color_delay")]
    pub color_delay: String,
}

fn default_team_delay() -> String {
    "30s".to_string()
}

fn default_color_delay() -> String {
    "15s".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            team_delay: default_team_delay(),
            color_delay: default_color_delay(),
        }
    }
}

/// Gradient stops as `#rrggbb`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorsConfig {
    #[serde(default = "default_low")]
    pub low: String,
    #[serde(default = "default_mid")]
    pub mid: String,
    #[serde(default = "default_high")]
    pub high: String,
}

fn default_low() -> String {
    Gradient::DEFAULT.low.to_hex()
}

fn default_mid() -> String {
    Gradient::DEFAULT.mid.to_hex()
}

fn default_high() -> String {
    Gradient::DEFAULT.high.to_hex()
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            low: default_low(),
            mid: default_mid(),
            high: default_high(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub league: LeagueConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub colors: ColorsConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            league: LeagueConfig::default(),
            sources: SourcesConfig::default(),
            schedule: ScheduleConfig::default(),
            colors: ColorsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let league = &self.league;
        if league.teams.is_empty() {
            return Err(invalid("At least one team is required"));
        }

        let mut seen = HashSet::new();
        for team in self.team_codes() {
            if team.as_str().is_empty() {
                return Err(invalid("Team codes must not be blank"));
            }
            if !seen.insert(team.clone()) {
                return Err(invalid(format!("Team {} is listed twice", team)));
            }
        }

        if league.team_capacity == 0 {
            return Err(invalid("Team capacity must be greater than 0"));
        }

        let needed = league.teams.len() * league.team_capacity;
        if league.master_capacity < needed {
            return Err(invalid(format!(
                "Master capacity {} cannot hold {} teams of {} slots",
                league.master_capacity,
                league.teams.len(),
                league.team_capacity
            )));
        }

        if league.hardship_window > league.team_capacity {
            return Err(invalid(format!(
                "Hardship window {} exceeds team capacity {}",
                league.hardship_window, league.team_capacity
            )));
        }

        if self.sources.timeout_seconds == 0 {
            return Err(invalid("Source timeout must be greater than 0"));
        }

        self.source_urls()?;
        self.team_delay()?;
        self.color_delay()?;
        self.gradient()?;

        Ok(())
    }

    pub fn team_codes(&self) -> Vec<TeamCode> {
        self.league.teams.iter().map(TeamCode::new).collect()
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.data_dir.clone())
    }

    pub fn team_delay(&self) -> Result<Duration, ConfigError> {
        parse_delay("team_delay", &self.schedule.team_delay)
    }

    pub fn color_delay(&self) -> Result<Duration, ConfigError> {
        parse_delay("color_delay", &self.schedule.color_delay)
    }

    pub fn gradient(&self) -> Result<Gradient, ConfigError> {
        let stop = |name: &str, hex: &str| {
            Rgb::from_hex(hex).map_err(|e| invalid(format!("colors.{}: {}", name, e)))
        };
        Ok(Gradient {
            low: stop("low", &self.colors.low)?,
            mid: stop("mid", &self.colors.mid)?,
            high: stop("high", &self.colors.high)?,
        })
    }

    pub fn source_urls(&self) -> Result<SourceUrls, ConfigError> {
        let parse = |name: &str, raw: &str| {
            Url::parse(raw).map_err(|e| invalid(format!("sources.{}: {}", name, e)))
        };
        Ok(SourceUrls {
            stats_base: parse("stats_base_url", &self.sources.stats_base_url)?,
            rating: parse("rating_url", &self.sources.rating_url)?,
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            cache_dir: self.storage().raw_dir(),
            cache_ttl: Duration::from_secs(self.sources.cache_ttl_seconds),
            timeout: Duration::from_secs(self.sources.timeout_seconds),
            request_delay: Duration::from_millis(self.sources.rate_limit_ms),
            ..FetcherConfig::default()
        }
    }
}

fn parse_delay(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    parse_duration(raw).ok_or_else(|| invalid(format!("schedule.{}: cannot parse {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.league.teams.len(), 30);
        assert_eq!(config.league.team_capacity, 23);
        assert_eq!(config.league.master_capacity, 750);
        assert_eq!(config.league.hardship_window, 4);
        assert_eq!(config.league.season, "2024-25");
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.team_delay().unwrap(), Duration::from_secs(30));
        assert_eq!(config.color_delay().unwrap(), Duration::from_secs(15));
        assert_eq!(config.gradient().unwrap(), Gradient::DEFAULT);
    }

    #[test]
    fn test_config_validation_duplicate_team() {
        let mut config = AppConfig::default();
        config.league.teams = vec!["BOS".to_string(), "bos".to_string()];

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_master_too_small() {
        let mut config = AppConfig::default();
        config.league.master_capacity = 100;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_values() {
        let mut config = AppConfig::default();
        config.league.hardship_window = 24;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.schedule.team_delay = "soon".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.colors.mid = "yellow".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sources.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/srv/league"

[league]
teams = ["BOS", "NYK"]
team_capacity = 15
master_capacity = 40

[schedule]
team_delay = "1m"
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/league"));
        assert_eq!(config.team_codes(), vec![TeamCode::from("BOS"), TeamCode::from("NYK")]);
        assert_eq!(config.league.hardship_window, 4);
        assert_eq!(config.team_delay().unwrap(), Duration::from_secs(60));
        assert_eq!(config.fetcher_config().cache_dir, PathBuf::from("/srv/league/raw"));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.league.teams, parsed.league.teams);
    }
}
