//! Stats provider abstraction.

use async_trait::async_trait;

use super::FetchError;
use crate::models::{ExternalRating, PlayerId, RosterPlayer, StatBundle, TeamCode};

/// Source of rosters, per-player stat bundles and external ratings.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Current roster of a team.
    async fn fetch_roster(&self, team: &TeamCode) -> Result<Vec<RosterPlayer>, FetchError>;

    /// Season stats for a player, `None` when the player has not played.
    async fn fetch_stat_bundle(
        &self,
        player: &PlayerId,
        season: &str,
    ) -> Result<Option<StatBundle>, FetchError>;

    /// Offensive and defensive impact rating, `None` when the feed has no entry.
    async fn fetch_external_rating(
        &self,
        player: &PlayerId,
    ) -> Result<Option<ExternalRating>, FetchError>;
}

/// In-memory provider for tests. Rosters can be swapped between cycles.
#[cfg(test)]
#[derive(Default)]
pub struct MockProvider {
    rosters: std::sync::Mutex<std::collections::HashMap<TeamCode, Vec<RosterPlayer>>>,
    bundles: std::collections::HashMap<PlayerId, StatBundle>,
    ratings: std::collections::HashMap<PlayerId, ExternalRating>,
    failing_team: Option<TeamCode>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(self, team: &str, players: Vec<RosterPlayer>) -> Self {
        self.set_roster(team, players);
        self
    }

    pub fn with_bundle(mut self, player: &str, bundle: StatBundle) -> Self {
        self.bundles.insert(PlayerId::from(player), bundle);
        self
    }

    pub fn with_rating(mut self, player: &str, rating: ExternalRating) -> Self {
        self.ratings.insert(PlayerId::from(player), rating);
        self
    }

    pub fn failing_on(mut self, team: &str) -> Self {
        self.failing_team = Some(TeamCode::from(team));
        self
    }

    pub fn set_roster(&self, team: &str, players: Vec<RosterPlayer>) {
        if let Ok(mut rosters) = self.rosters.lock() {
            rosters.insert(TeamCode::from(team), players);
        }
    }
}

#[cfg(test)]
#[async_trait]
impl StatsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_roster(&self, team: &TeamCode) -> Result<Vec<RosterPlayer>, FetchError> {
        if self.failing_team.as_ref() == Some(team) {
            return Err(FetchError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        let rosters = self.rosters.lock().map_err(|_| FetchError::InvalidUrl("poisoned".into()))?;
        Ok(rosters.get(team).cloned().unwrap_or_default())
    }

    async fn fetch_stat_bundle(
        &self,
        player: &PlayerId,
        _season: &str,
    ) -> Result<Option<StatBundle>, FetchError> {
        Ok(self.bundles.get(player).cloned())
    }

    async fn fetch_external_rating(
        &self,
        player: &PlayerId,
    ) -> Result<Option<ExternalRating>, FetchError> {
        Ok(self.ratings.get(player).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::roster_entry;

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockProvider::new()
            .with_roster("BOS", vec![roster_entry("1", None).player])
            .with_bundle(
                "1",
                StatBundle {
                    games_played: 3,
                    ..Default::default()
                },
            )
            .failing_on("NYK");

        let roster = provider.fetch_roster(&TeamCode::from("BOS")).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert!(provider
            .fetch_roster(&TeamCode::from("LAL"))
            .await
            .unwrap()
            .is_empty());
        assert!(provider.fetch_roster(&TeamCode::from("NYK")).await.is_err());

        let bundle = provider
            .fetch_stat_bundle(&PlayerId::from("1"), "2024-25")
            .await
            .unwrap();
        assert_eq!(bundle.map(|b| b.games_played), Some(3));
        assert!(provider
            .fetch_external_rating(&PlayerId::from("1"))
            .await
            .unwrap()
            .is_none());
    }
}
