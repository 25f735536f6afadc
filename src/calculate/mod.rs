//! League-wide ranking.
//!
//! One ranking cycle:
//! - gather a [`StatCollection`] from every team table
//! - rank each stat field into a [`PercentileMap`]
//! - turn ranks into cell colors with a [`Gradient`]

pub mod color;
pub mod percentile;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{PlayerId, StatField, StatLine, TeamCode, STAT_FIELD_COUNT};
use crate::store::{RowColors, TeamTable};

pub use color::{percentile_to_color, Gradient, Rgb};
pub use percentile::{display_percentile, weighted_percentiles, PercentileError, WeightedValue};

/// Where a collected stat line came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SlotRef {
    pub team: TeamCode,
    pub slot: usize,
    pub player: PlayerId,
}

/// Weighted values for every stat field, one entry per ranked slot.
///
/// Entry `i` of every field belongs to `entries()[i]`.
#[derive(Debug, Clone)]
pub struct StatCollection {
    entries: Vec<SlotRef>,
    fields: Vec<Vec<WeightedValue>>,
}

impl Default for StatCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl StatCollection {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fields: vec![Vec::new(); STAT_FIELD_COUNT],
        }
    }

    /// Collect every occupied slot with stats, team by team in slot order.
    pub fn gather<'a>(tables: impl IntoIterator<Item = &'a TeamTable>) -> Self {
        let mut collection = Self::new();
        for table in tables {
            for (slot, record) in table.occupied() {
                if let Some(stats) = &record.stats {
                    collection.push(
                        SlotRef {
                            team: table.team.clone(),
                            slot,
                            player: record.id.clone(),
                        },
                        stats,
                    );
                }
            }
            debug!("Scraped {} team table", table.team);
        }
        collection
    }

    /// Add one stat line. Unusable minutes count as zero weight.
    pub fn push(&mut self, slot: SlotRef, line: &StatLine) {
        let mut weight = line.weight();
        if !weight.is_finite() || weight < 0.0 {
            warn!(
                "Player {} has unusable minutes ({}); ranking with zero weight",
                slot.player, weight
            );
            weight = 0.0;
        }

        for field in StatField::ALL {
            self.fields[field.index()].push(WeightedValue::new(line.get(field), weight));
        }
        self.entries.push(slot);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SlotRef] {
        &self.entries
    }

    pub fn field(&self, field: StatField) -> &[WeightedValue] {
        self.fields
            .get(field.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Percentiles per field, aligned with the collection they came from.
#[derive(Debug, Clone)]
pub struct PercentileMap {
    entries: Vec<SlotRef>,
    /// `None` when the field has no ranking (zero total weight)
    fields: Vec<Option<Vec<f64>>>,
}

impl PercentileMap {
    /// Rank every field of the collection.
    pub fn compute(collection: &StatCollection) -> Self {
        info!("Calculating percentiles for {} players", collection.len());

        let fields = StatField::ALL
            .iter()
            .map(|&field| match weighted_percentiles(collection.field(field)) {
                Ok(ranks) => Some(ranks),
                Err(e) => {
                    warn!("No ranking available for {}: {}", field, e);
                    None
                }
            })
            .collect();

        info!("Percentiles calculated");
        Self {
            entries: collection.entries().to_vec(),
            fields,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Percentiles of one field in collection order.
    pub fn field(&self, field: StatField) -> Option<&[f64]> {
        self.fields.get(field.index())?.as_deref()
    }

    pub fn ranked_fields(&self) -> usize {
        self.fields.iter().filter(|f| f.is_some()).count()
    }

    /// Walk ranked rows in collection order.
    pub fn rows(&self) -> impl Iterator<Item = RankedRow<'_>> {
        self.entries
            .iter()
            .enumerate()
            .map(move |(position, slot)| RankedRow {
                slot,
                position,
                map: self,
            })
    }

    /// Ranked rows of one team.
    pub fn team_rows<'a>(&'a self, team: &'a TeamCode) -> impl Iterator<Item = RankedRow<'a>> {
        self.rows().filter(move |row| &row.slot.team == team)
    }
}

/// One ranked slot.
#[derive(Debug, Clone, Copy)]
pub struct RankedRow<'a> {
    pub slot: &'a SlotRef,
    position: usize,
    map: &'a PercentileMap,
}

impl RankedRow<'_> {
    /// Raw percentile for a field.
    pub fn percentile(&self, field: StatField) -> Option<f64> {
        self.map.field(field).map(|ranks| ranks[self.position])
    }

    /// Percentile flipped for lower-is-better fields.
    pub fn display_percentile(&self, field: StatField) -> Option<f64> {
        self.percentile(field).map(|p| display_percentile(field, p))
    }

    /// Cell colors for the whole row.
    pub fn colors(&self, gradient: &Gradient) -> RowColors {
        StatField::ALL
            .iter()
            .map(|&field| self.display_percentile(field).map(|p| gradient.color_at(p)))
            .collect()
    }
}

/// Cell colors for every ranked slot, grouped by team.
pub fn team_colors(
    map: &PercentileMap,
    gradient: &Gradient,
) -> BTreeMap<TeamCode, BTreeMap<usize, RowColors>> {
    let mut colors: BTreeMap<TeamCode, BTreeMap<usize, RowColors>> = BTreeMap::new();
    for row in map.rows() {
        colors
            .entry(row.slot.team.clone())
            .or_default()
            .insert(row.slot.slot, row.colors(gradient));
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::record_with_stats;
    use crate::store::StatStore;
    use pretty_assertions::assert_eq;

    fn league() -> StatStore {
        let bos = TeamCode::from("BOS");
        let nyk = TeamCode::from("NYK");
        let mut store = StatStore::new(&[bos.clone(), nyk.clone()], 4, 20);
        store.set_slot(&bos, 0, record_with_stats("a", 100.0, 10.0)).unwrap();
        store.set_slot(&bos, 2, crate::store::test_support::record("no-stats")).unwrap();
        store.set_slot(&bos, 3, record_with_stats("b", 100.0, 30.0)).unwrap();
        store.set_slot(&nyk, 1, record_with_stats("c", 200.0, 20.0)).unwrap();
        store
    }

    #[test]
    fn test_gather_skips_players_without_stats() {
        let store = league();
        let collection = StatCollection::gather(store.teams());

        let players: Vec<&str> = collection
            .entries()
            .iter()
            .map(|e| e.player.as_str())
            .collect();
        assert_eq!(players, vec!["a", "b", "c"]);
        assert_eq!(collection.field(StatField::Points).len(), 3);
        assert_eq!(collection.field(StatField::Points)[2], WeightedValue::new(20.0, 200.0));
    }

    #[test]
    fn test_percentile_map_aligns_with_entries() {
        let store = league();
        let map = PercentileMap::compute(&StatCollection::gather(store.teams()));

        // Points: 10 (100 min), 20 (200 min), 30 (100 min) -> 12.5, 50, 87.5
        assert_eq!(map.field(StatField::Points).unwrap(), &[12.5, 87.5, 50.0]);

        let rows: Vec<(String, Option<f64>)> = map
            .rows()
            .map(|r| (r.slot.player.to_string(), r.percentile(StatField::Points)))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a".to_string(), Some(12.5)),
                ("b".to_string(), Some(87.5)),
                ("c".to_string(), Some(50.0)),
            ]
        );
    }

    #[test]
    fn test_zero_weight_field_is_unranked() {
        let bos = TeamCode::from("BOS");
        let mut store = StatStore::new(&[bos.clone()], 2, 5);
        store.set_slot(&bos, 0, record_with_stats("a", 0.0, 10.0)).unwrap();

        let map = PercentileMap::compute(&StatCollection::gather(store.teams()));
        assert_eq!(map.ranked_fields(), 0);
        assert!(map.field(StatField::Points).is_none());

        let row = map.rows().next().unwrap();
        assert!(row.colors(&Gradient::DEFAULT).iter().all(Option::is_none));
    }

    #[test]
    fn test_inverted_fields_flip_before_coloring() {
        let bos = TeamCode::from("BOS");
        let mut store = StatStore::new(&[bos.clone()], 2, 5);
        let mut careful = record_with_stats("careful", 500.0, 10.0);
        let mut sloppy = record_with_stats("sloppy", 500.0, 10.0);
        careful.stats.as_mut().unwrap().turnovers = 1.0;
        sloppy.stats.as_mut().unwrap().turnovers = 5.0;
        store.set_slot(&bos, 0, careful).unwrap();
        store.set_slot(&bos, 1, sloppy).unwrap();

        let map = PercentileMap::compute(&StatCollection::gather(store.teams()));
        let tov = StatField::Turnovers.index();
        let rows: Vec<_> = map.rows().collect();

        // Raw ranks 25/75; more turnovers displays lower
        assert_eq!(rows[1].percentile(StatField::Turnovers), Some(75.0));
        assert_eq!(rows[1].display_percentile(StatField::Turnovers), Some(25.0));
        assert_eq!(rows[0].display_percentile(StatField::Turnovers), Some(75.0));

        let sloppy_color = rows[1].colors(&Gradient::DEFAULT)[tov];
        let careful_color = rows[0].colors(&Gradient::DEFAULT)[tov];
        assert_eq!(sloppy_color, Some(Gradient::DEFAULT.color_at(25.0)));
        assert_eq!(careful_color, Some(Gradient::DEFAULT.color_at(75.0)));

        // Non-inverted fields keep the raw rank
        assert_eq!(
            rows[1].display_percentile(StatField::Points),
            rows[1].percentile(StatField::Points)
        );
    }

    #[test]
    fn test_default_collection_accepts_pushes() {
        let mut collection = StatCollection::default();
        collection.push(
            SlotRef {
                team: TeamCode::from("BOS"),
                slot: 0,
                player: PlayerId::from("a"),
            },
            &crate::store::test_support::stat_line(100.0, 12.0),
        );
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.field(StatField::Points), &[WeightedValue::new(12.0, 100.0)]);
    }

    #[test]
    fn test_team_colors_groups_by_team() {
        let store = league();
        let map = PercentileMap::compute(&StatCollection::gather(store.teams()));
        let colors = team_colors(&map, &Gradient::DEFAULT);

        let bos = &colors[&TeamCode::from("BOS")];
        assert_eq!(bos.keys().copied().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(bos[&0].len(), STAT_FIELD_COUNT);
        assert_eq!(colors[&TeamCode::from("NYK")].len(), 1);

        let nyk = TeamCode::from("NYK");
        let nyk_rows: Vec<_> = map.team_rows(&nyk).collect();
        assert_eq!(nyk_rows.len(), 1);
        assert_eq!(nyk_rows[0].slot.slot, 1);
    }
}
