//! Loading and saving the stat store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{read_json, write_json, JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::TeamCode;
use crate::store::{Formatting, MasterRow, MasterTable, RowColors, StatStore, TeamTable};

/// One persisted row of cell colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFormatting {
    pub row: usize,
    pub colors: RowColors,
}

/// Whether any tables have been written yet.
pub fn store_exists(config: &StorageConfig) -> bool {
    config.master_path().exists()
}

/// Write a fresh, empty league. Fails if tables already exist unless `force`.
pub fn init_store(
    config: &StorageConfig,
    teams: &[TeamCode],
    capacity: usize,
    master_capacity: usize,
    force: bool,
) -> Result<StatStore, StorageError> {
    if store_exists(config) && !force {
        return Err(StorageError::AlreadyInitialized(config.data_dir.clone()));
    }

    let store = StatStore::new(teams, capacity, master_capacity);
    for table in store.teams() {
        save_team(config, table)?;
    }
    save_master(config, store.master())?;
    save_formatting(config, &store)?;

    info!(
        "Initialized {} team tables ({} slots) and {} master rows",
        teams.len(),
        capacity,
        master_capacity
    );
    Ok(store)
}

/// Load every configured team plus the master table and formatting.
///
/// Teams without a table file get an empty one of `capacity` slots. A stored
/// table with a different slot count, or with a player in two slots, is an
/// error.
pub fn load_store(
    config: &StorageConfig,
    teams: &[TeamCode],
    capacity: usize,
) -> Result<StatStore, StorageError> {
    let mut tables = Vec::with_capacity(teams.len());
    for team in teams {
        let path = config.team_table_path(team);
        let table = if path.exists() {
            let mut table: TeamTable = read_json(&path)?;
            table.team = team.clone();
            table.validate(capacity)?;
            table.normalize();
            table
        } else {
            warn!("No table for {}; starting with {} empty slots", team, capacity);
            TeamTable::new(team.clone(), capacity)
        };
        tables.push(table);
    }

    let rows: Vec<MasterRow> = JsonlReader::new(config.master_path()).read_all_strict()?;
    let master = MasterTable::from_rows(rows)?;

    let mut formatting = Formatting::default();
    for team in teams {
        let rows = read_formatting(config.team_formatting_path(team))?;
        if !rows.is_empty() {
            formatting.teams.insert(team.clone(), rows);
        }
    }
    formatting.master = read_formatting(config.master_formatting_path())?;

    info!("Loaded {} team tables and {} master rows", tables.len(), master.len());
    Ok(StatStore::from_parts(tables, master, formatting))
}

pub fn save_team(config: &StorageConfig, table: &TeamTable) -> Result<(), StorageError> {
    write_json(&config.team_table_path(&table.team), table)
}

pub fn save_master(config: &StorageConfig, master: &MasterTable) -> Result<(), StorageError> {
    JsonlWriter::new(config.master_path()).write_all(master.rows())?;
    Ok(())
}

/// Persist cell colors of every team and the master table.
pub fn save_formatting(config: &StorageConfig, store: &StatStore) -> Result<(), StorageError> {
    for table in store.teams() {
        save_team_formatting(config, store, &table.team)?;
    }
    save_master_formatting(config, store)
}

pub fn save_master_formatting(config: &StorageConfig, store: &StatStore) -> Result<(), StorageError> {
    write_formatting(config.master_formatting_path(), &store.formatting().master)
}

pub fn save_team_formatting(
    config: &StorageConfig,
    store: &StatStore,
    team: &TeamCode,
) -> Result<(), StorageError> {
    let empty = BTreeMap::new();
    let colors = store.formatting().teams.get(team).unwrap_or(&empty);
    write_formatting(config.team_formatting_path(team), colors)
}

fn write_formatting(
    path: std::path::PathBuf,
    colors: &BTreeMap<usize, RowColors>,
) -> Result<(), StorageError> {
    let rows: Vec<RowFormatting> = colors
        .iter()
        .map(|(&row, colors)| RowFormatting {
            row,
            colors: colors.clone(),
        })
        .collect();
    JsonlWriter::new(path).write_all(&rows)?;
    Ok(())
}

fn read_formatting(path: std::path::PathBuf) -> Result<BTreeMap<usize, RowColors>, StorageError> {
    let rows: Vec<RowFormatting> = JsonlReader::new(path).read_all()?;
    Ok(rows.into_iter().map(|r| (r.row, r.colors)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::Rgb;
    use crate::models::{PlayerId, StatBundle, StatLine};
    use crate::store::test_support::{record, roster_entry};
    use crate::store::{StoreError, TeamAssignment};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn teams() -> Vec<TeamCode> {
        vec![TeamCode::from("BOS"), TeamCode::from("NYK")]
    }

    #[test]
    fn test_init_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());

        let mut store = init_store(&config, &teams(), 3, 8, false).unwrap();
        let bos = TeamCode::from("BOS");
        store.set_slot(&bos, 1, record("a")).unwrap();
        store
            .master_mut()
            .upsert(0, record("a"), TeamAssignment::Team(bos.clone()))
            .unwrap();
        let mut colors = BTreeMap::new();
        colors.insert(1, vec![Some(Rgb::new(1, 2, 3)), None]);
        store.set_team_colors(&bos, colors);

        save_team(&config, store.team(&bos).unwrap()).unwrap();
        save_master(&config, store.master()).unwrap();
        save_formatting(&config, &store).unwrap();

        let loaded = load_store(&config, &teams(), 3).unwrap();
        assert_eq!(loaded.team(&bos).unwrap(), store.team(&bos).unwrap());
        assert_eq!(loaded.master(), store.master());
        assert_eq!(loaded.formatting().teams[&bos][&1], vec![Some(Rgb::new(1, 2, 3)), None]);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());

        init_store(&config, &teams(), 3, 8, false).unwrap();
        assert!(matches!(
            init_store(&config, &teams(), 3, 8, false),
            Err(StorageError::AlreadyInitialized(_))
        ));
        assert!(init_store(&config, &teams(), 3, 8, true).is_ok());
    }

    #[test]
    fn test_load_fills_missing_team() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        init_store(&config, &teams(), 3, 8, false).unwrap();

        let mut more = teams();
        more.push(TeamCode::from("LAL"));
        let loaded = load_store(&config, &more, 3).unwrap();

        let lal = loaded.team(&TeamCode::from("LAL")).unwrap();
        assert_eq!(lal.capacity(), 3);
        assert_eq!(lal.occupied_count(), 0);
    }

    #[test]
    fn test_load_without_master_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());

        assert!(matches!(
            load_store(&config, &teams(), 3),
            Err(StorageError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_load_rejects_capacity_change() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        init_store(&config, &teams(), 3, 8, false).unwrap();

        assert!(matches!(
            load_store(&config, &teams(), 4),
            Err(StorageError::Store(StoreError::CapacityMismatch { .. }))
        ));
    }

    #[test]
    fn test_load_rejects_player_in_two_slots() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        let mut store = init_store(&config, &teams(), 3, 8, false).unwrap();

        // set_slot refuses duplicates, so write the bad table by hand
        let bos = TeamCode::from("BOS");
        store.set_slot(&bos, 0, record("a")).unwrap();
        let mut json = serde_json::to_value(store.team(&bos).unwrap()).unwrap();
        json["slots"][2] = json["slots"][0].clone();
        write_json(&config.team_table_path(&bos), &json).unwrap();

        match load_store(&config, &teams(), 3) {
            Err(StorageError::Store(StoreError::DuplicateSlotId { id, index, .. })) => {
                assert_eq!(id, PlayerId::from("a"));
                assert_eq!(index, 0);
            }
            other => panic!("expected duplicate slot error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_finite_stats_survive_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        let mut store = init_store(&config, &teams(), 3, 8, false).unwrap();

        let bundle = StatBundle {
            games_played: 5,
            minutes: 120.0,
            three_pct: f64::NAN,
            free_throw_pct: f64::INFINITY,
            ..Default::default()
        };
        let stats = StatLine::from_bundle(&bundle, None);
        let bos = TeamCode::from("BOS");
        let player = crate::models::PlayerRecord::new_from_roster(
            &roster_entry("a", Some(stats)),
            crate::store::test_support::as_of(),
        );
        store.set_slot(&bos, 0, player).unwrap();
        save_team(&config, store.team(&bos).unwrap()).unwrap();

        let loaded = load_store(&config, &teams(), 3).unwrap();
        let record = loaded.get_slot(&bos, 0).unwrap().record().cloned().unwrap();
        let line = record.stats.unwrap();
        assert_eq!(line.three_point_pct, 0.0);
        assert_eq!(line.free_throw_pct, 0.0);
        assert_eq!(line.minutes, 120.0);
    }
}
