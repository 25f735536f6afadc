//! Players dropped during a sync cycle, waiting to be marked free agents.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::{ReconcileError, ReconcilePlan, SlotUpdate};
use crate::models::{PlayerId, PlayerRecord};
use crate::store::{SlotLookup, StatStore, TeamAssignment};

/// Removed players keyed by id. A player who lands on another roster later
/// in the same cycle is taken back out.
#[derive(Debug, Clone, Default)]
pub struct FreeAgentPool {
    players: BTreeMap<PlayerId, PlayerRecord>,
}

impl FreeAgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one applied team plan into the pool.
    pub fn absorb(&mut self, plan: &ReconcilePlan) {
        for update in &plan.slot_updates {
            if let SlotUpdate::Assign { record, .. } | SlotUpdate::Refresh { record, .. } = update
            {
                if self.players.remove(&record.id).is_some() {
                    debug!("{} signed with {} during this cycle", record.name, plan.team);
                }
            }
        }
        for removed in &plan.removed {
            self.players
                .insert(removed.record.id.clone(), removed.record.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }
}

/// Write every pooled player to the master table as a free agent.
///
/// Rows that another team has claimed since are left alone. Players without
/// a master row get the first unused one. Returns how many rows were written.
/// On error the store is left untouched.
pub fn promote_free_agents(
    store: &mut StatStore,
    pool: &FreeAgentPool,
) -> Result<usize, ReconcileError> {
    let mut master = store.master().clone();
    let mut promoted = 0;

    for record in pool.players() {
        let row = match master.find(&record.id) {
            SlotLookup::Found(row) => {
                let claimed = master
                    .entry(row)
                    .map(|e| e.team.clone())
                    .filter(TeamAssignment::is_signed);
                if let Some(team) = claimed {
                    debug!("Skipping {}: row {} belongs to {}", record.name, row, team);
                    continue;
                }
                row
            }
            SlotLookup::NotFound => {
                let row = master.first_unused(&[]).ok_or_else(|| {
                    ReconcileError::MasterCapacityExceeded {
                        team: TeamAssignment::FreeAgent,
                        player: record.id.clone(),
                    }
                })?;
                info!("Adding {} on master table in row {}", record.name, row);
                row
            }
        };

        master.upsert(row, record.clone(), TeamAssignment::FreeAgent)?;
        info!("{} is now a free agent", record.name);
        promoted += 1;
    }

    *store.master_mut() = master;
    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamCode;
    use crate::reconcile::{reconcile, ReconcileOptions};
    use crate::store::test_support::{as_of, record, roster_entry};
    use pretty_assertions::assert_eq;

    fn options() -> ReconcileOptions {
        ReconcileOptions {
            as_of: as_of(),
            hardship_window: 4,
        }
    }

    fn run(store: &mut StatStore, team: &TeamCode, ids: &[&str], pool: &mut FreeAgentPool) {
        let roster: Vec<_> = ids.iter().map(|id| roster_entry(id, None)).collect();
        let plan = reconcile(store.team(team).unwrap(), store.master(), &roster, &options()).unwrap();
        plan.apply(store).unwrap();
        pool.absorb(&plan);
    }

    #[test]
    fn test_player_signed_later_in_cycle_leaves_pool() {
        let bos = TeamCode::from("BOS");
        let nyk = TeamCode::from("NYK");
        let mut store = StatStore::new(&[bos.clone(), nyk.clone()], 3, 10);
        let mut pool = FreeAgentPool::new();

        run(&mut store, &bos, &["a", "b"], &mut pool);
        run(&mut store, &bos, &["a"], &mut pool);
        assert!(pool.contains(&PlayerId::from("b")));

        run(&mut store, &nyk, &["b"], &mut pool);
        assert!(pool.is_empty());

        assert_eq!(promote_free_agents(&mut store, &pool).unwrap(), 0);
        let row = store.master().find(&PlayerId::from("b")).index().unwrap();
        assert_eq!(store.master().entry(row).unwrap().team, TeamAssignment::Team(nyk));
    }

    #[test]
    fn test_promotion_skips_rows_claimed_by_another_team() {
        let bos = TeamCode::from("BOS");
        let nyk = TeamCode::from("NYK");
        let mut store = StatStore::new(&[bos.clone(), nyk.clone()], 3, 10);
        let mut pool = FreeAgentPool::new();

        run(&mut store, &bos, &["a"], &mut pool);
        // NYK signs "a" before BOS drops the player in the same cycle
        run(&mut store, &nyk, &["a"], &mut pool);
        run(&mut store, &bos, &[], &mut pool);
        assert!(pool.contains(&PlayerId::from("a")));

        assert_eq!(promote_free_agents(&mut store, &pool).unwrap(), 0);
        let row = store.master().find(&PlayerId::from("a")).index().unwrap();
        assert_eq!(store.master().entry(row).unwrap().team, TeamAssignment::Team(nyk));
    }

    #[test]
    fn test_promotion_writes_last_known_record() {
        let bos = TeamCode::from("BOS");
        let mut store = StatStore::new(&[bos.clone()], 3, 10);
        let mut pool = FreeAgentPool::new();

        run(&mut store, &bos, &["a"], &mut pool);
        run(&mut store, &bos, &[], &mut pool);

        assert_eq!(promote_free_agents(&mut store, &pool).unwrap(), 1);
        let free: Vec<_> = store.master().free_agents().collect();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].1.record.id, PlayerId::from("a"));
    }

    #[test]
    fn test_promotion_reserves_row_for_unknown_player() {
        let bos = TeamCode::from("BOS");
        let mut store = StatStore::new(&[bos.clone()], 3, 2);
        store
            .master_mut()
            .upsert(0, record("x"), TeamAssignment::FreeAgent)
            .unwrap();

        let mut pool = FreeAgentPool::new();
        pool.players.insert(PlayerId::from("z"), record("z"));

        assert_eq!(promote_free_agents(&mut store, &pool).unwrap(), 1);
        assert_eq!(store.master().find(&PlayerId::from("z")), SlotLookup::Found(1));

        pool.players.insert(PlayerId::from("y"), record("y"));
        let before = store.master().clone();
        assert!(matches!(
            promote_free_agents(&mut store, &pool),
            Err(ReconcileError::MasterCapacityExceeded { .. })
        ));
        assert_eq!(store.master(), &before);
    }
}
