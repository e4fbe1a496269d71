//! Player collection and the single rating-mutation path
//!
//! `PlayerStore` exclusively owns the tag→record map. Every rating change
//! flows through `apply_delta`/`revert_delta` (or their whole-race batch
//! forms); no other write path to `current_elo`, `league`, or `races_played`
//! exists. Mutations are staged on a copy, flushed through the injected
//! `StateStore`, and only then committed in memory, so a failed flush leaves
//! the store exactly as it was.

use crate::error::{LedgerError, Result};
use crate::rating::{classify_league, world_rank_to_rating};
use crate::store::state::StateStore;
use crate::types::{DeltaMap, Player, PlayerTag};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct PlayerStore {
    players: BTreeMap<PlayerTag, Player>,
    store: Arc<dyn StateStore>,
}

impl PlayerStore {
    /// Load the player collection through the given persistence handle
    pub fn load(store: Arc<dyn StateStore>) -> Result<Self> {
        let players = store.load_players()?;
        Ok(Self { players, store })
    }

    /// Register a new player, seeding their rating from world rank
    pub fn add(&mut self, tag: &str, world_rank: u32) -> Result<Player> {
        if world_rank == 0 {
            return Err(LedgerError::InvalidWorldRank { rank: 0 }.into());
        }
        if self.players.contains_key(tag) {
            return Err(LedgerError::DuplicatePlayer {
                tag: tag.to_string(),
            }
            .into());
        }

        let initial_elo = world_rank_to_rating(world_rank)?;
        let player = Player {
            world_rank,
            initial_elo,
            current_elo: initial_elo,
            league: classify_league(initial_elo),
            races_played: 0,
        };

        let mut staged = self.players.clone();
        staged.insert(tag.to_string(), player.clone());
        self.commit(staged)?;

        info!(
            "Added {}: world rank #{} -> {} ({})",
            tag, world_rank, player.initial_elo, player.league
        );
        Ok(player)
    }

    /// Look up a player record
    pub fn get(&self, tag: &str) -> Result<&Player> {
        self.players.get(tag).ok_or_else(|| {
            LedgerError::PlayerNotFound {
                tag: tag.to_string(),
            }
            .into()
        })
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.players.contains_key(tag)
    }

    pub fn players(&self) -> &BTreeMap<PlayerTag, Player> {
        &self.players
    }

    /// Players sorted by current rating, best first
    pub fn standings(&self) -> Vec<(&PlayerTag, &Player)> {
        let mut rows: Vec<_> = self.players.iter().collect();
        rows.sort_by(|a, b| {
            b.1.current_elo
                .partial_cmp(&a.1.current_elo)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    /// Apply one race's rating delta to a single player
    pub fn apply_delta(&mut self, tag: &str, delta: f64) -> Result<()> {
        let mut staged = self.players.clone();
        apply_to(&mut staged, tag, delta)?;
        self.commit(staged)
    }

    /// Undo one race's rating delta for a single player
    pub fn revert_delta(&mut self, tag: &str, delta: f64) -> Result<()> {
        let mut staged = self.players.clone();
        revert_to(&mut staged, tag, delta)?;
        self.commit(staged)
    }

    /// Apply a whole race's delta map in one flush
    pub fn apply_race(&mut self, deltas: &DeltaMap) -> Result<()> {
        let mut staged = self.players.clone();
        for (tag, delta) in deltas {
            apply_to(&mut staged, tag, *delta)?;
        }
        self.commit(staged)
    }

    /// Revert a whole race's delta map in one flush
    pub fn revert_race(&mut self, deltas: &DeltaMap) -> Result<()> {
        self.revert_races([deltas])
    }

    /// Revert several races' delta maps in a single staged flush
    ///
    /// Used for whole-match deletion, where every sub-race is undone together.
    pub fn revert_races<'a>(
        &mut self,
        delta_maps: impl IntoIterator<Item = &'a DeltaMap>,
    ) -> Result<()> {
        let mut staged = self.players.clone();
        for deltas in delta_maps {
            for (tag, delta) in deltas {
                revert_to(&mut staged, tag, *delta)?;
            }
        }
        self.commit(staged)
    }

    fn commit(&mut self, staged: BTreeMap<PlayerTag, Player>) -> Result<()> {
        self.store.save_players(&staged)?;
        self.players = staged;
        Ok(())
    }
}

fn apply_to(staged: &mut BTreeMap<PlayerTag, Player>, tag: &str, delta: f64) -> Result<()> {
    let player = staged.get_mut(tag).ok_or_else(|| LedgerError::PlayerNotFound {
        tag: tag.to_string(),
    })?;

    player.current_elo += delta;
    player.league = classify_league(player.current_elo);
    player.races_played += 1;
    Ok(())
}

fn revert_to(staged: &mut BTreeMap<PlayerTag, Player>, tag: &str, delta: f64) -> Result<()> {
    let player = staged.get_mut(tag).ok_or_else(|| LedgerError::PlayerNotFound {
        tag: tag.to_string(),
    })?;

    player.current_elo -= delta;
    player.league = classify_league(player.current_elo);
    player.races_played = player.races_played.checked_sub(1).ok_or_else(|| {
        LedgerError::Internal {
            message: format!("races_played underflow for {}", tag),
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::state::MockStateStore;
    use crate::types::League;

    fn store_with_players(entries: &[(&str, u32)]) -> (PlayerStore, Arc<MockStateStore>) {
        let backend = Arc::new(MockStateStore::new());
        let mut players = PlayerStore::load(backend.clone()).unwrap();
        for (tag, rank) in entries {
            players.add(tag, *rank).unwrap();
        }
        backend.clear_save_log();
        (players, backend)
    }

    #[test]
    fn test_add_seeds_rating_and_league() {
        let (players, _) = store_with_players(&[("ace", 1)]);

        let ace = players.get("ace").unwrap();
        assert_eq!(ace.initial_elo, 4500.0);
        assert_eq!(ace.current_elo, 4500.0);
        assert_eq!(ace.league, League::Master);
        assert_eq!(ace.races_played, 0);
    }

    #[test]
    fn test_add_rejects_duplicates_and_bad_ranks() {
        let (mut players, _) = store_with_players(&[("ace", 10)]);

        assert!(players.add("ace", 20).is_err());
        assert!(players.add("newcomer", 0).is_err());
        assert!(!players.contains("newcomer"));
    }

    #[test]
    fn test_get_unknown_player() {
        let (players, _) = store_with_players(&[]);
        assert!(players.get("ghost").is_err());
    }

    #[test]
    fn test_apply_then_revert_restores_exactly() {
        let (mut players, _) = store_with_players(&[("ace", 100)]);
        let before = players.get("ace").unwrap().clone();

        players.apply_delta("ace", 37.25).unwrap();
        assert_eq!(players.get("ace").unwrap().races_played, 1);

        players.revert_delta("ace", 37.25).unwrap();
        let after = players.get("ace").unwrap();
        assert!((after.current_elo - before.current_elo).abs() < 1e-9);
        assert_eq!(after.races_played, 0);
        assert_eq!(after.league, before.league);
    }

    #[test]
    fn test_league_reclassified_on_boundary_crossing() {
        // Rank 30 seeds just above the Master threshold
        let (mut players, _) = store_with_players(&[("ace", 30)]);
        assert_eq!(players.get("ace").unwrap().league, League::Master);

        players.apply_delta("ace", -1500.0).unwrap();
        assert_eq!(players.get("ace").unwrap().league, League::Champion);

        players.apply_delta("ace", -1500.0).unwrap();
        assert_eq!(players.get("ace").unwrap().league, League::Academy);
    }

    #[test]
    fn test_failed_flush_leaves_memory_unchanged() {
        let (mut players, backend) = store_with_players(&[("ace", 50)]);
        let before = players.get("ace").unwrap().clone();

        backend.set_fail_saves(true);
        assert!(players.apply_delta("ace", 100.0).is_err());

        let after = players.get("ace").unwrap();
        assert_eq!(after.current_elo, before.current_elo);
        assert_eq!(after.races_played, before.races_played);
    }

    #[test]
    fn test_races_played_never_goes_negative() {
        let (mut players, _) = store_with_players(&[("ace", 50)]);
        assert!(players.revert_delta("ace", 10.0).is_err());
        // The failed revert must not have touched the rating either
        let initial = players.get("ace").unwrap().initial_elo;
        assert_eq!(players.get("ace").unwrap().current_elo, initial);
    }

    #[test]
    fn test_batch_apply_is_one_flush() {
        let (mut players, backend) = store_with_players(&[("ace", 10), ("bee", 20)]);

        let mut deltas = DeltaMap::new();
        deltas.insert("ace".to_string(), 12.0);
        deltas.insert("bee".to_string(), -12.0);
        players.apply_race(&deltas).unwrap();

        assert_eq!(backend.save_log(), vec!["players"]);
        assert_eq!(players.get("ace").unwrap().races_played, 1);
        assert_eq!(players.get("bee").unwrap().races_played, 1);
    }

    #[test]
    fn test_standings_sorted_by_rating() {
        let (players, _) = store_with_players(&[("mid", 1000), ("top", 1), ("low", 90_000)]);

        let standings = players.standings();
        let tags: Vec<&str> = standings.iter().map(|(tag, _)| tag.as_str()).collect();
        assert_eq!(tags, vec!["top", "mid", "low"]);
    }
}
