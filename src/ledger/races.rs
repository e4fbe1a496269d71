//! Race scoring and the race / scheduled-race ledgers
//!
//! `score_race` is the single scoring path: it resolves entrants against the
//! player store, maps every DNF to last place, snapshots pre-race ratings,
//! and produces the per-player delta map. `RaceLedger` owns the permanent
//! race records and the scheduled-race collection, applying and reverting
//! deltas only through the player store.

use crate::error::{LedgerError, Result};
use crate::rating::{update_rating, RatingWeights};
use crate::store::{PlayerStore, StateStore};
use crate::types::{
    DeltaMap, Ledger, PlayerTag, Position, RaceId, RaceRecord, ScheduledRace, ScheduledRaceId,
    ScheduledStatus,
};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of scoring one race against the player store
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    /// Number of resolved entrants (D in the update formula)
    pub field_size: usize,
    /// Signed rating change per resolved entrant
    pub deltas: DeltaMap,
    /// Listed entrants that were unknown to the player store and dropped
    pub skipped: Vec<PlayerTag>,
}

/// Score a single race's results without mutating anything
///
/// All ratings are snapshotted before any delta is computed, and entrants are
/// processed in tag order, so the outcome is independent of the order the
/// results were supplied in. Unknown tags are dropped with a warning; they
/// neither count toward the field size nor appear in the delta map.
pub fn score_race(
    players: &PlayerStore,
    results: &[(PlayerTag, Position)],
    weights: &RatingWeights,
    is_match: bool,
) -> Result<RaceOutcome> {
    let mut listed = BTreeSet::new();
    for (tag, _) in results {
        if !listed.insert(tag.as_str()) {
            return Err(LedgerError::DuplicateEntrant { tag: tag.clone() }.into());
        }
    }

    // Pre-race snapshot, keyed by tag for deterministic iteration
    let mut resolved: BTreeMap<&str, (Position, f64)> = BTreeMap::new();
    let mut skipped = Vec::new();
    for (tag, position) in results {
        match players.players().get(tag) {
            Some(player) => {
                resolved.insert(tag.as_str(), (*position, player.current_elo));
            }
            None => {
                warn!("Skipping unknown entrant in race results: {}", tag);
                skipped.push(tag.clone());
            }
        }
    }

    let field_size = resolved.len();
    if field_size < 2 {
        return Err(LedgerError::InsufficientField { found: field_size }.into());
    }

    let mut deltas = DeltaMap::new();
    for (tag, (position, old_elo)) in &resolved {
        let effective_position = match position {
            Position::Ranked(rank) => *rank,
            // Every DNF ties for last place
            Position::DidNotFinish => field_size as u32,
        };

        let opponents: Vec<f64> = resolved
            .iter()
            .filter(|(other, _)| **other != *tag)
            .map(|(_, (_, elo))| *elo)
            .collect();

        let new_elo = update_rating(
            *old_elo,
            weights,
            is_match,
            effective_position,
            field_size,
            &opponents,
            &[],
        );
        deltas.insert((*tag).to_string(), new_elo - old_elo);
    }

    Ok(RaceOutcome {
        field_size,
        deltas,
        skipped,
    })
}

/// Ledger of permanent races and scheduled races
pub struct RaceLedger {
    races: Ledger<RaceRecord>,
    scheduled: Ledger<ScheduledRace>,
    weights: RatingWeights,
    store: Arc<dyn StateStore>,
}

impl RaceLedger {
    /// Load both collections through the given persistence handle
    pub fn load(store: Arc<dyn StateStore>, weights: RatingWeights) -> Result<Self> {
        weights.validate()?;
        let races = store.load_races()?;
        let scheduled = store.load_scheduled()?;
        Ok(Self {
            races,
            scheduled,
            weights,
            store,
        })
    }

    pub fn weights(&self) -> &RatingWeights {
        &self.weights
    }

    pub fn races(&self) -> &BTreeMap<RaceId, RaceRecord> {
        &self.races.entries
    }

    pub fn scheduled(&self) -> &BTreeMap<ScheduledRaceId, ScheduledRace> {
        &self.scheduled.entries
    }

    pub fn get_race(&self, race_id: &str) -> Result<&RaceRecord> {
        self.races.entries.get(race_id).ok_or_else(|| {
            LedgerError::RaceNotFound {
                race_id: race_id.to_string(),
            }
            .into()
        })
    }

    /// Score a race, apply its deltas, and record it permanently
    pub fn record_race(
        &mut self,
        players: &mut PlayerStore,
        name: &str,
        mut results: Vec<(PlayerTag, Position)>,
        is_match: bool,
    ) -> Result<(RaceId, RaceOutcome)> {
        let outcome = score_race(players, &results, &self.weights, is_match)?;
        players.apply_race(&outcome.deltas)?;

        results.sort_by_key(|(_, position)| position.sort_key());
        let record = RaceRecord {
            name: name.to_string(),
            date: current_timestamp(),
            results,
            elo_changes: outcome.deltas.clone(),
            is_match,
            scheduled_date: None,
            participants: None,
        };

        let mut staged = self.races.clone();
        let race_id = staged.generate_id("race");
        staged.entries.insert(race_id.clone(), record);

        if let Err(err) = self.store.save_races(&staged) {
            roll_back_players(players, &outcome.deltas);
            return Err(err);
        }
        self.races = staged;

        info!(
            "Recorded race '{}' as {} ({} entrants)",
            name, race_id, outcome.field_size
        );
        Ok((race_id, outcome))
    }

    /// Delete a race, reverting every delta it applied
    ///
    /// Reversal is the additive inverse of the recorded delta map, not a
    /// recomputation. Reverting races out of the order they were applied
    /// keeps ratings arithmetically consistent but can leave a league value
    /// that never actually held.
    pub fn delete_race(&mut self, players: &mut PlayerStore, race_id: &str) -> Result<()> {
        let deltas = self.get_race(race_id)?.elo_changes.clone();
        players.revert_race(&deltas)?;

        let mut staged = self.races.clone();
        staged.entries.remove(race_id);

        if let Err(err) = self.store.save_races(&staged) {
            if let Err(reapply_err) = players.apply_race(&deltas) {
                error!(
                    "Failed to restore player deltas after race deletion flush failure: {}",
                    reapply_err
                );
            }
            return Err(err);
        }
        self.races = staged;

        info!("Deleted race {} and reverted its rating changes", race_id);
        Ok(())
    }

    /// Create a scheduled race; every participant must already exist
    pub fn schedule(
        &mut self,
        players: &PlayerStore,
        name: &str,
        participants: Vec<PlayerTag>,
        is_match: bool,
        scheduled_date: Option<DateTime<Utc>>,
    ) -> Result<ScheduledRaceId> {
        if participants.is_empty() {
            return Err(LedgerError::EmptyParticipants.into());
        }
        for tag in &participants {
            if !players.contains(tag) {
                return Err(LedgerError::PlayerNotFound { tag: tag.clone() }.into());
            }
        }

        let now = current_timestamp();
        let record = ScheduledRace {
            name: name.to_string(),
            participants,
            is_match,
            scheduled_date: scheduled_date.unwrap_or(now),
            created_date: now,
            status: ScheduledStatus::Scheduled,
        };

        let mut staged = self.scheduled.clone();
        let race_id = staged.generate_id("scheduled");
        staged.entries.insert(race_id.clone(), record);

        self.store.save_scheduled(&staged)?;
        self.scheduled = staged;

        info!("Scheduled race '{}' as {}", name, race_id);
        Ok(race_id)
    }

    /// Complete a scheduled race: score it with its stored match type,
    /// convert it into a permanent race, and consume the scheduled entry
    ///
    /// This transition is one-way; the scheduled record cannot be recovered.
    pub fn complete_scheduled(
        &mut self,
        players: &mut PlayerStore,
        race_id: &str,
        mut results: Vec<(PlayerTag, Position)>,
    ) -> Result<(RaceId, RaceOutcome)> {
        let scheduled = self
            .scheduled
            .entries
            .get(race_id)
            .cloned()
            .ok_or_else(|| LedgerError::ScheduledRaceNotFound {
                race_id: race_id.to_string(),
            })?;

        let outcome = score_race(players, &results, &self.weights, scheduled.is_match)?;
        players.apply_race(&outcome.deltas)?;

        results.sort_by_key(|(_, position)| position.sort_key());
        let record = RaceRecord {
            name: scheduled.name.clone(),
            date: current_timestamp(),
            results,
            elo_changes: outcome.deltas.clone(),
            is_match: scheduled.is_match,
            scheduled_date: Some(scheduled.scheduled_date),
            participants: Some(scheduled.participants.clone()),
        };

        let mut staged_races = self.races.clone();
        let completed_id = staged_races.generate_id("race");
        staged_races.entries.insert(completed_id.clone(), record);

        if let Err(err) = self.store.save_races(&staged_races) {
            roll_back_players(players, &outcome.deltas);
            return Err(err);
        }

        let mut staged_scheduled = self.scheduled.clone();
        staged_scheduled.entries.remove(race_id);

        if let Err(err) = self.store.save_scheduled(&staged_scheduled) {
            // Undo the race record we just flushed, then the player deltas
            if let Err(restore_err) = self.store.save_races(&self.races) {
                error!(
                    "Failed to restore race collection after scheduled flush failure: {}",
                    restore_err
                );
            }
            roll_back_players(players, &outcome.deltas);
            return Err(err);
        }

        self.races = staged_races;
        self.scheduled = staged_scheduled;

        info!(
            "Completed scheduled race {} as {} ('{}')",
            race_id, completed_id, scheduled.name
        );
        Ok((completed_id, outcome))
    }
}

fn roll_back_players(players: &mut PlayerStore, deltas: &DeltaMap) {
    if let Err(err) = players.revert_race(deltas) {
        error!(
            "Failed to roll back player deltas after flush failure: {}",
            err
        );
    }
}
