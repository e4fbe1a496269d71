//! Multi-race match lifecycle
//!
//! A match is a fixed bundle of sequential races between one participant set:
//! five races for a ranked match, three for a scrimmage. Sub-races are scored
//! and applied to the player store immediately as they are submitted; the
//! match is deliberately not atomic, and deleting it is the way to undo a
//! partially played one.

use crate::error::{LedgerError, Result};
use crate::ledger::races::{score_race, RaceOutcome};
use crate::rating::RatingWeights;
use crate::store::{PlayerStore, StateStore};
use crate::types::{
    Ledger, League, MatchId, MatchRecord, MatchStatus, PlayerTag, Position, SubRace,
};
use crate::utils::current_timestamp;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Races a ranked match runs
pub const MATCH_RACE_COUNT: u32 = 5;

/// Races a scrimmage runs
pub const SCRIMMAGE_RACE_COUNT: u32 = 3;

/// State machine over the match collection
pub struct MatchLifecycle {
    matches: Ledger<MatchRecord>,
    weights: RatingWeights,
    store: Arc<dyn StateStore>,
}

impl MatchLifecycle {
    /// Load the match collection through the given persistence handle
    pub fn load(store: Arc<dyn StateStore>, weights: RatingWeights) -> Result<Self> {
        weights.validate()?;
        let matches = store.load_matches()?;
        Ok(Self {
            matches,
            weights,
            store,
        })
    }

    pub fn matches(&self) -> &BTreeMap<MatchId, MatchRecord> {
        &self.matches.entries
    }

    pub fn get_match(&self, match_id: &str) -> Result<&MatchRecord> {
        self.matches.entries.get(match_id).ok_or_else(|| {
            LedgerError::MatchNotFound {
                match_id: match_id.to_string(),
            }
            .into()
        })
    }

    /// Create a new in-progress match
    pub fn create(
        &mut self,
        name: &str,
        participants: Vec<PlayerTag>,
        league: League,
        is_match: bool,
    ) -> Result<MatchId> {
        if participants.is_empty() {
            return Err(LedgerError::EmptyParticipants.into());
        }

        let num_races = if is_match {
            MATCH_RACE_COUNT
        } else {
            SCRIMMAGE_RACE_COUNT
        };
        let record = MatchRecord {
            name: name.to_string(),
            participants,
            league,
            is_match,
            num_races,
            created_date: current_timestamp(),
            status: MatchStatus::InProgress,
            races: BTreeMap::new(),
            current_race: 1,
        };

        let mut staged = self.matches.clone();
        let match_id = staged.generate_id("match");
        staged.entries.insert(match_id.clone(), record);

        self.store.save_matches(&staged)?;
        self.matches = staged;

        info!(
            "Created {} '{}' as {} ({} races)",
            if is_match { "match" } else { "scrimmage" },
            name,
            match_id,
            num_races
        );
        Ok(match_id)
    }

    /// Submit the next race of a match
    ///
    /// The race is scored and its deltas committed to the player store before
    /// the match record advances; a match that fails partway has already
    /// mutated ratings for the races it did complete. Returns the match
    /// status after the submission.
    pub fn submit_race(
        &mut self,
        players: &mut PlayerStore,
        match_id: &str,
        track_name: &str,
        mut results: Vec<(PlayerTag, Position)>,
    ) -> Result<(MatchStatus, RaceOutcome)> {
        let record = self.get_match(match_id)?;
        if record.status == MatchStatus::Completed {
            return Err(LedgerError::AlreadyCompleted {
                match_id: match_id.to_string(),
            }
            .into());
        }
        let is_match = record.is_match;

        let outcome = score_race(players, &results, &self.weights, is_match)?;
        players.apply_race(&outcome.deltas)?;

        results.sort_by_key(|(_, position)| position.sort_key());
        let sub_race = SubRace {
            track: track_name.to_string(),
            results,
            elo_changes: outcome.deltas.clone(),
            date: current_timestamp(),
        };

        let mut staged = self.matches.clone();
        let staged_record = staged.entries.get_mut(match_id).ok_or_else(|| {
            LedgerError::MatchNotFound {
                match_id: match_id.to_string(),
            }
        })?;
        let race_key = format!("race_{}", staged_record.current_race);
        staged_record.races.insert(race_key, sub_race);
        staged_record.current_race += 1;
        if staged_record.current_race > staged_record.num_races {
            staged_record.status = MatchStatus::Completed;
        }
        let status = staged_record.status;

        if let Err(err) = self.store.save_matches(&staged) {
            if let Err(revert_err) = players.revert_race(&outcome.deltas) {
                error!(
                    "Failed to roll back player deltas after match flush failure: {}",
                    revert_err
                );
            }
            return Err(err);
        }
        self.matches = staged;

        info!(
            "Added race '{}' to {} (status: {})",
            track_name, match_id, status
        );
        Ok((status, outcome))
    }

    /// Delete a match, reverting every sub-race's delta map
    ///
    /// All sub-races belong to this match and the deletion is whole-match, so
    /// the revert order does not matter; the player store undoes them in one
    /// staged flush.
    pub fn delete(&mut self, players: &mut PlayerStore, match_id: &str) -> Result<()> {
        let record = self.get_match(match_id)?;
        let delta_maps: Vec<_> = record
            .races
            .values()
            .map(|sub_race| sub_race.elo_changes.clone())
            .collect();

        players.revert_races(delta_maps.iter())?;

        let mut staged = self.matches.clone();
        staged.entries.remove(match_id);

        if let Err(err) = self.store.save_matches(&staged) {
            for deltas in &delta_maps {
                if let Err(reapply_err) = players.apply_race(deltas) {
                    error!(
                        "Failed to restore player deltas after match deletion flush failure: {}",
                        reapply_err
                    );
                }
            }
            return Err(err);
        }
        self.matches = staged;

        info!(
            "Deleted match {} and reverted {} sub-races",
            match_id,
            delta_maps.len()
        );
        Ok(())
    }
}
