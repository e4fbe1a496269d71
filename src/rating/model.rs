//! Comparative rating model for multi-entrant races
//!
//! This module provides the pure rating math: seeding an initial rating from a
//! player's world ranking, classifying ratings into leagues, and the pairwise
//! comparative update applied after every race. No state, no I/O.

use crate::error::{LedgerError, Result};
use crate::types::League;
use serde::{Deserialize, Serialize};

/// Lowest rating a seeded player can receive
pub const RATING_FLOOR: f64 = 800.0;

/// Rating assigned to the world number one
pub const RATING_CEILING: f64 = 4500.0;

/// Assumed size of the ranked population, used to scale the seed curve
pub const POPULATION_CEILING: f64 = 100_000.0;

/// Minimum rating for the Master league (inclusive)
pub const MASTER_THRESHOLD: f64 = 3000.0;

/// Minimum rating for the Champion league (inclusive)
pub const CHAMPION_THRESHOLD: f64 = 1701.0;

/// Weights for the comparative update formula
///
/// Ranked matches move ratings twice as hard as scrimmages (K) and carry the
/// extra placement bonus (M).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingWeights {
    pub k_match: f64,
    pub k_scrim: f64,
    pub m_match: f64,
    pub m_scrim: f64,
    /// Elo expected-score scale
    pub scale: f64,
}

impl Default for RatingWeights {
    fn default() -> Self {
        Self {
            k_match: 32.0,
            k_scrim: 16.0,
            m_match: 1.0,
            m_scrim: 0.0,
            scale: 400.0,
        }
    }
}

impl RatingWeights {
    /// Validate weight parameters
    pub fn validate(&self) -> Result<()> {
        if self.k_match <= 0.0 || self.k_scrim <= 0.0 {
            return Err(LedgerError::Internal {
                message: "K factors must be positive".to_string(),
            }
            .into());
        }

        if self.scale <= 0.0 {
            return Err(LedgerError::Internal {
                message: "Expected-score scale must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Seed an initial rating from a world ranking
///
/// Logarithmic interpolation between the ceiling (rank 1) and the floor
/// (population ceiling), clamped at the floor and rounded to whole points.
/// Monotonically non-increasing in rank. Fails for rank 0, where the
/// logarithm is undefined.
pub fn world_rank_to_rating(world_rank: u32) -> Result<f64> {
    if world_rank == 0 {
        return Err(LedgerError::InvalidWorldRank { rank: 0 }.into());
    }

    let ratio = (world_rank as f64).ln() / POPULATION_CEILING.ln();
    let rating = RATING_CEILING - ratio * (RATING_CEILING - RATING_FLOOR);

    Ok(rating.max(RATING_FLOOR).round())
}

/// Classify a rating into its league tier
///
/// Pure step function with inclusive lower bounds and no hysteresis.
pub fn classify_league(rating: f64) -> League {
    if rating >= MASTER_THRESHOLD {
        League::Master
    } else if rating >= CHAMPION_THRESHOLD {
        League::Champion
    } else {
        League::Academy
    }
}

/// Elo expected score of `player` against a single `opponent`
pub fn expected_score(player: f64, opponent: f64, scale: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - player) / scale))
}

/// Comparative rating update for one entrant of a single race
///
/// `effective_position` is the entrant's finish rank with DNF already mapped
/// to the field size by the caller. `field_size` must be at least 2; a
/// single-entrant race is rejected upstream before this is reached.
///
/// The teammate term exists for team-based extensions and contributes nothing
/// when `teammate_ratings` is empty, which is always the case for individual
/// racing. Returns the full-precision new rating; callers must not round
/// intermediate values.
pub fn update_rating(
    current_rating: f64,
    weights: &RatingWeights,
    is_match: bool,
    effective_position: u32,
    field_size: usize,
    opponent_ratings: &[f64],
    teammate_ratings: &[f64],
) -> f64 {
    let k = if is_match {
        weights.k_match
    } else {
        weights.k_scrim
    };
    let m = if is_match {
        weights.m_match
    } else {
        weights.m_scrim
    };

    let d = field_size as f64;
    let r = effective_position as f64;
    let d_opponents = opponent_ratings.len() as f64;

    let first_term = (d_opponents + m) * (d - r) / (d - 1.0);

    let opponent_sum: f64 = opponent_ratings
        .iter()
        .map(|opponent| expected_score(current_rating, *opponent, weights.scale))
        .sum();

    let teammate_term = if teammate_ratings.is_empty() {
        0.0
    } else {
        let teammate_sum: f64 = teammate_ratings
            .iter()
            .map(|teammate| expected_score(current_rating, *teammate, weights.scale))
            .sum();
        teammate_sum / teammate_ratings.len() as f64
    };

    current_rating + k * (first_term - opponent_sum - teammate_term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_world_rank_one_gets_ceiling() {
        assert_eq!(world_rank_to_rating(1).unwrap(), RATING_CEILING);
    }

    #[test]
    fn test_world_rank_rejects_zero() {
        assert!(world_rank_to_rating(0).is_err());
    }

    #[test]
    fn test_world_rank_clamps_at_floor() {
        // Population ceiling lands exactly on the floor; anything beyond
        // stays clamped there.
        assert_eq!(world_rank_to_rating(100_000).unwrap(), RATING_FLOOR);
        assert_eq!(world_rank_to_rating(5_000_000).unwrap(), RATING_FLOOR);
    }

    #[test]
    fn test_world_rank_sample_curve() {
        let top_ten = world_rank_to_rating(10).unwrap();
        let top_thousand = world_rank_to_rating(1_000).unwrap();
        let mid_field = world_rank_to_rating(50_000).unwrap();

        assert!(top_ten > top_thousand);
        assert!(top_thousand > mid_field);
        assert!(mid_field > RATING_FLOOR);
    }

    #[test]
    fn test_league_boundaries() {
        assert_eq!(classify_league(1700.0), League::Academy);
        assert_eq!(classify_league(1701.0), League::Champion);
        assert_eq!(classify_league(2999.0), League::Champion);
        assert_eq!(classify_league(3000.0), League::Master);
        assert_eq!(classify_league(RATING_FLOOR), League::Academy);
        assert_eq!(classify_league(RATING_CEILING), League::Master);
    }

    #[test]
    fn test_expected_scores_sum_to_one() {
        let e_strong = expected_score(2000.0, 1800.0, 400.0);
        let e_weak = expected_score(1800.0, 2000.0, 400.0);

        assert!((e_strong + e_weak - 1.0).abs() < 1e-12);
        assert!(e_strong > 0.5);
    }

    #[test]
    fn test_head_to_head_match_winner_gains_loser_loses() {
        let weights = RatingWeights::default();

        let winner = update_rating(2000.0, &weights, true, 1, 2, &[1800.0], &[]);
        let loser = update_rating(1800.0, &weights, true, 2, 2, &[2000.0], &[]);

        let expected_win = expected_score(2000.0, 1800.0, 400.0);
        assert!(winner > 2000.0);
        assert!(loser < 1800.0);
        assert!((winner - (2000.0 + 32.0 * (2.0 - expected_win))).abs() < 1e-9);
        assert!((loser - (1800.0 - 32.0 * (1.0 - expected_win))).abs() < 1e-9);
    }

    #[test]
    fn test_head_to_head_scrimmage_is_zero_sum() {
        // With M = 0 the first term reduces to the classic Elo score, so a
        // two-entrant scrimmage transfers exactly what the loser gives up.
        let weights = RatingWeights::default();

        let winner_delta = update_rating(2000.0, &weights, false, 1, 2, &[1800.0], &[]) - 2000.0;
        let loser_delta = update_rating(1800.0, &weights, false, 2, 2, &[2000.0], &[]) - 1800.0;

        assert!(winner_delta > 0.0);
        assert!((winner_delta + loser_delta).abs() < 1e-9);
    }

    #[test]
    fn test_last_place_has_zero_first_term() {
        let weights = RatingWeights::default();
        let opponents = [1500.0, 1500.0, 1500.0];

        // R = D zeroes the placement term, leaving only the expected-score
        // penalty against the field.
        let updated = update_rating(1500.0, &weights, true, 4, 4, &opponents, &[]);
        let penalty: f64 = opponents
            .iter()
            .map(|o| expected_score(1500.0, *o, weights.scale))
            .sum();

        assert!((updated - (1500.0 - 32.0 * penalty)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_teammates_contribute_nothing() {
        let weights = RatingWeights::default();

        let without = update_rating(1900.0, &weights, true, 2, 4, &[2000.0, 1800.0, 1700.0], &[]);
        // A teammate at the player's own rating contributes an expected score
        // of 0.5, shifting the result; absence of teammates must not.
        let with = update_rating(
            1900.0,
            &weights,
            true,
            2,
            4,
            &[2000.0, 1800.0, 1700.0],
            &[1900.0],
        );

        assert!((without - with - 32.0 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_weights_validation() {
        assert!(RatingWeights::default().validate().is_ok());

        let bad_k = RatingWeights {
            k_match: 0.0,
            ..RatingWeights::default()
        };
        assert!(bad_k.validate().is_err());

        let bad_scale = RatingWeights {
            scale: -400.0,
            ..RatingWeights::default()
        };
        assert!(bad_scale.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_seed_rating_monotonic_in_rank(better in 1u32..5_000_000, worse in 1u32..5_000_000) {
            prop_assume!(better < worse);
            let higher = world_rank_to_rating(better).unwrap();
            let lower = world_rank_to_rating(worse).unwrap();
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_seed_rating_stays_in_bounds(rank in 1u32..u32::MAX) {
            let rating = world_rank_to_rating(rank).unwrap();
            prop_assert!(rating >= RATING_FLOOR);
            prop_assert!(rating <= RATING_CEILING);
        }

        #[test]
        fn prop_league_matches_thresholds(rating in 0.0f64..6000.0) {
            let league = classify_league(rating);
            match league {
                League::Master => prop_assert!(rating >= MASTER_THRESHOLD),
                League::Champion => {
                    prop_assert!(rating >= CHAMPION_THRESHOLD && rating < MASTER_THRESHOLD)
                }
                League::Academy => prop_assert!(rating < CHAMPION_THRESHOLD),
            }
        }
    }
}
