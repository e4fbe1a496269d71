//! Race and match ledgers

pub mod matches;
pub mod races;

pub use matches::{MatchLifecycle, MATCH_RACE_COUNT, SCRIMMAGE_RACE_COUNT};
pub use races::{score_race, RaceLedger, RaceOutcome};
