//! Common types used throughout the rating ledger

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for players (the in-game tag)
pub type PlayerTag = String;

/// Unique identifier for recorded races
pub type RaceId = String;

/// Unique identifier for scheduled races
pub type ScheduledRaceId = String;

/// Unique identifier for matches
pub type MatchId = String;

/// Signed rating change per player, produced by processing one race
pub type DeltaMap = BTreeMap<PlayerTag, f64>;

/// Finish position of one entrant in a single race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// Finished in the given rank (1 = first place)
    Ranked(u32),
    /// Did not finish; all DNF entrants tie for last place
    DidNotFinish,
}

impl Position {
    /// Sort key that orders ranked finishes first, DNF entrants last
    pub fn sort_key(&self) -> (u8, u32) {
        match self {
            Position::Ranked(rank) => (0, *rank),
            Position::DidNotFinish => (1, 0),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Ranked(rank) => write!(f, "{}", rank),
            Position::DidNotFinish => write!(f, "DNF"),
        }
    }
}

// Serialized as a bare rank integer or the string "DNF", matching the
// on-disk results schema.
impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Position::Ranked(rank) => serializer.serialize_u32(*rank),
            Position::DidNotFinish => serializer.serialize_str("DNF"),
        }
    }
}

struct PositionVisitor;

impl<'de> Visitor<'de> for PositionVisitor {
    type Value = Position;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a finish rank integer or the string \"DNF\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Position, E> {
        u32::try_from(value)
            .map(Position::Ranked)
            .map_err(|_| E::custom(format!("finish rank out of range: {}", value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Position, E> {
        u32::try_from(value)
            .map(Position::Ranked)
            .map_err(|_| E::custom(format!("finish rank out of range: {}", value)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Position, E> {
        if value.eq_ignore_ascii_case("DNF") {
            Ok(Position::DidNotFinish)
        } else {
            Err(E::custom(format!("unknown finish position: {}", value)))
        }
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Position, D::Error> {
        deserializer.deserialize_any(PositionVisitor)
    }
}

/// Discrete skill tier derived purely from current rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum League {
    Master,
    Champion,
    Academy,
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            League::Master => write!(f, "Master"),
            League::Champion => write!(f, "Champion"),
            League::Academy => write!(f, "Academy"),
        }
    }
}

/// Player record owned by the player store
///
/// Ratings are kept at full precision; rounding to whole points happens only
/// at presentation. `initial_elo` is computed once from world rank and never
/// changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub world_rank: u32,
    pub initial_elo: f64,
    pub current_elo: f64,
    pub league: League,
    pub races_played: u32,
}

/// A permanently recorded race and the rating deltas it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceRecord {
    pub name: String,
    pub date: DateTime<Utc>,
    /// Entrants and their listed finish positions, sorted ranked-first
    pub results: Vec<(PlayerTag, Position)>,
    /// Signed rating change applied per resolved entrant; the reversal source
    pub elo_changes: DeltaMap,
    pub is_match: bool,
    /// Present when this race completed a scheduled race
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<PlayerTag>>,
}

/// Status of a scheduled race; completion removes the record entirely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledStatus {
    Scheduled,
}

/// A race that has participants and a date but no results yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledRace {
    pub name: String,
    pub participants: Vec<PlayerTag>,
    pub is_match: bool,
    pub scheduled_date: DateTime<Utc>,
    pub created_date: DateTime<Utc>,
    pub status: ScheduledStatus,
}

/// Status of a multi-race match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    InProgress,
    Completed,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::InProgress => write!(f, "in_progress"),
            MatchStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One completed race inside a match, keyed by sequence number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubRace {
    pub track: String,
    pub results: Vec<(PlayerTag, Position)>,
    pub elo_changes: DeltaMap,
    pub date: DateTime<Utc>,
}

/// A multi-race match between a fixed participant set
///
/// Sub-race deltas are applied to players immediately as each race is
/// submitted; the match is not atomic. `current_race` is the 1-based sequence
/// number of the next race to submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub name: String,
    pub participants: Vec<PlayerTag>,
    pub league: League,
    pub is_match: bool,
    /// Target race count: 5 for a match, 3 for a scrimmage
    pub num_races: u32,
    pub created_date: DateTime<Utc>,
    pub status: MatchStatus,
    pub races: BTreeMap<String, SubRace>,
    pub current_race: u32,
}

/// Persisted collection with the strictly monotonic id counter alongside it
///
/// The counter only ever increases, so a freshly generated id can never
/// collide with a previously deleted record's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger<T> {
    pub next_id: u64,
    pub entries: BTreeMap<String, T>,
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Ledger<T> {
    /// Generate the next `<prefix>_<n>` identifier, advancing the counter
    pub fn generate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_serializes_as_rank_or_dnf() {
        assert_eq!(serde_json::to_string(&Position::Ranked(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&Position::DidNotFinish).unwrap(),
            "\"DNF\""
        );
    }

    #[test]
    fn test_position_deserializes_both_forms() {
        let ranked: Position = serde_json::from_str("5").unwrap();
        assert_eq!(ranked, Position::Ranked(5));

        let dnf: Position = serde_json::from_str("\"DNF\"").unwrap();
        assert_eq!(dnf, Position::DidNotFinish);

        let lower: Position = serde_json::from_str("\"dnf\"").unwrap();
        assert_eq!(lower, Position::DidNotFinish);

        assert!(serde_json::from_str::<Position>("\"fourth\"").is_err());
    }

    #[test]
    fn test_position_sort_key_puts_dnf_last() {
        let mut results = vec![
            Position::DidNotFinish,
            Position::Ranked(2),
            Position::Ranked(1),
        ];
        results.sort_by_key(|p| p.sort_key());
        assert_eq!(
            results,
            vec![
                Position::Ranked(1),
                Position::Ranked(2),
                Position::DidNotFinish
            ]
        );
    }

    #[test]
    fn test_results_serialize_as_pairs() {
        let results: Vec<(PlayerTag, Position)> = vec![
            ("alpha".to_string(), Position::Ranked(1)),
            ("bravo".to_string(), Position::DidNotFinish),
        ];
        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(json, r#"[["alpha",1],["bravo","DNF"]]"#);
    }

    #[test]
    fn test_ledger_ids_survive_deletion() {
        let mut ledger: Ledger<u32> = Ledger::default();
        let first = ledger.generate_id("race");
        ledger.entries.insert(first.clone(), 1);
        let second = ledger.generate_id("race");
        ledger.entries.insert(second.clone(), 2);

        ledger.entries.remove(&second);
        let third = ledger.generate_id("race");

        assert_eq!(first, "race_1");
        assert_eq!(second, "race_2");
        assert_eq!(third, "race_3");
    }

    #[test]
    fn test_match_status_serialization() {
        assert_eq!(
            serde_json::to_string(&MatchStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&ScheduledStatus::Scheduled).unwrap(),
            "\"scheduled\""
        );
    }
}
