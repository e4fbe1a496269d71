//! Error types for the rating ledger
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ledger scenarios
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Player already exists: {tag}")]
    DuplicatePlayer { tag: String },

    #[error("Player not found: {tag}")]
    PlayerNotFound { tag: String },

    #[error("Race not found: {race_id}")]
    RaceNotFound { race_id: String },

    #[error("Scheduled race not found: {race_id}")]
    ScheduledRaceNotFound { race_id: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Invalid world rank: {rank} (must be positive)")]
    InvalidWorldRank { rank: i64 },

    #[error("Participant list is empty")]
    EmptyParticipants,

    #[error("Match already completed: {match_id}")]
    AlreadyCompleted { match_id: String },

    #[error("Player listed more than once in race results: {tag}")]
    DuplicateEntrant { tag: String },

    #[error("Race needs at least 2 resolved entrants, got {found}")]
    InsufficientField { found: usize },

    #[error("Internal ledger error: {message}")]
    Internal { message: String },
}
