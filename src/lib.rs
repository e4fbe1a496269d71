//! Paddock - Rating engine and standings tracker for competitive racing
//!
//! This crate tracks skill ratings for a racing league: players are seeded
//! from their world ranking, every race moves ratings through a pairwise
//! comparative formula, and races, scheduled races, and multi-race matches
//! are persisted with their rating deltas so standings survive restarts and
//! any race or match can be reverted.

pub mod config;
pub mod error;
pub mod ledger;
pub mod rating;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LedgerError, Result};
pub use types::*;

// Re-export key components
pub use ledger::{MatchLifecycle, RaceLedger};
pub use store::{JsonFileStore, PlayerStore, StateStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
