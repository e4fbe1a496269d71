//! Utility functions for the rating ledger

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round a full-precision rating to whole points for display
pub fn display_rating(rating: f64) -> i64 {
    rating.round() as i64
}
