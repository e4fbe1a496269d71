//! Rating model for competitive racing

pub mod model;

pub use model::{classify_league, update_rating, world_rank_to_rating, RatingWeights};
