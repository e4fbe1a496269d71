//! Player ownership and state persistence

pub mod players;
pub mod state;

pub use players::PlayerStore;
pub use state::{InMemoryStateStore, JsonFileStore, MockStateStore, StateStore};
