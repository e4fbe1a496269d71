//! State persistence interface and implementations
//!
//! This module defines the interface for persisting and loading the four
//! ledger collections, with an on-disk JSON implementation, an ephemeral
//! in-memory implementation, and a mock for testing.

use crate::error::{LedgerError, Result};
use crate::types::{Ledger, MatchRecord, Player, PlayerTag, RaceRecord, ScheduledRace};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Trait for persisting the ledger collections
///
/// Every save is a full synchronous flush of the collection; callers commit
/// their in-memory mutation only after the flush succeeds.
pub trait StateStore: Send + Sync {
    fn load_players(&self) -> Result<BTreeMap<PlayerTag, Player>>;
    fn save_players(&self, players: &BTreeMap<PlayerTag, Player>) -> Result<()>;

    fn load_races(&self) -> Result<Ledger<RaceRecord>>;
    fn save_races(&self, races: &Ledger<RaceRecord>) -> Result<()>;

    fn load_scheduled(&self) -> Result<Ledger<ScheduledRace>>;
    fn save_scheduled(&self, scheduled: &Ledger<ScheduledRace>) -> Result<()>;

    fn load_matches(&self) -> Result<Ledger<MatchRecord>>;
    fn save_matches(&self, matches: &Ledger<MatchRecord>) -> Result<()>;
}

/// On-disk store keeping one pretty-printed JSON document per collection
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the given data directory, creating it if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn load_doc<T: DeserializeOwned + Default>(&self, file_name: &str) -> Result<T> {
        let path = self.dir.join(file_name);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            // First run: the collection simply does not exist yet
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save_doc<T: Serialize>(&self, file_name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file_name);
        let tmp = self.dir.join(format!("{}.tmp", file_name));
        let contents = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn load_players(&self) -> Result<BTreeMap<PlayerTag, Player>> {
        self.load_doc("players.json")
    }

    fn save_players(&self, players: &BTreeMap<PlayerTag, Player>) -> Result<()> {
        self.save_doc("players.json", players)
    }

    fn load_races(&self) -> Result<Ledger<RaceRecord>> {
        self.load_doc("races.json")
    }

    fn save_races(&self, races: &Ledger<RaceRecord>) -> Result<()> {
        self.save_doc("races.json", races)
    }

    fn load_scheduled(&self) -> Result<Ledger<ScheduledRace>> {
        self.load_doc("scheduled_races.json")
    }

    fn save_scheduled(&self, scheduled: &Ledger<ScheduledRace>) -> Result<()> {
        self.save_doc("scheduled_races.json", scheduled)
    }

    fn load_matches(&self) -> Result<Ledger<MatchRecord>> {
        self.load_doc("matches.json")
    }

    fn save_matches(&self, matches: &Ledger<MatchRecord>) -> Result<()> {
        self.save_doc("matches.json", matches)
    }
}

fn lock_error(what: &str) -> anyhow::Error {
    LedgerError::Internal {
        message: format!("Failed to acquire {} lock", what),
    }
    .into()
}

/// Ephemeral in-memory store, useful for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    players: RwLock<BTreeMap<PlayerTag, Player>>,
    races: RwLock<Ledger<RaceRecord>>,
    scheduled: RwLock<Ledger<ScheduledRace>>,
    matches: RwLock<Ledger<MatchRecord>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn load_players(&self) -> Result<BTreeMap<PlayerTag, Player>> {
        Ok(self.players.read().map_err(|_| lock_error("players"))?.clone())
    }

    fn save_players(&self, players: &BTreeMap<PlayerTag, Player>) -> Result<()> {
        *self.players.write().map_err(|_| lock_error("players"))? = players.clone();
        Ok(())
    }

    fn load_races(&self) -> Result<Ledger<RaceRecord>> {
        Ok(self.races.read().map_err(|_| lock_error("races"))?.clone())
    }

    fn save_races(&self, races: &Ledger<RaceRecord>) -> Result<()> {
        *self.races.write().map_err(|_| lock_error("races"))? = races.clone();
        Ok(())
    }

    fn load_scheduled(&self) -> Result<Ledger<ScheduledRace>> {
        Ok(self
            .scheduled
            .read()
            .map_err(|_| lock_error("scheduled"))?
            .clone())
    }

    fn save_scheduled(&self, scheduled: &Ledger<ScheduledRace>) -> Result<()> {
        *self.scheduled.write().map_err(|_| lock_error("scheduled"))? = scheduled.clone();
        Ok(())
    }

    fn load_matches(&self) -> Result<Ledger<MatchRecord>> {
        Ok(self.matches.read().map_err(|_| lock_error("matches"))?.clone())
    }

    fn save_matches(&self, matches: &Ledger<MatchRecord>) -> Result<()> {
        *self.matches.write().map_err(|_| lock_error("matches"))? = matches.clone();
        Ok(())
    }
}

/// Mock store for testing: records saves and can fail on demand
#[derive(Debug, Default)]
pub struct MockStateStore {
    inner: InMemoryStateStore,
    save_log: RwLock<Vec<&'static str>>,
    fail_saves: AtomicBool,
    failing_collections: RwLock<Vec<&'static str>>,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail with an I/O-style error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make saves of one collection ("players", "races", "scheduled",
    /// "matches") fail while the others keep working
    pub fn fail_collection(&self, collection: &'static str) {
        if let Ok(mut failing) = self.failing_collections.write() {
            failing.push(collection);
        }
    }

    /// Clear any per-collection failure injection
    pub fn heal_collections(&self) {
        if let Ok(mut failing) = self.failing_collections.write() {
            failing.clear();
        }
    }

    /// Get the sequence of collections saved so far (for testing)
    pub fn save_log(&self) -> Vec<&'static str> {
        self.save_log
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Clear the recorded save log (for testing)
    pub fn clear_save_log(&self) {
        if let Ok(mut log) = self.save_log.write() {
            log.clear();
        }
    }

    fn record_save(&self, collection: &'static str) -> Result<()> {
        let fail_this = self
            .failing_collections
            .read()
            .map(|failing| failing.contains(&collection))
            .unwrap_or(false);
        if self.fail_saves.load(Ordering::SeqCst) || fail_this {
            return Err(LedgerError::Internal {
                message: format!("Injected save failure for {}", collection),
            }
            .into());
        }

        if let Ok(mut log) = self.save_log.write() {
            log.push(collection);
        }
        Ok(())
    }
}

impl StateStore for MockStateStore {
    fn load_players(&self) -> Result<BTreeMap<PlayerTag, Player>> {
        self.inner.load_players()
    }

    fn save_players(&self, players: &BTreeMap<PlayerTag, Player>) -> Result<()> {
        self.record_save("players")?;
        self.inner.save_players(players)
    }

    fn load_races(&self) -> Result<Ledger<RaceRecord>> {
        self.inner.load_races()
    }

    fn save_races(&self, races: &Ledger<RaceRecord>) -> Result<()> {
        self.record_save("races")?;
        self.inner.save_races(races)
    }

    fn load_scheduled(&self) -> Result<Ledger<ScheduledRace>> {
        self.inner.load_scheduled()
    }

    fn save_scheduled(&self, scheduled: &Ledger<ScheduledRace>) -> Result<()> {
        self.record_save("scheduled")?;
        self.inner.save_scheduled(scheduled)
    }

    fn load_matches(&self) -> Result<Ledger<MatchRecord>> {
        self.inner.load_matches()
    }

    fn save_matches(&self, matches: &Ledger<MatchRecord>) -> Result<()> {
        self.record_save("matches")?;
        self.inner.save_matches(matches)
    }
}
