//! Command-line entry point for the paddock rating ledger
//!
//! Thin presentation layer over the library: parses arguments, initializes
//! logging and storage, and dispatches to the core operations. All business
//! logic lives in the library crate.

use anyhow::Result;
use clap::{Parser, Subcommand};
use paddock::config::AppConfig;
use paddock::ledger::{MatchLifecycle, RaceLedger};
use paddock::store::{JsonFileStore, PlayerStore, StateStore};
use paddock::types::{League, PlayerTag, Position};
use paddock::utils::display_rating;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Paddock - rating engine and standings tracker for competitive racing
#[derive(Parser)]
#[command(
    name = "paddock",
    version,
    about = "Track ratings, races, and matches for a competitive racing league"
)]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new player seeded from their world ranking
    AddPlayer {
        tag: String,
        /// Positive world rank (1 = best)
        world_rank: u32,
    },
    /// Show all players sorted by current rating
    Standings,
    /// Record a standalone race and apply its rating changes
    Race {
        name: String,
        /// Entrant results as TAG=POSITION or TAG=dnf (repeatable)
        #[arg(short, long = "result", value_name = "TAG=POS", required = true)]
        results: Vec<String>,
        /// Score with scrimmage weights instead of match weights
        #[arg(long)]
        scrimmage: bool,
    },
    /// Delete a recorded race and revert its rating changes
    DeleteRace { race_id: String },
    /// Show the race history
    History,
    /// Create a scheduled race
    Schedule {
        name: String,
        /// Participant tag (repeatable)
        #[arg(short, long = "participant", value_name = "TAG", required = true)]
        participants: Vec<String>,
        #[arg(long)]
        scrimmage: bool,
        /// Scheduled date (RFC 3339); defaults to now
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// List scheduled races
    Scheduled,
    /// Complete a scheduled race with results
    Complete {
        race_id: String,
        #[arg(short, long = "result", value_name = "TAG=POS", required = true)]
        results: Vec<String>,
    },
    /// Create a multi-race match (5 races) or scrimmage (3 races)
    CreateMatch {
        name: String,
        #[arg(short, long = "participant", value_name = "TAG", required = true)]
        participants: Vec<String>,
        /// League tag for the match (master, champion, academy)
        #[arg(long, default_value = "champion")]
        league: String,
        #[arg(long)]
        scrimmage: bool,
    },
    /// Submit the next race of a match
    MatchRace {
        match_id: String,
        track: String,
        #[arg(short, long = "result", value_name = "TAG=POS", required = true)]
        results: Vec<String>,
    },
    /// Delete a match and revert all of its races
    DeleteMatch { match_id: String },
    /// List matches and their progress
    Matches,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn parse_result(entry: &str) -> Result<(PlayerTag, Position)> {
    let (tag, position) = entry
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected TAG=POSITION, got '{}'", entry))?;

    let position = if position.eq_ignore_ascii_case("dnf") {
        Position::DidNotFinish
    } else {
        Position::Ranked(position.parse()?)
    };
    Ok((tag.to_string(), position))
}

fn parse_results(entries: &[String]) -> Result<Vec<(PlayerTag, Position)>> {
    entries.iter().map(|entry| parse_result(entry)).collect()
}

fn parse_league(value: &str) -> Result<League> {
    match value.to_ascii_lowercase().as_str() {
        "master" => Ok(League::Master),
        "champion" => Ok(League::Champion),
        "academy" => Ok(League::Academy),
        other => Err(anyhow::anyhow!("Unknown league: {}", other)),
    }
}

fn report_skipped(skipped: &[PlayerTag]) {
    for tag in skipped {
        warn!("Entrant {} is not registered and was skipped", tag);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(log_level) = args.log_level {
        config.service.log_level = log_level;
        config.validate()?;
    }

    init_logging(&config.service.log_level)?;

    let store: Arc<dyn StateStore> = Arc::new(JsonFileStore::new(&config.storage.data_dir)?);
    let mut players = PlayerStore::load(store.clone())?;
    let mut races = RaceLedger::load(store.clone(), config.rating.clone())?;
    let mut matches = MatchLifecycle::load(store, config.rating.clone())?;

    match args.command {
        Command::AddPlayer { tag, world_rank } => {
            let player = players.add(&tag, world_rank)?;
            println!(
                "Added {}: world rank #{} -> {} ({})",
                tag,
                world_rank,
                display_rating(player.initial_elo),
                player.league
            );
        }
        Command::Standings => {
            if players.players().is_empty() {
                println!("No players registered yet.");
            }
            for (tag, player) in players.standings() {
                println!(
                    "{:<15} | Rank: #{:<6} | Elo: {:>4} | {} ({} races)",
                    tag,
                    player.world_rank,
                    display_rating(player.current_elo),
                    player.league,
                    player.races_played
                );
            }
        }
        Command::Race {
            name,
            results,
            scrimmage,
        } => {
            let results = parse_results(&results)?;
            let (race_id, outcome) =
                races.record_race(&mut players, &name, results, !scrimmage)?;
            report_skipped(&outcome.skipped);
            println!("Recorded '{}' as {}:", name, race_id);
            for (tag, delta) in &outcome.deltas {
                println!(
                    "  {:<15} {:+.1} -> {}",
                    tag,
                    delta,
                    display_rating(players.get(tag)?.current_elo)
                );
            }
        }
        Command::DeleteRace { race_id } => {
            races.delete_race(&mut players, &race_id)?;
            println!("Deleted {} and reverted its rating changes.", race_id);
        }
        Command::History => {
            if races.races().is_empty() {
                println!("No races recorded yet.");
            }
            for (race_id, record) in races.races() {
                let kind = if record.is_match { "match" } else { "scrimmage" };
                println!(
                    "{} '{}' ({}, {})",
                    race_id,
                    record.name,
                    kind,
                    record.date.format("%Y-%m-%d")
                );
                for (tag, position) in &record.results {
                    let delta = record.elo_changes.get(tag).copied().unwrap_or(0.0);
                    println!("  {}. {} ({:+.0})", position, tag, delta);
                }
            }
        }
        Command::Schedule {
            name,
            participants,
            scrimmage,
            date,
        } => {
            let scheduled_date = match date {
                Some(raw) => Some(raw.parse()?),
                None => None,
            };
            let race_id =
                races.schedule(&players, &name, participants, !scrimmage, scheduled_date)?;
            println!("Scheduled '{}' as {}.", name, race_id);
        }
        Command::Scheduled => {
            if races.scheduled().is_empty() {
                println!("No scheduled races.");
            }
            for (race_id, record) in races.scheduled() {
                println!(
                    "{} '{}' on {} ({})",
                    race_id,
                    record.name,
                    record.scheduled_date.format("%Y-%m-%d"),
                    record.participants.join(", ")
                );
            }
        }
        Command::Complete { race_id, results } => {
            let results = parse_results(&results)?;
            let (completed_id, outcome) =
                races.complete_scheduled(&mut players, &race_id, results)?;
            report_skipped(&outcome.skipped);
            println!("Completed {} as {}.", race_id, completed_id);
        }
        Command::CreateMatch {
            name,
            participants,
            league,
            scrimmage,
        } => {
            let league = parse_league(&league)?;
            let match_id = matches.create(&name, participants, league, !scrimmage)?;
            let record = matches.get_match(&match_id)?;
            println!(
                "Created {} '{}' as {} ({} races).",
                if record.is_match { "match" } else { "scrimmage" },
                name,
                match_id,
                record.num_races
            );
        }
        Command::MatchRace {
            match_id,
            track,
            results,
        } => {
            let results = parse_results(&results)?;
            let (status, outcome) =
                matches.submit_race(&mut players, &match_id, &track, results)?;
            report_skipped(&outcome.skipped);
            let record = matches.get_match(&match_id)?;
            println!(
                "Added '{}' to {} ({}/{} races, {}).",
                track,
                match_id,
                record.races.len(),
                record.num_races,
                status
            );
        }
        Command::DeleteMatch { match_id } => {
            matches.delete(&mut players, &match_id)?;
            println!("Deleted {} and reverted all of its races.", match_id);
        }
        Command::Matches => {
            if matches.matches().is_empty() {
                println!("No matches yet.");
            }
            for (match_id, record) in matches.matches() {
                let kind = if record.is_match { "match" } else { "scrimmage" };
                println!(
                    "{} '{}' ({}, {} league): {}/{} races, {}",
                    match_id,
                    record.name,
                    kind,
                    record.league,
                    record.races.len(),
                    record.num_races,
                    record.status
                );
            }
        }
    }

    Ok(())
}
