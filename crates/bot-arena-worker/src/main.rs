//! Bot Arena Worker - Runs the daily tournament.
//!
//! By default the worker stays up and follows the configured schedule:
//! matches and puzzles are computed once a day at `compute_at`, and the
//! results are published at `announce_at`. The `compute`, `announce` and
//! `leaderboard` subcommands run a single step by hand.

mod publish;
mod registry;

use anyhow::Context;
use bot_arena::cadence::join_compute;
use bot_arena::config::ArenaConfig;
use bot_arena::puzzles::DirectoryPuzzleSource;
use bot_arena::results::Announcement;
use bot_arena::storage::{SqliteStore, Store};
use bot_arena::CadenceController;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Bot Arena Worker - Runs the daily bot tournament.
#[derive(Parser)]
#[command(name = "bot-arena-worker")]
#[command(about = "Runs the daily bot arena schedule")]
struct Args {
    /// Path to the arena configuration
    #[arg(long, default_value = "arena.toml")]
    config: PathBuf,

    /// Path to SQLite database
    #[arg(long, default_value = "data/arena.db")]
    db: PathBuf,

    /// Directory for announcements and PGN files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the schedule until interrupted (the default)
    Run,
    /// Play one day's matches and puzzles now
    Compute {
        /// Day to compute, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Publish a computed day
    Announce {
        /// Day to announce, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the current standings
    Leaderboard,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn open_store(path: &Path) -> anyhow::Result<Arc<dyn Store>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = SqliteStore::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn publish(data_dir: &Path, announcement: &Announcement) -> anyhow::Result<()> {
    let json = publish::write_announcement(data_dir, announcement)?;
    let games = publish::write_games(data_dir, announcement)?;
    tracing::info!(
        "Published {} ({} games) to {}",
        announcement.date,
        games.len(),
        json.display()
    );
    for summary in announcement.puzzles.iter().flatten() {
        tracing::info!(
            "Puzzle {}{}: solved by {}/{}",
            summary.puzzle_id,
            if summary.daily { " (daily)" } else { "" },
            summary.solved(),
            summary.attempts.len()
        );
    }
    println!("{}", publish::leaderboard_table(&announcement.leaderboard));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let config = ArenaConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let roster = registry::build_roster(&config)?;
    tracing::info!("Roster: {}", roster.ids().join(", "));

    let store = open_store(&args.db)?;
    let mut controller =
        CadenceController::new(store, Arc::new(roster)).with_settings(config.settings());
    if let Some(dir) = &config.puzzles.dir {
        tracing::info!("Puzzles: {:?}", dir);
        controller = controller.with_puzzles(Arc::new(DirectoryPuzzleSource::new(
            dir,
            config.puzzles.bulk,
        )));
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let schedule = config.schedule.schedule()?;

            // Shutdown flag
            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_clone = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl+c: {}", e);
                    return;
                }
                tracing::info!("Shutdown signal received");
                shutdown_clone.store(true, Ordering::SeqCst);
            });

            let (tx, mut rx) = mpsc::channel::<Announcement>(8);
            let data_dir = args.data_dir.clone();
            let publisher = tokio::spawn(async move {
                while let Some(announcement) = rx.recv().await {
                    if let Err(e) = publish(&data_dir, &announcement) {
                        tracing::error!("Failed to publish {}: {:#}", announcement.date, e);
                    }
                }
            });

            controller.run(schedule, tx, shutdown).await;
            publisher.await?;
            tracing::info!("Worker shutdown complete");
        }
        Command::Compute { date } => {
            let date = date.unwrap_or_else(today);
            let record = join_compute(controller.spawn_compute(date)?).await?;
            tracing::info!(
                "Computed {}: {} games, {} byes, {} skipped",
                date,
                record.matches.len(),
                record.byes().len(),
                record.skipped.len()
            );
        }
        Command::Announce { date } => {
            let date = date.unwrap_or_else(today);
            let announcement = controller.announce(date)?;
            publish(&args.data_dir, &announcement)?;
            controller.mark_announced(date)?;
        }
        Command::Leaderboard => {
            println!("{}", publish::leaderboard_table(&controller.leaderboard()?));
        }
    }

    Ok(())
}
