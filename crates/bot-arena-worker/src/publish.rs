//! Writes announced results to disk.
//!
//! Each announced day produces `announcements/<date>.json` with the full
//! [`Announcement`] and one PGN file per game under `games/<date>/`.

use anyhow::{Context, Result};
use bot_arena::pgn::write_pgn;
use bot_arena::results::{Announcement, LeaderboardEntry};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

fn day(announcement: &Announcement) -> String {
    announcement.date.format("%Y-%m-%d").to_string()
}

/// Writes the announcement as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_announcement(data_dir: &Path, announcement: &Announcement) -> Result<PathBuf> {
    let dir = data_dir.join("announcements");
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{}.json", day(announcement)));
    let json = serde_json::to_string_pretty(announcement)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Writes every game of the announcement as PGN.
///
/// # Errors
///
/// Returns an error if a file cannot be written.
pub fn write_games(data_dir: &Path, announcement: &Announcement) -> Result<Vec<PathBuf>> {
    let dir = data_dir.join("games").join(day(announcement));
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut paths = Vec::with_capacity(announcement.games.len());
    for (i, report) in announcement.games.iter().enumerate() {
        let game = &report.game;
        let path = dir.join(format!("{:02}-{}-vs-{}.pgn", i + 1, game.white, game.black));
        write_pgn(&path, game, announcement.date)
            .with_context(|| format!("writing {}", path.display()))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Renders the leaderboard as a plain text table.
pub fn leaderboard_table(entries: &[LeaderboardEntry]) -> String {
    let width = entries
        .iter()
        .map(|e| e.bot.len())
        .max()
        .unwrap_or(0)
        .max(3);
    let mut table = String::new();
    let _ = writeln!(
        table,
        "{:>4}  {:<width$}  {:>7}  {:>7}",
        "#", "Bot", "Match", "Puzzle"
    );
    for entry in entries {
        let _ = writeln!(
            table,
            "{:>4}  {:<width$}  {:>7.1}  {:>7.1}",
            entry.rank, entry.bot, entry.match_rating, entry.puzzle_rating
        );
    }
    table
}
