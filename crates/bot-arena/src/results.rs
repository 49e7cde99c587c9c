//! Persisted compute results and the announcement handed to presentation.
//!
//! A compute pass writes one [`ComputeRecord`] under `results/<date>`: first
//! as `Running`, then `Complete` or `Failed`. "Has today's compute run" is a
//! plain existence check on that path, and a crashed run stays visibly
//! distinct from a finished one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::elo::{RatingChange, RatingSystem};
use crate::game_runner::Game;
use crate::matchmaking::Pairing;
use crate::puzzles::{themes_path, PuzzleAttempt, PuzzleReport, ThemeStats};
use crate::storage::{StorageError, Store, StoreExt};
use crate::strategy::Roster;

/// Store path of the compute record for a date.
pub fn results_path(date: NaiveDate) -> String {
    format!("results/{}", date.format("%Y-%m-%d"))
}

/// Store path of the marker written once a date has been announced.
pub fn announced_path(date: NaiveDate) -> String {
    format!("announced/{}", date.format("%Y-%m-%d"))
}

/// State of a compute pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ComputeStatus {
    Running,
    Complete,
    Failed { reason: String },
}

/// A finished game with the rating change of both players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub game: Game,
    pub white: RatingChange,
    pub black: RatingChange,
}

/// A scheduled match that could not be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMatch {
    pub white: String,
    pub black: String,
    pub reason: String,
}

/// Everything one compute pass produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRecord {
    pub date: NaiveDate,
    pub status: ComputeStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pairings: Vec<Pairing>,
    pub matches: Vec<MatchReport>,
    pub skipped: Vec<SkippedMatch>,
    /// `None` when the puzzle phase did not run.
    pub puzzles: Option<PuzzleReport>,
    /// Standings as they were when the round finished.
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl ComputeRecord {
    /// A fresh record for a pass that just started.
    pub fn started(date: NaiveDate) -> Self {
        Self {
            date,
            status: ComputeStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            pairings: Vec::new(),
            matches: Vec::new(),
            skipped: Vec::new(),
            puzzles: None,
            leaderboard: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ComputeStatus::Complete
    }

    /// Bots that sat the round out.
    pub fn byes(&self) -> Vec<String> {
        self.pairings
            .iter()
            .filter_map(|p| match p {
                Pairing::Bye { bot } => Some(bot.clone()),
                Pairing::Match { .. } => None,
            })
            .collect()
    }
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position, by match rating.
    pub rank: usize,
    pub bot: String,
    pub creator: String,
    pub color: String,
    pub match_rating: f64,
    pub puzzle_rating: f64,
    /// All-time puzzle accuracy per theme, for themes attempted at least once.
    #[serde(default)]
    pub themes: BTreeMap<String, f64>,
}

/// Current standings of the roster, best match rating first.
///
/// Ties are broken by bot id so the order is stable.
///
/// # Errors
///
/// Returns an error if a rating or theme statistic cannot be read.
pub fn leaderboard(
    store: &dyn Store,
    roster: &Roster,
    matches: &RatingSystem<'_>,
    puzzles: &RatingSystem<'_>,
) -> Result<Vec<LeaderboardEntry>, StorageError> {
    let mut entries = roster
        .iter()
        .map(|bot| {
            let stats: BTreeMap<String, ThemeStats> =
                store.load(&themes_path(&bot.id), BTreeMap::new())?;
            Ok(LeaderboardEntry {
                rank: 0,
                bot: bot.id.clone(),
                creator: bot.creator.clone(),
                color: bot.color.clone(),
                match_rating: matches.rating(&bot.id)?,
                puzzle_rating: puzzles.rating(&bot.id)?,
                themes: stats
                    .into_iter()
                    .filter_map(|(theme, s)| s.accuracy().map(|a| (theme, a)))
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

    entries.sort_by(|a, b| {
        b.match_rating
            .total_cmp(&a.match_rating)
            .then_with(|| a.bot.cmp(&b.bot))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    Ok(entries)
}

/// Results of one puzzle across the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleSummary {
    pub puzzle_id: String,
    pub daily: bool,
    pub attempts: Vec<PuzzleAttempt>,
}

impl PuzzleSummary {
    /// Groups a report's attempts by puzzle, in the order puzzles were played.
    pub fn from_report(report: &PuzzleReport) -> Vec<PuzzleSummary> {
        let mut summaries: Vec<PuzzleSummary> = Vec::new();
        for attempt in &report.attempts {
            match summaries.iter_mut().find(|s| s.puzzle_id == attempt.puzzle_id) {
                Some(summary) => summary.attempts.push(attempt.clone()),
                None => summaries.push(PuzzleSummary {
                    puzzle_id: attempt.puzzle_id.clone(),
                    daily: report.daily.as_deref() == Some(attempt.puzzle_id.as_str()),
                    attempts: vec![attempt.clone()],
                }),
            }
        }
        summaries
    }

    /// Number of bots that solved the puzzle.
    pub fn solved(&self) -> usize {
        self.attempts.iter().filter(|a| a.correct).count()
    }
}

/// Structured output of the announce phase. No formatting is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub date: NaiveDate,
    pub games: Vec<MatchReport>,
    pub byes: Vec<String>,
    pub skipped: Vec<SkippedMatch>,
    /// `None` when no puzzles were evaluated that day.
    pub puzzles: Option<Vec<PuzzleSummary>>,
    pub leaderboard: Vec<LeaderboardEntry>,
}
