//! Tactical puzzles: the puzzle model, puzzle sources and the evaluator that
//! runs every bot against a batch.
//!
//! A puzzle starts from a FEN with the opponent to move. The opponent's last
//! move is applied first, then the bot must find the solution. On the bot's
//! plies its move must equal the canonical solution move; the opponent's
//! replies are taken from the solution. Only an exact match of every bot ply
//! counts as solved, even if another move would also win.

use chess_rules::{Move, Position, RuleSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::elo::{RatingChange, RatingSystem, Track};
use crate::storage::{StorageError, Store, StoreExt};
use crate::strategy::{state_path, BotState, Roster, Strategy};

/// Errors raised while fetching or validating puzzles.
#[derive(Error, Debug)]
pub enum PuzzleError {
    /// No puzzle file exists for the date.
    #[error("no puzzles available for {0}")]
    NotFound(NaiveDate),
    /// The puzzle file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The JSON puzzle file is malformed.
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A CSV row is malformed.
    #[error("{path}:{line}: {reason}")]
    Csv {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    /// The puzzle does not describe a playable line.
    #[error("puzzle {id} is invalid: {reason}")]
    Invalid { id: String, reason: String },
}

/// A tactical position with a known solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    /// Difficulty, used as the opponent rating on the puzzle track.
    pub rating: f64,
    #[serde(default)]
    pub themes: Vec<String>,
    /// Position before the opponent's last move.
    pub fen: String,
    /// The opponent's move leading into the puzzle, in UCI. `None` if `fen`
    /// already has the solver to move.
    #[serde(default)]
    pub last_move: Option<String>,
    /// Canonical continuation in UCI, starting with the solver's move.
    pub solution: Vec<String>,
}

impl Puzzle {
    /// Replays the puzzle setup and checks the solution is legal.
    ///
    /// Returns the position the solver faces and the solution as moves.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError::Invalid`] if the FEN, the last move or any
    /// solution move is rejected, or if the solution is empty.
    pub fn prepare<R: RuleSet>(&self, rules: &R) -> Result<(Position, Vec<Move>), PuzzleError> {
        let invalid = |reason: String| PuzzleError::Invalid {
            id: self.id.clone(),
            reason,
        };

        if self.solution.is_empty() {
            return Err(invalid("empty solution".to_string()));
        }

        let mut position = rules
            .parse_fen(&self.fen)
            .map_err(|e| invalid(e.to_string()))?;
        if let Some(last) = &self.last_move {
            let mv = rules
                .parse_uci(&position, last)
                .map_err(|e| invalid(format!("last move: {}", e)))?;
            rules
                .apply_move(&mut position, &mv)
                .map_err(|e| invalid(format!("last move: {}", e)))?;
        }

        let start = position.clone();
        let mut solution = Vec::with_capacity(self.solution.len());
        for uci in &self.solution {
            let mv = rules
                .parse_uci(&position, uci)
                .map_err(|e| invalid(format!("solution: {}", e)))?;
            rules
                .apply_move(&mut position, &mv)
                .map_err(|e| invalid(format!("solution: {}", e)))?;
            solution.push(mv);
        }

        Ok((start, solution))
    }
}

/// The puzzles for one compute cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PuzzleBatch {
    /// The featured puzzle of the day.
    #[serde(default)]
    pub daily: Option<Puzzle>,
    #[serde(default)]
    pub bulk: Vec<Puzzle>,
}

impl PuzzleBatch {
    /// All puzzles, daily first.
    pub fn iter(&self) -> impl Iterator<Item = &Puzzle> {
        self.daily.iter().chain(self.bulk.iter())
    }

    pub fn len(&self) -> usize {
        self.bulk.len() + usize::from(self.daily.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Supplies the puzzle batch for a date.
pub trait PuzzleSource: Send + Sync {
    /// Fetches the batch for `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if no batch is available or it cannot be parsed.
    fn fetch(&self, date: NaiveDate) -> Result<PuzzleBatch, PuzzleError>;
}

/// A fixed batch, returned for every date.
#[derive(Debug, Clone, Default)]
pub struct StaticPuzzleSource {
    batch: PuzzleBatch,
}

impl StaticPuzzleSource {
    pub fn new(batch: PuzzleBatch) -> Self {
        Self { batch }
    }
}

impl PuzzleSource for StaticPuzzleSource {
    fn fetch(&self, _date: NaiveDate) -> Result<PuzzleBatch, PuzzleError> {
        Ok(self.batch.clone())
    }
}

/// Reads dated puzzle files from a directory.
///
/// For a date such as 2024-03-01 it looks for `2024-03-01.json` holding a
/// serialized [`PuzzleBatch`], then for `2024-03-01.csv` in the Lichess
/// puzzle database format:
///
/// ```text
/// PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags
/// ```
///
/// The first CSV row becomes the daily puzzle. At most `bulk` further
/// puzzles are kept in either format.
#[derive(Debug, Clone)]
pub struct DirectoryPuzzleSource {
    dir: PathBuf,
    bulk: usize,
}

impl DirectoryPuzzleSource {
    pub fn new(dir: impl Into<PathBuf>, bulk: usize) -> Self {
        Self {
            dir: dir.into(),
            bulk,
        }
    }

    fn read(path: &Path) -> Result<String, PuzzleError> {
        std::fs::read_to_string(path).map_err(|source| PuzzleError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl PuzzleSource for DirectoryPuzzleSource {
    fn fetch(&self, date: NaiveDate) -> Result<PuzzleBatch, PuzzleError> {
        let stem = date.format("%Y-%m-%d").to_string();
        let json_path = self.dir.join(format!("{}.json", stem));
        let csv_path = self.dir.join(format!("{}.csv", stem));

        let mut batch: PuzzleBatch = if json_path.exists() {
            let content = Self::read(&json_path)?;
            serde_json::from_str(&content).map_err(|source| PuzzleError::Json {
                path: json_path.clone(),
                source,
            })?
        } else if csv_path.exists() {
            parse_lichess_csv(&Self::read(&csv_path)?, &csv_path)?
        } else {
            return Err(PuzzleError::NotFound(date));
        };

        batch.bulk.truncate(self.bulk);
        Ok(batch)
    }
}

/// Parses rows of the Lichess puzzle database.
///
/// `Moves` starts with the opponent's last move; the rest is the solution.
/// A header row is skipped if present.
pub fn parse_lichess_csv(content: &str, path: &Path) -> Result<PuzzleBatch, PuzzleError> {
    let mut puzzles = Vec::new();
    for (index, row) in content.lines().enumerate() {
        let row = row.trim();
        if row.is_empty() || row.starts_with("PuzzleId") {
            continue;
        }
        let csv_error = |reason: &str| PuzzleError::Csv {
            path: path.to_path_buf(),
            line: index + 1,
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() < 4 {
            return Err(csv_error("expected at least 4 columns"));
        }
        let mut moves = fields[2].split_whitespace().map(str::to_string);
        let last_move = moves.next().ok_or_else(|| csv_error("empty Moves column"))?;
        let rating = fields[3]
            .trim()
            .parse::<f64>()
            .map_err(|_| csv_error("Rating is not a number"))?;
        let themes = fields
            .get(7)
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        puzzles.push(Puzzle {
            id: fields[0].trim().to_string(),
            rating,
            themes,
            fen: fields[1].trim().to_string(),
            last_move: Some(last_move),
            solution: moves.collect(),
        });
    }

    let mut puzzles = puzzles.into_iter();
    Ok(PuzzleBatch {
        daily: puzzles.next(),
        bulk: puzzles.collect(),
    })
}

/// Store path of a bot's per-theme puzzle statistics.
pub fn themes_path(bot: &str) -> String {
    format!("stats/themes/{}", bot)
}

/// All-time accuracy on one theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeStats {
    pub correct: u32,
    pub attempted: u32,
}

impl ThemeStats {
    pub fn record(&mut self, correct: bool) {
        self.attempted += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Fraction solved, or `None` if never attempted.
    pub fn accuracy(&self) -> Option<f64> {
        (self.attempted > 0).then(|| f64::from(self.correct) / f64::from(self.attempted))
    }
}

/// One bot's attempt at one puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleAttempt {
    pub bot: String,
    pub puzzle_id: String,
    pub correct: bool,
    /// The bot's moves in UCI, up to and including the first mismatch.
    pub played: Vec<String>,
    pub rating: RatingChange,
}

/// Outcome of evaluating a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PuzzleReport {
    /// Id of the daily puzzle, if it was valid.
    pub daily: Option<String>,
    /// Attempts grouped by bot, in roster order.
    pub attempts: Vec<PuzzleAttempt>,
    /// Ids of puzzles skipped as invalid.
    pub skipped: Vec<String>,
}

struct Prepared<'p> {
    puzzle: &'p Puzzle,
    start: Position,
    solution: Vec<Move>,
}

/// Plays a strategy through one prepared puzzle.
///
/// Returns whether every bot ply matched, and the moves the bot played.
fn solve<R: RuleSet>(
    rules: &R,
    strategy: &mut dyn Strategy,
    state: &mut Option<BotState>,
    start: &Position,
    solution: &[Move],
) -> (bool, Vec<String>) {
    let mut position = start.clone();
    let mut played = Vec::new();

    for (ply, expected) in solution.iter().enumerate() {
        if ply % 2 == 0 {
            strategy.load_state(state.as_ref());
            let mv = strategy.select_move(&position);
            if let Some(saved) = strategy.save_state() {
                *state = Some(saved);
            }
            played.push(rules.to_uci(&mv));
            if mv != *expected {
                return (false, played);
            }
        }
        // Validated by `Puzzle::prepare`.
        if rules.apply_move(&mut position, expected).is_err() {
            return (false, played);
        }
    }
    (true, played)
}

/// Runs every bot of a roster against a puzzle batch.
pub struct PuzzleEvaluator<'a, R: RuleSet> {
    rules: &'a R,
    store: &'a dyn Store,
    ratings: RatingSystem<'a>,
}

impl<'a, R: RuleSet> PuzzleEvaluator<'a, R> {
    pub fn new(rules: &'a R, store: &'a dyn Store) -> Self {
        Self {
            rules,
            store,
            ratings: RatingSystem::new(store, Track::Puzzle),
        }
    }

    /// Uses a custom rating system for the puzzle track.
    pub fn with_ratings(mut self, ratings: RatingSystem<'a>) -> Self {
        self.ratings = ratings;
        self
    }

    /// Evaluates every bot on every valid puzzle of the batch.
    ///
    /// Updates puzzle ratings, per-theme statistics and bot state as it
    /// goes. Invalid puzzles are skipped for everyone.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub fn evaluate(&self, roster: &Roster, batch: &PuzzleBatch) -> Result<PuzzleReport, StorageError> {
        let mut report = PuzzleReport::default();
        let mut prepared = Vec::with_capacity(batch.len());
        for puzzle in batch.iter() {
            match puzzle.prepare(self.rules) {
                Ok((start, solution)) => prepared.push(Prepared {
                    puzzle,
                    start,
                    solution,
                }),
                Err(e) => {
                    warn!(puzzle = %puzzle.id, error = %e, "skipping puzzle");
                    report.skipped.push(puzzle.id.clone());
                }
            }
        }
        report.daily = batch
            .daily
            .as_ref()
            .filter(|daily| !report.skipped.contains(&daily.id))
            .map(|daily| daily.id.clone());

        for bot in roster.iter() {
            let mut strategy = bot.instantiate();
            let initial_state: Option<BotState> = self.store.load_opt(&state_path(&bot.id))?;
            let mut state = initial_state.clone();
            let mut themes: BTreeMap<String, ThemeStats> =
                self.store.load(&themes_path(&bot.id), BTreeMap::new())?;
            let mut solved = 0;

            for entry in &prepared {
                let (correct, played) = solve(
                    self.rules,
                    strategy.as_mut(),
                    &mut state,
                    &entry.start,
                    &entry.solution,
                );
                let rating = self
                    .ratings
                    .record_puzzle(&bot.id, entry.puzzle.rating, correct)?;
                for theme in &entry.puzzle.themes {
                    themes.entry(theme.clone()).or_default().record(correct);
                }
                debug!(bot = %bot.id, puzzle = %entry.puzzle.id, correct, "puzzle attempt");
                if correct {
                    solved += 1;
                }
                report.attempts.push(PuzzleAttempt {
                    bot: bot.id.clone(),
                    puzzle_id: entry.puzzle.id.clone(),
                    correct,
                    played,
                    rating,
                });
            }

            self.store.save(&themes_path(&bot.id), &themes)?;
            if state != initial_state {
                if let Some(state) = &state {
                    self.store.save(&state_path(&bot.id), state)?;
                }
            }
            info!(bot = %bot.id, solved, total = prepared.len(), "puzzles evaluated");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::BotDescriptor;
    use crate::storage::MemoryStore;
    use chess_rules::StandardChess;

    /// Scholar's mate: black has just played ...Nf6, white mates on f7.
    fn mate_in_one() -> Puzzle {
        Puzzle {
            id: "mate1".to_string(),
            rating: 1200.0,
            themes: vec!["mate".to_string(), "short".to_string()],
            fen: "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3"
                .to_string(),
            last_move: Some("g8f6".to_string()),
            solution: vec!["h5f7".to_string()],
        }
    }

    /// The whole scholar's mate, solved by white from move two.
    fn long_mate() -> Puzzle {
        Puzzle {
            id: "mate3".to_string(),
            rating: 900.0,
            themes: vec!["mate".to_string()],
            fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string(),
            last_move: Some("e7e5".to_string()),
            solution: ["d1h5", "b8c6", "f1c4", "g8f6", "h5f7"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Plays the given UCI moves in order, then the first legal move.
    struct Oracle {
        moves: Vec<String>,
        next: usize,
    }

    impl Oracle {
        fn new(moves: &[&str]) -> Self {
            Self {
                moves: moves.iter().map(|s| s.to_string()).collect(),
                next: 0,
            }
        }
    }

    impl Strategy for Oracle {
        fn select_move(&mut self, position: &Position) -> Move {
            let rules = StandardChess;
            let mv = self
                .moves
                .get(self.next)
                .and_then(|uci| rules.parse_uci(position, uci).ok())
                .unwrap_or_else(|| rules.legal_moves(position).remove(0));
            self.next += 1;
            mv
        }

        fn load_state(&mut self, state: Option<&BotState>) {
            self.next = state.and_then(|s| s.as_str().parse().ok()).unwrap_or(0);
        }

        fn save_state(&self) -> Option<BotState> {
            Some(BotState::new(self.next.to_string()))
        }
    }

    /// Always plays the same move.
    struct Always(&'static str);

    impl Strategy for Always {
        fn select_move(&mut self, position: &Position) -> Move {
            let rules = StandardChess;
            rules
                .parse_uci(position, self.0)
                .unwrap_or_else(|_| rules.legal_moves(position).remove(0))
        }
    }

    fn run_one(puzzle: &Puzzle, moves: &[&str]) -> (bool, Vec<String>) {
        let rules = StandardChess;
        let (start, solution) = puzzle.prepare(&rules).unwrap();
        let mut oracle = Oracle::new(moves);
        let mut state = None;
        solve(&rules, &mut oracle, &mut state, &start, &solution)
    }

    #[test]
    fn test_prepare_applies_last_move() {
        let (start, solution) = mate_in_one().prepare(&StandardChess).unwrap();
        assert_eq!(start.turn(), chess_rules::Color::White);
        assert_eq!(solution.len(), 1);
    }

    #[test]
    fn test_prepare_rejects_bad_puzzles() {
        let rules = StandardChess;

        let mut bad_fen = mate_in_one();
        bad_fen.fen = "nonsense".to_string();
        assert!(matches!(bad_fen.prepare(&rules), Err(PuzzleError::Invalid { .. })));

        let mut bad_last = mate_in_one();
        bad_last.last_move = Some("g8g6".to_string());
        assert!(bad_last.prepare(&rules).is_err());

        let mut bad_solution = mate_in_one();
        bad_solution.solution = vec!["h5h8".to_string()];
        assert!(bad_solution.prepare(&rules).is_err());

        let mut empty = mate_in_one();
        empty.solution.clear();
        assert!(empty.prepare(&rules).is_err());
    }

    #[test]
    fn test_exact_solution_is_correct() {
        assert_eq!(run_one(&mate_in_one(), &["h5f7"]), (true, vec!["h5f7".to_string()]));
    }

    #[test]
    fn test_multi_ply_solution_only_checks_bot_plies() {
        let (correct, played) = run_one(&long_mate(), &["d1h5", "f1c4", "h5f7"]);
        assert!(correct);
        assert_eq!(played, vec!["d1h5", "f1c4", "h5f7"]);
    }

    #[test]
    fn test_deviation_is_incorrect_and_stops() {
        let (correct, played) = run_one(&long_mate(), &["d1h5", "d2d3"]);
        assert!(!correct);
        assert_eq!(played, vec!["d1h5", "d2d3"]);
    }

    #[test]
    fn test_alternative_win_is_not_credited() {
        // Qxe5+ wins a pawn with check but is not the canonical mate.
        let (correct, _) = run_one(&mate_in_one(), &["h5e5"]);
        assert!(!correct);
    }

    #[test]
    fn test_theme_stats_accumulate() {
        let mut stats = ThemeStats::default();
        assert_eq!(stats.accuracy(), None);
        stats.record(true);
        stats.record(false);
        assert_eq!(stats, ThemeStats { correct: 1, attempted: 2 });
        assert_eq!(stats.accuracy(), Some(0.5));
    }

    #[test]
    fn test_evaluator_updates_ratings_themes_and_state() {
        let store = MemoryStore::new();
        let rules = StandardChess;
        let mut roster = Roster::new();
        roster
            .register(BotDescriptor::new("solver", || Oracle::new(&["h5f7"])))
            .unwrap();
        roster
            .register(BotDescriptor::new("misser", || Always("h5e5")))
            .unwrap();
        let batch = PuzzleBatch {
            daily: Some(mate_in_one()),
            bulk: Vec::new(),
        };

        let report = PuzzleEvaluator::new(&rules, &store)
            .evaluate(&roster, &batch)
            .unwrap();

        assert_eq!(report.daily.as_deref(), Some("mate1"));
        assert_eq!(report.attempts.len(), 2);
        let solver = &report.attempts[0];
        assert!(solver.correct);
        assert!((solver.rating.after - 827.27).abs() < 0.01);
        assert!(!report.attempts[1].correct);
        assert!(report.attempts[1].rating.after < 800.0);

        let themes: BTreeMap<String, ThemeStats> =
            store.load(&themes_path("solver"), BTreeMap::new()).unwrap();
        assert_eq!(themes["mate"], ThemeStats { correct: 1, attempted: 1 });
        assert_eq!(themes["short"], ThemeStats { correct: 1, attempted: 1 });

        let state: Option<BotState> = store.load_opt(&state_path("solver")).unwrap();
        assert_eq!(state, Some(BotState::new("1")));
    }

    #[test]
    fn test_theme_stats_are_all_time() {
        let store = MemoryStore::new();
        let rules = StandardChess;
        let roster: Roster = vec![BotDescriptor::new("misser", || Always("h5e5"))]
            .into_iter()
            .collect();
        let batch = PuzzleBatch {
            daily: Some(mate_in_one()),
            bulk: Vec::new(),
        };
        let evaluator = PuzzleEvaluator::new(&rules, &store);

        evaluator.evaluate(&roster, &batch).unwrap();
        evaluator.evaluate(&roster, &batch).unwrap();

        let themes: BTreeMap<String, ThemeStats> =
            store.load(&themes_path("misser"), BTreeMap::new()).unwrap();
        assert_eq!(themes["mate"], ThemeStats { correct: 0, attempted: 2 });
    }

    #[test]
    fn test_evaluator_skips_invalid_puzzles() {
        let store = MemoryStore::new();
        let rules = StandardChess;
        let roster: Roster = vec![BotDescriptor::new("solver", || Oracle::new(&["h5f7"]))]
            .into_iter()
            .collect();
        let mut broken = mate_in_one();
        broken.id = "broken".to_string();
        broken.fen = "not a fen".to_string();
        let batch = PuzzleBatch {
            daily: Some(broken),
            bulk: vec![mate_in_one()],
        };

        let report = PuzzleEvaluator::new(&rules, &store)
            .evaluate(&roster, &batch)
            .unwrap();

        assert_eq!(report.daily, None);
        assert_eq!(report.skipped, vec!["broken"]);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].puzzle_id, "mate1");
    }

    #[test]
    fn test_parse_lichess_csv() {
        let csv = "\
PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags
mate1,r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3,g8f6 h5f7,1200,75,95,100,mate mateIn1 short,https://lichess.org/x,
mate3,rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1,e7e5 d1h5 b8c6 f1c4 g8f6 h5f7,900,75,95,100,mate,https://lichess.org/y,
";
        let batch = parse_lichess_csv(csv, Path::new("puzzles.csv")).unwrap();

        let daily = batch.daily.as_ref().unwrap();
        assert_eq!(daily, &Puzzle {
            themes: vec!["mate".to_string(), "mateIn1".to_string(), "short".to_string()],
            ..mate_in_one()
        });
        assert_eq!(batch.bulk, vec![long_mate()]);
    }

    #[test]
    fn test_parse_lichess_csv_reports_bad_rows() {
        let result = parse_lichess_csv("x,fen,e2e4,abc\n", Path::new("bad.csv"));
        assert!(matches!(result, Err(PuzzleError::Csv { line: 1, .. })));
    }

    #[test]
    fn test_directory_source_reads_json_then_csv() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let source = DirectoryPuzzleSource::new(dir.path(), 0);

        assert!(matches!(source.fetch(date), Err(PuzzleError::NotFound(_))));

        let batch = PuzzleBatch {
            daily: Some(mate_in_one()),
            bulk: vec![long_mate()],
        };
        std::fs::write(
            dir.path().join("2024-03-01.json"),
            serde_json::to_string(&batch).unwrap(),
        )
        .unwrap();

        let fetched = source.fetch(date).unwrap();
        assert_eq!(fetched.daily, batch.daily);
        // Bulk limited to zero
        assert!(fetched.bulk.is_empty());
    }

    #[test]
    fn test_directory_source_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2024-03-01.json"), "{ nope").unwrap();
        let source = DirectoryPuzzleSource::new(dir.path(), 5);

        let result = source.fetch(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(matches!(result, Err(PuzzleError::Json { .. })));
    }
}
