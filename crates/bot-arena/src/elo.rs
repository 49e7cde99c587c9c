//! Elo rating calculation and rating history.
//!
//! Ratings are kept on two independent tracks, one for games between bots
//! and one for puzzle attempts. Both use the same logistic update with a
//! K-factor of 30 and an initial rating of 800.

use crate::storage::{to_value, StorageError, Store, StoreExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rating given to a bot the first time it appears on a track.
pub const DEFAULT_RATING: f64 = 800.0;

/// K-factor for rating updates (higher = more volatile).
pub const K_FACTOR: f64 = 30.0;

/// Calculate expected score for player A against player B.
///
/// `expected_score(a, b) + expected_score(b, a)` is always 1.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10_f64.powf((rating_b - rating_a) / 400.0))
}

/// Calculate new rating after a game or puzzle.
///
/// # Arguments
/// * `rating` - Current rating
/// * `opponent_rating` - Opponent's rating, or the puzzle's difficulty
/// * `actual` - Actual score (1.0 = win, 0.5 = draw, 0.0 = loss)
/// * `k_factor` - Maximum change per result
pub fn new_rating(rating: f64, opponent_rating: f64, actual: f64, k_factor: f64) -> f64 {
    rating + k_factor * (actual - expected_score(rating, opponent_rating))
}

/// Which rating a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Games between bots.
    Match,
    /// Puzzle attempts.
    Puzzle,
}

impl Track {
    fn name(self) -> &'static str {
        match self {
            Track::Match => "match",
            Track::Puzzle => "puzzle",
        }
    }

    /// Store path of a bot's rating on this track.
    pub fn rating_path(self, bot: &str) -> String {
        format!("ratings/{}/{}", self.name(), bot)
    }

    /// Store path of this track's snapshot history.
    pub fn history_path(self) -> String {
        format!("history/{}", self.name())
    }
}

/// A rating before and after one update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub before: f64,
    pub after: f64,
}

impl RatingChange {
    /// Signed change.
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Ratings of every bot at the end of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    /// Round label, normally the compute date.
    pub label: String,
    pub ratings: BTreeMap<String, f64>,
}

/// Reads and updates one rating track in a [`Store`].
///
/// # Example
///
/// ```
/// use bot_arena::elo::{RatingSystem, Track};
/// use bot_arena::storage::MemoryStore;
///
/// let store = MemoryStore::new();
/// let ratings = RatingSystem::new(&store, Track::Match);
/// let (white, black) = ratings.record_game("a", "b", 1.0).unwrap();
/// assert_eq!(white.after, 815.0);
/// assert_eq!(black.after, 785.0);
/// ```
pub struct RatingSystem<'a> {
    store: &'a dyn Store,
    track: Track,
    k_factor: f64,
    initial: f64,
}

impl<'a> RatingSystem<'a> {
    pub fn new(store: &'a dyn Store, track: Track) -> Self {
        Self {
            store,
            track,
            k_factor: K_FACTOR,
            initial: DEFAULT_RATING,
        }
    }

    /// Overrides the K-factor.
    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.k_factor = k_factor;
        self
    }

    /// Overrides the rating given to unseen bots.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = initial;
        self
    }

    pub fn track(&self) -> Track {
        self.track
    }

    /// Current rating of a bot, or the initial rating if it has none yet.
    pub fn rating(&self, bot: &str) -> Result<f64, StorageError> {
        self.store.load(&self.track.rating_path(bot), self.initial)
    }

    /// Current ratings of the given bots, in the given order.
    pub fn ratings(&self, bots: &[String]) -> Result<Vec<(String, f64)>, StorageError> {
        bots.iter()
            .map(|bot| Ok((bot.clone(), self.rating(bot)?)))
            .collect()
    }

    /// Applies the result of one game to both players.
    ///
    /// Both new ratings are computed from the ratings before the game and
    /// written in a single batch.
    ///
    /// # Arguments
    /// * `white`, `black` - Bot ids
    /// * `white_score` - 1.0 if white won, 0.5 for a draw, 0.0 if black won
    pub fn record_game(
        &self,
        white: &str,
        black: &str,
        white_score: f64,
    ) -> Result<(RatingChange, RatingChange), StorageError> {
        let white_before = self.rating(white)?;
        let black_before = self.rating(black)?;

        let white_change = RatingChange {
            before: white_before,
            after: new_rating(white_before, black_before, white_score, self.k_factor),
        };
        let black_change = RatingChange {
            before: black_before,
            after: new_rating(black_before, white_before, 1.0 - white_score, self.k_factor),
        };

        let white_path = self.track.rating_path(white);
        let black_path = self.track.rating_path(black);
        self.store.save_batch(vec![
            (white_path.clone(), to_value(&white_path, &white_change.after)?),
            (black_path.clone(), to_value(&black_path, &black_change.after)?),
        ])?;

        Ok((white_change, black_change))
    }

    /// Applies one puzzle attempt, using the puzzle's rating as the opponent.
    pub fn record_puzzle(
        &self,
        bot: &str,
        puzzle_rating: f64,
        solved: bool,
    ) -> Result<RatingChange, StorageError> {
        let before = self.rating(bot)?;
        let score = if solved { 1.0 } else { 0.0 };
        let change = RatingChange {
            before,
            after: new_rating(before, puzzle_rating, score, self.k_factor),
        };
        self.store.save(&self.track.rating_path(bot), &change.after)?;
        Ok(change)
    }

    /// Appends the current ratings of `bots` to the history.
    ///
    /// Earlier snapshots are never modified.
    pub fn append_snapshot(
        &self,
        label: &str,
        bots: &[String],
    ) -> Result<RatingSnapshot, StorageError> {
        let snapshot = RatingSnapshot {
            label: label.to_string(),
            ratings: self.ratings(bots)?.into_iter().collect(),
        };
        let path = self.track.history_path();
        let mut history: Vec<RatingSnapshot> = self.store.load(&path, Vec::new())?;
        history.push(snapshot.clone());
        self.store.save(&path, &history)?;
        Ok(snapshot)
    }

    /// All snapshots, oldest first.
    pub fn history(&self) -> Result<Vec<RatingSnapshot>, StorageError> {
        self.store.load(&self.track.history_path(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_expected_score_equal_ratings() {
        assert_eq!(expected_score(800.0, 800.0), 0.5);
    }

    #[test]
    fn test_expected_score_higher_rated() {
        let expected = expected_score(1700.0, 1500.0);
        assert!(expected > 0.7);
        assert!(expected < 0.8);
    }

    #[test]
    fn test_expected_score_four_hundred_points() {
        let expected = expected_score(800.0, 1200.0);
        assert!((expected - 1.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_rating_win_loss_draw() {
        assert_eq!(new_rating(800.0, 800.0, 1.0, K_FACTOR), 815.0);
        assert_eq!(new_rating(800.0, 800.0, 0.0, K_FACTOR), 785.0);
        assert_eq!(new_rating(800.0, 800.0, 0.5, K_FACTOR), 800.0);
    }

    #[test]
    fn test_new_rating_upset_win() {
        // Lower rated player wins
        let new = new_rating(1300.0, 1500.0, 1.0, K_FACTOR);
        assert!(new > 1320.0); // Bigger gain for upset
    }

    #[test]
    fn test_track_paths() {
        assert_eq!(Track::Match.rating_path("a"), "ratings/match/a");
        assert_eq!(Track::Puzzle.rating_path("a"), "ratings/puzzle/a");
        assert_eq!(Track::Puzzle.history_path(), "history/puzzle");
    }

    #[test]
    fn test_unrated_bot_gets_initial_rating() {
        let store = MemoryStore::new();
        let ratings = RatingSystem::new(&store, Track::Match);
        assert_eq!(ratings.rating("new").unwrap(), DEFAULT_RATING);

        let custom = RatingSystem::new(&store, Track::Match).with_initial(1500.0);
        assert_eq!(custom.rating("new").unwrap(), 1500.0);
    }

    #[test]
    fn test_record_game_uses_pre_update_ratings() {
        let store = MemoryStore::new();
        store.save("ratings/match/a", &900.0).unwrap();
        let ratings = RatingSystem::new(&store, Track::Match);

        let (white, black) = ratings.record_game("a", "b", 0.0).unwrap();

        let expected_white = new_rating(900.0, 800.0, 0.0, K_FACTOR);
        let expected_black = new_rating(800.0, 900.0, 1.0, K_FACTOR);
        assert_eq!(white.after, expected_white);
        assert_eq!(black.after, expected_black);
        // Zero-sum for equal K
        assert!((white.delta() + black.delta()).abs() < 1e-9);
        assert_eq!(ratings.rating("a").unwrap(), expected_white);
        assert_eq!(ratings.rating("b").unwrap(), expected_black);
    }

    #[test]
    fn test_tracks_are_independent() {
        let store = MemoryStore::new();
        let matches = RatingSystem::new(&store, Track::Match);
        let puzzles = RatingSystem::new(&store, Track::Puzzle);

        matches.record_game("a", "b", 1.0).unwrap();

        assert_eq!(matches.rating("a").unwrap(), 815.0);
        assert_eq!(puzzles.rating("a").unwrap(), DEFAULT_RATING);
    }

    #[test]
    fn test_record_puzzle_against_harder_puzzle() {
        let store = MemoryStore::new();
        let puzzles = RatingSystem::new(&store, Track::Puzzle);

        let change = puzzles.record_puzzle("a", 1200.0, true).unwrap();

        let expected = 800.0 + 30.0 * (1.0 - 1.0 / 11.0);
        assert!((change.after - expected).abs() < 1e-9);
        assert!((change.after - 827.27).abs() < 0.01);
    }

    #[test]
    fn test_append_snapshot_only_grows_history() {
        let store = MemoryStore::new();
        let ratings = RatingSystem::new(&store, Track::Match);
        let bots = vec!["a".to_string(), "b".to_string()];

        ratings.append_snapshot("2024-01-01", &bots).unwrap();
        let before = ratings.history().unwrap();
        ratings.record_game("a", "b", 1.0).unwrap();
        ratings.append_snapshot("2024-01-02", &bots).unwrap();
        let after = ratings.history().unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after[1].ratings["a"], 815.0);
        assert_eq!(after[0].ratings["a"], 800.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn expected_scores_are_symmetric(a in 100.0f64..3000.0, b in 100.0f64..3000.0) {
                let sum = expected_score(a, b) + expected_score(b, a);
                prop_assert!((sum - 1.0).abs() < 1e-12);
            }

            #[test]
            fn rating_moves_towards_result(
                rating in 100.0f64..3000.0,
                opponent in 100.0f64..3000.0,
                score in prop_oneof![Just(0.0f64), Just(0.5f64), Just(1.0f64)],
            ) {
                let expected = expected_score(rating, opponent);
                let updated = new_rating(rating, opponent, score, K_FACTOR);
                if score > expected {
                    prop_assert!(updated > rating);
                } else if score < expected {
                    prop_assert!(updated < rating);
                } else {
                    prop_assert_eq!(updated, rating);
                }
            }
        }
    }
}
