//! End-to-end tests for the daily tournament.
//!
//! These drive the [`CadenceController`] the way the worker does, with small
//! in-process strategies whose results are known in advance.

use bot_arena::cadence::join_compute;
use bot_arena::elo::{RatingSystem, Track};
use bot_arena::game_runner::{GameRunner, Outcome, Seat, Termination};
use bot_arena::matchmaking::Pairing;
use bot_arena::openings::OpeningBook;
use bot_arena::puzzles::{Puzzle, PuzzleBatch, StaticPuzzleSource};
use bot_arena::storage::{MemoryStore, SqliteStore, Store};
use bot_arena::{
    ArenaSettings, BotDescriptor, CadenceController, CadenceError, Roster, Strategy,
};
use chess_rules::{
    GameResult, Move, Position, Role, RuleSet, Square, StandardChess, STARTING_FEN,
};
use chrono::NaiveDate;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;

/// Plays the first legal move, or a mate in one when there is one.
struct Mater;

impl Strategy for Mater {
    fn select_move(&mut self, position: &Position) -> Move {
        let rules = StandardChess;
        let moves = rules.legal_moves(position);
        moves
            .iter()
            .find(|mv| {
                let mut next = position.clone();
                rules.apply_move(&mut next, mv).is_ok()
                    && matches!(
                        rules.outcome(&next),
                        Some(GameResult::WhiteWins | GameResult::BlackWins)
                    )
            })
            .unwrap_or(&moves[0])
            .clone()
    }
}

/// Always tries to teleport the white king, which is never legal.
struct Cheater;

impl Strategy for Cheater {
    fn select_move(&mut self, _position: &Position) -> Move {
        Move::Normal {
            role: Role::King,
            from: Square::E1,
            capture: None,
            to: Square::E8,
            promotion: None,
        }
    }
}

/// Uniformly random legal moves from a fixed seed.
struct Shuffler(StdRng);

impl Strategy for Shuffler {
    fn select_move(&mut self, position: &Position) -> Move {
        StandardChess
            .legal_moves(position)
            .choose(&mut self.0)
            .cloned()
            .unwrap()
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn no_openings() -> ArenaSettings {
    ArenaSettings {
        opening_plies: 0,
        openings: OpeningBook::empty(),
        ..ArenaSettings::default()
    }
}

fn winner_and_cheater() -> Arc<Roster> {
    Arc::new(
        [
            BotDescriptor::new("winner", || Mater),
            BotDescriptor::new("cheater", || Cheater),
        ]
        .into_iter()
        .collect(),
    )
}

fn mate_in_one() -> Puzzle {
    Puzzle {
        id: "scholar".to_string(),
        rating: 1200.0,
        themes: vec!["mateIn1".to_string()],
        fen: "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3".to_string(),
        last_move: Some("g8f6".to_string()),
        solution: vec!["h5f7".to_string()],
    }
}

#[test]
fn test_equal_bots_winner_gains_fifteen() {
    let store = Arc::new(MemoryStore::new());
    let controller = CadenceController::new(store.clone(), winner_and_cheater())
        .with_settings(no_openings())
        .with_seed(7);

    let record = controller.compute(date()).unwrap();

    assert_eq!(record.matches.len(), 1);
    let report = &record.matches[0];
    assert_eq!(report.game.winner(), Some("winner"));

    let ratings = RatingSystem::new(store.as_ref(), Track::Match);
    assert!((ratings.rating("winner").unwrap() - 815.0).abs() < 1e-9);
    assert!((ratings.rating("cheater").unwrap() - 785.0).abs() < 1e-9);
}

#[test]
fn test_five_bots_get_two_matches_and_one_bye() {
    let roster: Roster = (0..5)
        .map(|i| BotDescriptor::new(format!("bot{}", i), || Mater))
        .collect();
    let controller = CadenceController::new(Arc::new(MemoryStore::new()), Arc::new(roster))
        .with_seed(3);

    let record = controller.compute(date()).unwrap();

    let matches = record
        .pairings
        .iter()
        .filter(|p| matches!(p, Pairing::Match { .. }))
        .count();
    assert_eq!(matches, 2);
    assert_eq!(record.byes().len(), 1);

    let seen: Vec<&str> = record.pairings.iter().flat_map(Pairing::bots).collect();
    let unique: HashSet<&str> = seen.iter().copied().collect();
    assert_eq!(seen.len(), 5);
    assert_eq!(unique.len(), 5);
}

#[test]
fn test_illegal_move_is_a_forfeit() {
    let controller = CadenceController::new(Arc::new(MemoryStore::new()), winner_and_cheater())
        .with_settings(no_openings())
        .with_seed(11);

    let record = controller.compute(date()).unwrap();

    let game = &record.matches[0].game;
    let expected = if game.white == "winner" {
        Outcome::WhiteWins
    } else {
        Outcome::BlackWins
    };
    assert_eq!(game.outcome, expected);
    match &game.termination {
        Termination::Forfeit { offender, .. } => assert_eq!(offender, "cheater"),
        other => panic!("expected forfeit, got {:?}", other),
    }
}

#[test]
fn test_solving_harder_puzzle_raises_rating() {
    let store = Arc::new(MemoryStore::new());
    let roster: Roster = std::iter::once(BotDescriptor::new("solver", || Mater)).collect();
    let source = StaticPuzzleSource::new(PuzzleBatch {
        daily: Some(mate_in_one()),
        bulk: Vec::new(),
    });
    let controller = CadenceController::new(store.clone(), Arc::new(roster))
        .with_puzzles(Arc::new(source));

    let record = controller.compute(date()).unwrap();

    let report = record.puzzles.unwrap();
    assert_eq!(report.daily.as_deref(), Some("scholar"));
    assert!(report.attempts[0].correct);

    let expected = 800.0 + 30.0 * (1.0 - 1.0 / 11.0);
    let rating = RatingSystem::new(store.as_ref(), Track::Puzzle)
        .rating("solver")
        .unwrap();
    assert!((rating - expected).abs() < 1e-9);
    assert!((rating - 827.27).abs() < 0.01);
}

#[test]
fn test_announce_twice_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let roster: Roster = (0..4)
        .map(|i| BotDescriptor::new(format!("bot{}", i), || Mater))
        .collect();
    let source = StaticPuzzleSource::new(PuzzleBatch {
        daily: Some(mate_in_one()),
        bulk: Vec::new(),
    });
    let controller = CadenceController::new(store.clone(), Arc::new(roster))
        .with_puzzles(Arc::new(source))
        .with_seed(5);
    controller.compute(date()).unwrap();
    let entries = store.len();

    let first = controller.announce(date()).unwrap();
    let second = controller.announce(date()).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.len(), entries, "announce must not write");
    assert_eq!(first.puzzles.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_earlier_day_announces_its_own_standings() {
    let controller = CadenceController::new(Arc::new(MemoryStore::new()), winner_and_cheater())
        .with_settings(no_openings());
    let next = date().succ_opt().unwrap();
    controller.compute(date()).unwrap();
    controller.compute(next).unwrap();

    let first = controller.announce(date()).unwrap();
    let second = controller.announce(next).unwrap();

    assert!((first.leaderboard[0].match_rating - 815.0).abs() < 1e-9);
    assert!(second.leaderboard[0].match_rating > 815.0);
    assert_eq!(second.leaderboard, controller.leaderboard().unwrap());
}

#[test]
fn test_ratings_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.db");

    {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&path).unwrap());
        let controller = CadenceController::new(store, winner_and_cheater())
            .with_settings(no_openings());
        controller.compute(date()).unwrap();
    }

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&path).unwrap());
    let controller =
        CadenceController::new(store.clone(), winner_and_cheater()).with_settings(no_openings());
    assert!(controller.has_computed(date()).unwrap());

    let announcement = controller.announce(date()).unwrap();
    assert_eq!(announcement.leaderboard[0].bot, "winner");
    assert!((announcement.leaderboard[0].match_rating - 815.0).abs() < 1e-9);

    let history = RatingSystem::new(store.as_ref(), Track::Match).history().unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_concurrent_compute_is_rejected() {
    let controller = CadenceController::new(Arc::new(MemoryStore::new()), winner_and_cheater());

    let first = controller.spawn_compute(date()).unwrap();
    let second = controller.spawn_compute(date());
    assert!(matches!(second, Err(CadenceError::AlreadyRunning)));

    join_compute(first).await.unwrap();
    let again = controller.spawn_compute(date()).unwrap();
    join_compute(again).await.unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_games_always_finish(white_seed in any::<u64>(), black_seed in any::<u64>()) {
        let rules = StandardChess;
        let mut runner = GameRunner::new(
            &rules,
            Seat::new("white", Box::new(Shuffler(StdRng::seed_from_u64(white_seed))), None),
            Seat::new("black", Box::new(Shuffler(StdRng::seed_from_u64(black_seed))), None),
        );

        let game = runner.play_game(STARTING_FEN, &[]).unwrap();

        prop_assert!(!game.termination.is_forfeit());
        prop_assert!(!game.moves.is_empty());
        let decisive = game.outcome != Outcome::Draw;
        prop_assert_eq!(decisive, matches!(game.termination, Termination::Checkmate));
    }
}
