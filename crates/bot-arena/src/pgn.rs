//! PGN (Portable Game Notation) export for completed games.
//!
//! Games are rendered with the Seven Tag Roster, a `Termination` tag and,
//! for games that did not start from the standard position, `SetUp`/`FEN`.

use chess_rules::STARTING_FEN;
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::Path;

use crate::game_runner::Game;

/// Maximum line length of the move text.
const LINE_WIDTH: usize = 80;

/// Move number and side of the first move, read from a FEN.
fn first_move(fen: &str) -> (u32, bool) {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let black_first = fields.get(1) == Some(&"b");
    let number = fields.get(5).and_then(|n| n.parse().ok()).unwrap_or(1);
    (number, black_first)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders a completed game as PGN.
///
/// # Arguments
///
/// * `game` - The finished game
/// * `date` - Date of the round the game was played in
///
/// # Example
///
/// ```
/// use bot_arena::game_runner::{Game, Outcome, Termination};
/// use bot_arena::pgn::to_pgn;
/// use chess_rules::STARTING_FEN;
/// use chrono::NaiveDate;
///
/// let game = Game {
///     white: "minimax".to_string(),
///     black: "random".to_string(),
///     start_fen: STARTING_FEN.to_string(),
///     opening_plies: 0,
///     moves: vec!["e4".to_string(), "e5".to_string()],
///     outcome: Outcome::Draw,
///     termination: Termination::Repetition,
/// };
/// let pgn = to_pgn(&game, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
/// assert!(pgn.contains("[Date \"2024.03.01\"]"));
/// assert!(pgn.contains("1. e4 e5 1/2-1/2"));
/// ```
pub fn to_pgn(game: &Game, date: NaiveDate) -> String {
    let result = game.outcome.as_pgn();
    let mut pgn = String::new();

    let pgn_date = date.format("%Y.%m.%d").to_string();
    let round = date.format("%Y-%m-%d").to_string();
    let tags: [(&str, &str); 7] = [
        ("Event", "Bot Arena"),
        ("Site", "local"),
        ("Date", &pgn_date),
        ("Round", &round),
        ("White", &game.white),
        ("Black", &game.black),
        ("Result", result),
    ];
    for (name, value) in tags {
        let _ = writeln!(pgn, "[{} \"{}\"]", name, escape(value));
    }
    if game.start_fen != STARTING_FEN {
        let _ = writeln!(pgn, "[SetUp \"1\"]");
        let _ = writeln!(pgn, "[FEN \"{}\"]", escape(&game.start_fen));
    }
    let _ = writeln!(pgn, "[Termination \"{}\"]", escape(&game.termination.describe()));
    pgn.push('\n');

    let (mut number, black_first) = first_move(&game.start_fen);
    let mut tokens = Vec::with_capacity(game.moves.len() * 3 / 2 + 1);
    for (i, san) in game.moves.iter().enumerate() {
        let white_to_move = (i % 2 == 0) != black_first;
        if white_to_move {
            tokens.push(format!("{}.", number));
        } else if i == 0 {
            tokens.push(format!("{}...", number));
        }
        tokens.push(san.clone());
        if !white_to_move {
            number += 1;
        }
    }
    tokens.push(result.to_string());

    let mut line = String::new();
    for token in tokens {
        if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
            pgn.push_str(&line);
            pgn.push('\n');
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    pgn.push_str(&line);
    pgn.push('\n');
    pgn
}

/// Writes a completed game to a PGN file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_pgn<P: AsRef<Path>>(path: P, game: &Game, date: NaiveDate) -> std::io::Result<()> {
    std::fs::write(path, to_pgn(game, date))
}
