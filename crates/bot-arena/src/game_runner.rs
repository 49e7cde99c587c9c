//! Game execution logic for running matches between in-process bots.
//!
//! This module provides the [`GameRunner`] struct for executing a single game
//! between two [`Strategy`] instances, handling the complete game loop from
//! opening seeding to result determination.

use chess_rules::{Color, DrawReason, GameResult, Move, Position, RuleSet, RulesError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::strategy::{BotState, Strategy};

/// Errors that can occur during game execution.
///
/// These are failures of the rules provider or of the game setup, not of
/// the bots: a bot playing an illegal move loses the game instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The rules provider rejected the starting position or a move.
    #[error("rules error: {0}")]
    Rules(#[from] RulesError),
    /// An opening line contained a move that is illegal where it was played.
    #[error("invalid opening move {uci} at ply {ply}: {source}")]
    InvalidOpening {
        uci: String,
        ply: usize,
        #[source]
        source: RulesError,
    },
    /// [`GameRunner::play_game`] was called on a runner that already ran.
    #[error("game already played")]
    AlreadyPlayed,
}

/// The outcome of a chess game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// White won the game (by checkmate or forfeit).
    WhiteWins,
    /// Black won the game (by checkmate or forfeit).
    BlackWins,
    /// The game ended in a draw.
    Draw,
}

impl Outcome {
    /// Score from white's point of view.
    pub fn white_score(self) -> f64 {
        match self {
            Outcome::WhiteWins => 1.0,
            Outcome::BlackWins => 0.0,
            Outcome::Draw => 0.5,
        }
    }

    /// PGN result token.
    pub fn as_pgn(self) -> &'static str {
        match self {
            Outcome::WhiteWins => "1-0",
            Outcome::BlackWins => "0-1",
            Outcome::Draw => "1/2-1/2",
        }
    }

    fn win_for(color: Color) -> Self {
        match color {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    Repetition,
    /// A bot returned a move that was not legal and lost.
    Forfeit {
        /// Id of the bot that played the illegal move.
        offender: String,
        /// The attempted move in UCI notation.
        attempted: String,
    },
}

impl Termination {
    /// Human-readable description, used for the PGN `Termination` tag.
    pub fn describe(&self) -> String {
        match self {
            Termination::Checkmate => "checkmate".to_string(),
            Termination::Stalemate => "stalemate".to_string(),
            Termination::InsufficientMaterial => "insufficient material".to_string(),
            Termination::FiftyMoveRule => "fifty-move rule".to_string(),
            Termination::Repetition => "threefold repetition".to_string(),
            Termination::Forfeit {
                offender,
                attempted,
            } => format!("forfeit: {} played illegal move {}", offender, attempted),
        }
    }

    pub fn is_forfeit(&self) -> bool {
        matches!(self, Termination::Forfeit { .. })
    }
}

fn classify(result: GameResult) -> (Outcome, Termination) {
    match result {
        GameResult::WhiteWins => (Outcome::WhiteWins, Termination::Checkmate),
        GameResult::BlackWins => (Outcome::BlackWins, Termination::Checkmate),
        GameResult::Draw(reason) => (
            Outcome::Draw,
            match reason {
                DrawReason::Stalemate => Termination::Stalemate,
                DrawReason::InsufficientMaterial => Termination::InsufficientMaterial,
                DrawReason::FiftyMoveRule => Termination::FiftyMoveRule,
                DrawReason::ThreefoldRepetition => Termination::Repetition,
            },
        ),
    }
}

/// A completed game.
///
/// `moves` holds every ply in SAN, the seeded opening plies first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub white: String,
    pub black: String,
    /// FEN the game started from, before the opening plies.
    pub start_fen: String,
    /// How many of `moves` were seeded from the opening book.
    pub opening_plies: usize,
    pub moves: Vec<String>,
    pub outcome: Outcome,
    pub termination: Termination,
}

impl Game {
    /// Id of the winning bot, or `None` for a draw.
    pub fn winner(&self) -> Option<&str> {
        match self.outcome {
            Outcome::WhiteWins => Some(&self.white),
            Outcome::BlackWins => Some(&self.black),
            Outcome::Draw => None,
        }
    }
}

/// Lifecycle of a [`GameRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    NotStarted,
    InProgress,
    Complete,
}

/// One side of a game: a bot id, its strategy and its saved state.
pub struct Seat {
    pub id: String,
    strategy: Box<dyn Strategy>,
    state: Option<BotState>,
}

impl Seat {
    pub fn new(id: impl Into<String>, strategy: Box<dyn Strategy>, state: Option<BotState>) -> Self {
        Self {
            id: id.into(),
            strategy,
            state,
        }
    }

    /// Runs one turn: restore state, ask for a move, keep whatever is saved.
    fn take_turn(&mut self, position: &Position) -> Move {
        self.strategy.load_state(self.state.as_ref());
        let mv = self.strategy.select_move(position);
        if let Some(saved) = self.strategy.save_state() {
            self.state = Some(saved);
        }
        mv
    }

    /// The latest state saved by the strategy, or the one it started with.
    pub fn state(&self) -> Option<&BotState> {
        self.state.as_ref()
    }
}

/// Executes one game between two bots.
///
/// The runner owns the game's [`Position`] and the two [`Seat`]s. It never
/// decides legality or game end itself; both come from the [`RuleSet`].
/// There is no move cap: the automatic draw rules bound every game.
///
/// # Example
///
/// ```
/// use bot_arena::game_runner::{GameRunner, Seat};
/// use bot_arena::strategy::Strategy;
/// use chess_rules::{Move, Position, RuleSet, StandardChess, STARTING_FEN};
///
/// struct FirstMove;
///
/// impl Strategy for FirstMove {
///     fn select_move(&mut self, position: &Position) -> Move {
///         StandardChess.legal_moves(position).remove(0)
///     }
/// }
///
/// let white = Seat::new("a", Box::new(FirstMove), None);
/// let black = Seat::new("b", Box::new(FirstMove), None);
/// let mut runner = GameRunner::new(&StandardChess, white, black);
/// let game = runner.play_game(STARTING_FEN, &[]).unwrap();
/// assert!(!game.moves.is_empty());
/// ```
pub struct GameRunner<'r, R: RuleSet> {
    rules: &'r R,
    white: Seat,
    black: Seat,
    phase: GamePhase,
}

impl<'r, R: RuleSet> GameRunner<'r, R> {
    /// Creates a new game runner for the given seats.
    pub fn new(rules: &'r R, white: Seat, black: Seat) -> Self {
        Self {
            rules,
            white,
            black,
            phase: GamePhase::NotStarted,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Plays a complete game.
    ///
    /// # Arguments
    ///
    /// * `start_fen` - Position the game starts from
    /// * `opening` - UCI moves applied before the bots take over
    ///
    /// # Errors
    ///
    /// Returns an error if the starting FEN or an opening move is rejected by
    /// the rules provider, or if this runner has already played.
    pub fn play_game(&mut self, start_fen: &str, opening: &[String]) -> Result<Game, GameError> {
        if self.phase != GamePhase::NotStarted {
            return Err(GameError::AlreadyPlayed);
        }
        self.phase = GamePhase::InProgress;
        let result = self.run(start_fen, opening);
        self.phase = GamePhase::Complete;
        result
    }

    fn run(&mut self, start_fen: &str, opening: &[String]) -> Result<Game, GameError> {
        let rules = self.rules;
        let mut position = rules.parse_fen(start_fen)?;
        let mut moves = Vec::new();

        for (ply, uci) in opening.iter().enumerate() {
            let mv = rules
                .parse_uci(&position, uci)
                .map_err(|source| GameError::InvalidOpening {
                    uci: uci.clone(),
                    ply,
                    source,
                })?;
            moves.push(rules.to_san(&position, &mv));
            rules.apply_move(&mut position, &mv)?;
        }

        let (outcome, termination) = loop {
            if let Some(result) = rules.outcome(&position) {
                break classify(result);
            }

            let side = position.turn();
            let seat = match side {
                Color::White => &mut self.white,
                Color::Black => &mut self.black,
            };
            let mv = seat.take_turn(&position);

            if !rules.is_legal(&position, &mv) {
                let attempted = rules.to_uci(&mv);
                warn!(bot = %seat.id, mv = %attempted, "illegal move, forfeiting");
                break (
                    Outcome::win_for(!side),
                    Termination::Forfeit {
                        offender: seat.id.clone(),
                        attempted,
                    },
                );
            }

            let san = rules.to_san(&position, &mv);
            debug!(bot = %seat.id, ply = position.ply_count(), mv = %san, "move");
            rules.apply_move(&mut position, &mv)?;
            moves.push(san);
        };

        info!(
            white = %self.white.id,
            black = %self.black.id,
            result = outcome.as_pgn(),
            termination = %termination.describe(),
            plies = moves.len(),
            "game finished"
        );

        Ok(Game {
            white: self.white.id.clone(),
            black: self.black.id.clone(),
            start_fen: start_fen.to_string(),
            opening_plies: opening.len(),
            moves,
            outcome,
            termination,
        })
    }

    /// Final states of white and black.
    pub fn into_states(self) -> (Option<BotState>, Option<BotState>) {
        (self.white.state, self.black.state)
    }
}
