//! Rule set abstraction for the arena.
//!
//! This module provides the [`RuleSet`] trait, the contract every consumer of
//! chess rules in the arena is written against, and [`StandardChess`], its
//! implementation for standard chess.

use crate::Position;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Position as _};
use thiserror::Error;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors reported by the rules provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The FEN string could not be parsed or describes an impossible position.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
    /// The UCI string could not be parsed.
    #[error("invalid UCI move: {0}")]
    InvalidUci(String),
    /// The move is not legal in the position.
    #[error("illegal move: {0}")]
    IllegalMove(String),
    /// There is no move to undo.
    #[error("no move to undo")]
    EmptyHistory,
}

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    /// White checkmated black.
    WhiteWins,
    /// Black checkmated white.
    BlackWins,
    /// Draw with a specific reason.
    Draw(DrawReason),
}

/// Reason for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    /// No legal moves but not in check.
    Stalemate,
    /// Neither side can possibly checkmate.
    InsufficientMaterial,
    /// 100 half-moves without a capture or pawn move.
    FiftyMoveRule,
    /// The same position occurred three times.
    ThreefoldRepetition,
}

/// The move-rules provider contract.
///
/// The arena never decides legality or game end itself; it asks a `RuleSet`.
/// Moves are applied in place and can be undone, so searches can walk a
/// single owned [`Position`] down and back up the tree.
pub trait RuleSet {
    /// Returns the initial position for this rule set.
    fn initial_position(&self) -> Position;

    /// Parses a position from FEN.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidFen`] if the string is malformed or the
    /// position is not legal.
    fn parse_fen(&self, fen: &str) -> Result<Position, RulesError>;

    /// Generates all legal moves for the side to move.
    fn legal_moves(&self, position: &Position) -> Vec<Move>;

    /// Returns true if `mv` is legal in the position.
    fn is_legal(&self, position: &Position, mv: &Move) -> bool {
        self.legal_moves(position).contains(mv)
    }

    /// Plays a move on the position.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::IllegalMove`] and leaves the position untouched
    /// if the move is not legal.
    fn apply_move(&self, position: &mut Position, mv: &Move) -> Result<(), RulesError>;

    /// Takes back the last move and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::EmptyHistory`] if no move has been played.
    fn undo_move(&self, position: &mut Position) -> Result<Move, RulesError>;

    /// Returns the game result if the game is over, otherwise `None`.
    fn outcome(&self, position: &Position) -> Option<GameResult>;

    /// Standard algebraic notation for a legal move, with check suffix.
    fn to_san(&self, position: &Position, mv: &Move) -> String;

    /// Parses a UCI move (e.g. `e2e4`, `e7e8q`) in the context of a position.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidUci`] if the text is malformed and
    /// [`RulesError::IllegalMove`] if it does not name a legal move.
    fn parse_uci(&self, position: &Position, uci: &str) -> Result<Move, RulesError>;

    /// UCI notation for a move.
    fn to_uci(&self, mv: &Move) -> String;
}

/// Standard chess rules.
///
/// Games end on checkmate, stalemate, insufficient material, the fifty-move
/// rule or threefold repetition. Draw rules are applied automatically rather
/// than waiting for a claim, which bounds the length of every game.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChess;

impl RuleSet for StandardChess {
    fn initial_position(&self) -> Position {
        Position::from_chess(Chess::default())
    }

    fn parse_fen(&self, fen: &str) -> Result<Position, RulesError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
        Ok(Position::from_chess(chess))
    }

    fn legal_moves(&self, position: &Position) -> Vec<Move> {
        position.chess().legal_moves().into_iter().collect()
    }

    fn apply_move(&self, position: &mut Position, mv: &Move) -> Result<(), RulesError> {
        if !self.is_legal(position, mv) {
            return Err(RulesError::IllegalMove(self.to_uci(mv)));
        }
        position.push(mv);
        Ok(())
    }

    fn undo_move(&self, position: &mut Position) -> Result<Move, RulesError> {
        position.pop().ok_or(RulesError::EmptyHistory)
    }

    fn outcome(&self, position: &Position) -> Option<GameResult> {
        let chess = position.chess();
        if chess.is_checkmate() {
            return Some(match chess.turn() {
                Color::White => GameResult::BlackWins,
                Color::Black => GameResult::WhiteWins,
            });
        }
        if chess.is_stalemate() {
            return Some(GameResult::Draw(DrawReason::Stalemate));
        }
        if chess.is_insufficient_material() {
            return Some(GameResult::Draw(DrawReason::InsufficientMaterial));
        }
        if chess.halfmoves() >= 100 {
            return Some(GameResult::Draw(DrawReason::FiftyMoveRule));
        }
        if position.repetitions() >= 3 {
            return Some(GameResult::Draw(DrawReason::ThreefoldRepetition));
        }
        None
    }

    fn to_san(&self, position: &Position, mv: &Move) -> String {
        SanPlus::from_move(position.chess().clone(), mv).to_string()
    }

    fn parse_uci(&self, position: &Position, uci: &str) -> Result<Move, RulesError> {
        let parsed: UciMove = uci
            .trim()
            .parse()
            .map_err(|_| RulesError::InvalidUci(uci.to_string()))?;
        parsed
            .to_move(position.chess())
            .map_err(|_| RulesError::IllegalMove(uci.to_string()))
    }

    fn to_uci(&self, mv: &Move) -> String {
        mv.to_uci(CastlingMode::Standard).to_string()
    }
}
