//! Owned position with apply/undo history.

use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Board, Chess, Color, EnPassantMode, Move, Position as _};

/// A ply that has been played, with the state it was played from.
#[derive(Debug, Clone)]
struct Played {
    before: Chess,
    mv: Move,
}

/// A chess position together with the moves that led to it.
///
/// `Position` is a single-writer value: the match runner owns one per game
/// and searches work on their own clone. Moves are pushed and popped through
/// a [`RuleSet`](crate::RuleSet), which validates them first.
///
/// Besides the current board, the position keeps a hash of every position
/// reached since it was created so repetitions can be counted.
#[derive(Debug, Clone)]
pub struct Position {
    current: Chess,
    played: Vec<Played>,
    hashes: Vec<u64>,
}

impl Default for Position {
    fn default() -> Self {
        Self::from_chess(Chess::default())
    }
}

impl Position {
    /// Wraps a `shakmaty` position with an empty history.
    pub fn from_chess(chess: Chess) -> Self {
        let hash = hash_of(&chess);
        Self {
            current: chess,
            played: Vec::new(),
            hashes: vec![hash],
        }
    }

    /// The underlying `shakmaty` position.
    pub fn chess(&self) -> &Chess {
        &self.current
    }

    /// The piece placement.
    pub fn board(&self) -> &Board {
        self.current.board()
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.current.turn()
    }

    /// Half-moves since the last capture or pawn move.
    pub fn halfmoves(&self) -> u32 {
        self.current.halfmoves()
    }

    /// Returns true if the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.current.is_check()
    }

    /// Number of plies played since this position was created.
    pub fn ply_count(&self) -> usize {
        self.played.len()
    }

    /// Moves played since this position was created, oldest first.
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.played.iter().map(|p| &p.mv)
    }

    /// The most recent move, if any.
    pub fn last_move(&self) -> Option<&Move> {
        self.played.last().map(|p| &p.mv)
    }

    /// How many times the current position has occurred in this history,
    /// counting the current occurrence.
    pub fn repetitions(&self) -> usize {
        let current = self.hashes.last().copied().unwrap_or_default();
        // Only positions since the last irreversible move can repeat.
        let window = self.current.halfmoves() as usize + 1;
        self.hashes
            .iter()
            .rev()
            .take(window)
            .filter(|&&h| h == current)
            .count()
    }

    /// Plays a move without checking legality.
    pub(crate) fn push(&mut self, mv: &Move) {
        let before = self.current.clone();
        self.current.play_unchecked(mv);
        self.hashes.push(hash_of(&self.current));
        self.played.push(Played {
            before,
            mv: mv.clone(),
        });
    }

    /// Restores the state before the last move and returns that move.
    pub(crate) fn pop(&mut self) -> Option<Move> {
        let last = self.played.pop()?;
        self.hashes.pop();
        self.current = last.before;
        Some(last.mv)
    }
}

fn hash_of(chess: &Chess) -> u64 {
    let hash: Zobrist64 = chess.zobrist_hash(EnPassantMode::Legal);
    hash.0
}
