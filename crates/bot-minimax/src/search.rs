//! Negamax search with alpha-beta pruning.
//!
//! The search owns its position and walks the tree by applying and undoing
//! moves in place, so one search never touches another game's board.

use chess_rules::{GameResult, Move, Position, RuleSet, StandardChess};

use crate::eval::piece_value;

/// Score of being checkmated at the root. Mates closer to the root score
/// further from zero.
pub const MATE_SCORE: i32 = 100_000;

/// An evaluation function, scoring for the side to move.
pub type Evaluator = fn(&Position) -> i32;

/// Search state
pub struct Searcher {
    evaluate: Evaluator,
    nodes: u64,
}

/// Best root move and its score for the side to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub best: Move,
    pub score: i32,
    pub nodes: u64,
}

impl Searcher {
    pub fn new(evaluate: Evaluator) -> Self {
        Self { evaluate, nodes: 0 }
    }

    /// Nodes visited so far.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Scores every root move to `depth` plies with a full window.
    ///
    /// Slower than [`search`](Self::search), which only needs the best move,
    /// but every score is exact.
    pub fn root_scores(&mut self, position: &Position, depth: u8) -> Vec<(Move, i32)> {
        self.scan_root(position, depth, false)
    }

    /// The best move at `depth` plies, or `None` if there is no legal move.
    ///
    /// Ties go to the move searched first.
    pub fn search(&mut self, position: &Position, depth: u8) -> Option<SearchResult> {
        let mut best: Option<(Move, i32)> = None;
        for (mv, score) in self.scan_root(position, depth, true) {
            if best.as_ref().is_none_or(|(_, s)| score > *s) {
                best = Some((mv, score));
            }
        }
        best.map(|(best, score)| SearchResult {
            best,
            score,
            nodes: self.nodes,
        })
    }

    /// With `prune`, scores of moves that cannot beat an earlier one are
    /// only upper bounds.
    fn scan_root(&mut self, position: &Position, depth: u8, prune: bool) -> Vec<(Move, i32)> {
        let rules = StandardChess;
        let mut position = position.clone();
        let mut alpha = -MATE_SCORE - 1;
        let beta = MATE_SCORE + 1;
        let mut scored = Vec::new();

        for mv in ordered_moves(&position) {
            if rules.apply_move(&mut position, &mv).is_err() {
                continue;
            }
            let score = -self.negamax(&mut position, depth.saturating_sub(1), 1, -beta, -alpha);
            let _ = rules.undo_move(&mut position);
            if prune {
                alpha = alpha.max(score);
            }
            scored.push((mv, score));
        }
        scored
    }

    fn negamax(
        &mut self,
        position: &mut Position,
        depth: u8,
        ply: i32,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        self.nodes += 1;
        let rules = StandardChess;

        match rules.outcome(position) {
            // The side to move has been mated.
            Some(GameResult::WhiteWins | GameResult::BlackWins) => return -MATE_SCORE + ply,
            Some(GameResult::Draw(_)) => return 0,
            None => {}
        }
        if depth == 0 {
            return (self.evaluate)(position);
        }

        for mv in ordered_moves(position) {
            if rules.apply_move(position, &mv).is_err() {
                continue;
            }
            let score = -self.negamax(position, depth - 1, ply + 1, -beta, -alpha);
            let _ = rules.undo_move(position);

            if score >= beta {
                return beta; // Beta cutoff
            }
            alpha = alpha.max(score);
        }
        alpha
    }
}

/// Legal moves with captures first, most valuable victim first.
fn ordered_moves(position: &Position) -> Vec<Move> {
    let mut moves = StandardChess.legal_moves(position);
    moves.sort_by_key(|mv| {
        let victim = mv.capture().map_or(0, piece_value);
        let promotion = mv.promotion().map_or(0, piece_value);
        -(victim * 10 + promotion - piece_value(mv.role()) / 10)
    });
    moves
}
