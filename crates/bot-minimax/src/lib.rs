//! Evaluation-driven strategies for the bot arena.
//!
//! - [`MinimaxBot`] searches a fixed number of plies with negamax and
//!   alpha-beta pruning over the full static evaluation
//! - [`GreedyBot`] grabs the most material it can this move
//! - [`GenerousBot`] looks for the move that gives the opponent the most
//!   material, a punching bag for the others

pub mod eval;
pub mod search;

use bot_arena::Strategy;
use chess_rules::{Move, Position, RuleSet, StandardChess};
use tracing::debug;

use crate::eval::{evaluate, material_balance};
use crate::search::Searcher;

/// Search depth used when none is configured.
pub const DEFAULT_DEPTH: u8 = 3;

/// Fallback for a position without legal moves, which the arena never asks
/// about. Any illegal move would do.
fn first_legal(position: &Position) -> Move {
    StandardChess
        .legal_moves(position)
        .into_iter()
        .next()
        .unwrap_or(Move::Put {
            role: chess_rules::Role::Pawn,
            to: chess_rules::Square::A1,
        })
}

/// Fixed-depth negamax over material, piece-square tables, mobility and king
/// safety.
#[derive(Debug, Clone)]
pub struct MinimaxBot {
    depth: u8,
}

impl MinimaxBot {
    /// Creates a bot searching `depth` plies. A depth of 0 is raised to 1.
    pub fn new(depth: u8) -> Self {
        Self {
            depth: depth.max(1),
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }
}

impl Default for MinimaxBot {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl Strategy for MinimaxBot {
    fn select_move(&mut self, position: &Position) -> Move {
        let mut searcher = Searcher::new(evaluate);
        match searcher.search(position, self.depth) {
            Some(result) => {
                debug!(
                    depth = self.depth,
                    score = result.score,
                    nodes = result.nodes,
                    "search finished"
                );
                result.best
            }
            None => first_legal(position),
        }
    }
}

/// Takes whatever wins the most material right now.
///
/// Looks one ply ahead and counts material only, so it happily trades its
/// queen for a pawn if the pawn is the biggest capture on the board.
#[derive(Debug, Clone, Default)]
pub struct GreedyBot;

impl Strategy for GreedyBot {
    fn select_move(&mut self, position: &Position) -> Move {
        Searcher::new(material_balance)
            .search(position, 1)
            .map(|result| result.best)
            .unwrap_or_else(|| first_legal(position))
    }
}

/// Plays the move after which the opponent's best reply wins the most
/// material.
#[derive(Debug, Clone, Default)]
pub struct GenerousBot;

impl Strategy for GenerousBot {
    fn select_move(&mut self, position: &Position) -> Move {
        let scores = Searcher::new(material_balance).root_scores(position, 2);
        let mut worst: Option<(Move, i32)> = None;
        for (mv, score) in scores {
            if worst.as_ref().is_none_or(|(_, s)| score < *s) {
                worst = Some((mv, score));
            }
        }
        worst
            .map(|(mv, _)| mv)
            .unwrap_or_else(|| first_legal(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::material;
    use chess_rules::{Color, GameResult};

    fn position(fen: &str) -> Position {
        StandardChess.parse_fen(fen).unwrap()
    }

    fn uci(mv: &Move) -> String {
        StandardChess.to_uci(mv)
    }

    /// Plays a game between two strategies and returns the final position.
    fn play(white: &mut dyn Strategy, black: &mut dyn Strategy, max_plies: usize) -> Position {
        let rules = StandardChess;
        let mut position = rules.initial_position();
        for ply in 0..max_plies {
            if rules.outcome(&position).is_some() {
                break;
            }
            let mover: &mut dyn Strategy = if ply % 2 == 0 { &mut *white } else { &mut *black };
            let mv = mover.select_move(&position);
            assert!(rules.is_legal(&position, &mv), "illegal move {}", uci(&mv));
            rules.apply_move(&mut position, &mv).unwrap();
        }
        position
    }

    #[test]
    fn test_minimax_mates_in_one() {
        let pos = position("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        assert_eq!(uci(&MinimaxBot::new(2).select_move(&pos)), "a1a8");
    }

    #[test]
    fn test_minimax_avoids_hanging_queen() {
        // Qxd5 would lose the queen to exd5.
        let pos = position("4k3/8/4p3/3p4/8/8/8/3QK3 w - - 0 1");
        assert_ne!(uci(&MinimaxBot::new(2).select_move(&pos)), "d1d5");
    }

    #[test]
    fn test_depth_is_at_least_one() {
        assert_eq!(MinimaxBot::new(0).depth(), 1);
        assert_eq!(MinimaxBot::default().depth(), DEFAULT_DEPTH);
    }

    #[test]
    fn test_greedy_takes_biggest_piece() {
        let pos = position("4k3/8/8/3q4/8/1r6/8/1R1RK3 w - - 0 1");
        assert_eq!(uci(&GreedyBot.select_move(&pos)), "d1d5");
    }

    #[test]
    fn test_generous_offers_material() {
        let pos = position("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1");
        let mv = GenerousBot.select_move(&pos);
        assert_ne!(uci(&mv), "d1d5", "never takes the free queen");

        let scores = Searcher::new(material_balance).root_scores(&pos, 2);
        let min = scores.iter().map(|(_, s)| *s).min().unwrap();
        assert_eq!(scores.iter().find(|(m, _)| *m == mv).unwrap().1, min);
    }

    #[test]
    fn test_minimax_beats_generous() {
        let end = play(&mut MinimaxBot::new(2), &mut GenerousBot, 40);
        let ahead = material(end.board(), Color::White) > material(end.board(), Color::Black);
        assert!(ahead || StandardChess.outcome(&end) == Some(GameResult::WhiteWins));
    }

    #[test]
    fn test_bots_play_legal_games() {
        play(&mut GreedyBot, &mut MinimaxBot::new(1), 40);
        play(&mut GenerousBot, &mut GreedyBot, 40);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn minimax_moves_are_legal(choices in proptest::collection::vec(0usize..64, 0..30)) {
                let rules = StandardChess;
                let mut position = rules.initial_position();
                for choice in choices {
                    let moves = rules.legal_moves(&position);
                    if moves.is_empty() {
                        break;
                    }
                    rules.apply_move(&mut position, &moves[choice % moves.len()]).unwrap();
                }
                prop_assume!(rules.outcome(&position).is_none());

                let mv = bot_arena::Strategy::select_move(&mut MinimaxBot::new(2), &position);
                prop_assert!(rules.is_legal(&position, &mv));
            }
        }
    }
}
