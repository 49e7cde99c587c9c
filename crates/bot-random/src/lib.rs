//! Non-searching strategies for the bot arena.
//!
//! These bots never look ahead. They are the baseline every searching bot
//! should beat, and a template for writing new strategies:
//!
//! - [`RandomBot`] plays a uniformly random legal move
//! - [`DigitStreamBot`] lets the digits of *e* choose its moves, and keeps its
//!   place in the digit stream across games as persisted state

mod digits;

pub use digits::{e_digits, DigitStreamBot};

use bot_arena::Strategy;
use chess_rules::{Move, Position, RuleSet, StandardChess};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Plays a random legal move.
pub struct RandomBot {
    rng: StdRng,
}

impl RandomBot {
    /// Creates a bot seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates a bot whose moves are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomBot {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomBot {
    fn select_move(&mut self, position: &Position) -> Move {
        let moves = StandardChess.legal_moves(position);
        match moves.choose(&mut self.rng) {
            Some(mv) => mv.clone(),
            // Never called without a legal move; the null move forfeits.
            None => Move::Put {
                role: chess_rules::Role::Pawn,
                to: chess_rules::Square::A1,
            },
        }
    }
}
