//! Move-rules provider for the bot arena.
//!
//! This crate is the single seam between the arena and the rules of chess.
//! Move generation, check detection and notation come from [`shakmaty`];
//! this crate adds what the arena needs on top of it:
//!
//! - [`Position`] - an owned board with an apply/undo history stack
//! - [`RuleSet`] - the provider contract the match runner and puzzle
//!   evaluator are written against
//! - [`StandardChess`] - the standard rules, including the fifty-move rule
//!   and threefold repetition
//!
//! # Example
//!
//! ```
//! use chess_rules::{RuleSet, StandardChess};
//!
//! let rules = StandardChess;
//! let mut position = rules.initial_position();
//! let mv = rules.parse_uci(&position, "e2e4").unwrap();
//! assert_eq!(rules.to_san(&position, &mv), "e4");
//! rules.apply_move(&mut position, &mv).unwrap();
//! assert_eq!(rules.legal_moves(&position).len(), 20);
//! ```

mod position;
pub mod rules;

pub use position::Position;
pub use rules::{DrawReason, GameResult, RuleSet, RulesError, StandardChess, STARTING_FEN};
pub use shakmaty::{Color, Move, Role, Square};
