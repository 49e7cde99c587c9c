//! Opening book used to seed the first plies of every game.
//!
//! Deterministic bots would otherwise replay the same game every time they
//! meet. Each game starts from a line sampled uniformly from the book.

use rand::seq::IndexedRandom;
use rand::Rng;

/// Plies seeded from the book when nothing else is configured.
pub const DEFAULT_OPENING_PLIES: usize = 4;

/// Recorded human opening lines, in UCI notation.
const BUILTIN_LINES: &[&[&str]] = &[
    // Ruy Lopez
    &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6"],
    // Italian Game
    &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5", "c2c3", "g8f6"],
    // Sicilian Najdorf
    &["e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6"],
    // French Defence
    &["e2e4", "e7e6", "d2d4", "d7d5", "b1c3", "g8f6", "c1g5", "f8e7"],
    // Caro-Kann
    &["e2e4", "c7c6", "d2d4", "d7d5", "b1c3", "d5e4", "c3e4", "c8f5"],
    // Queen's Gambit Declined
    &["d2d4", "d7d5", "c2c4", "e7e6", "b1c3", "g8f6", "c1g5", "f8e7"],
    // Slav Defence
    &["d2d4", "d7d5", "c2c4", "c7c6", "g1f3", "g8f6", "b1c3", "d5c4"],
    // King's Indian Defence
    &["d2d4", "g8f6", "c2c4", "g7g6", "b1c3", "f8g7", "e2e4", "d7d6"],
    // English Opening
    &["c2c4", "e7e5", "b1c3", "g8f6", "g1f3", "b8c6", "g2g3", "d7d5"],
    // Scandinavian Defence
    &["e2e4", "d7d5", "e4d5", "d8d5", "b1c3", "d5a5", "d2d4", "g8f6"],
    // London System
    &["d2d4", "d7d5", "c1f4", "g8f6", "e2e3", "e7e6", "g1f3", "c7c5"],
    // Reti Opening
    &["g1f3", "d7d5", "c2c4", "e7e6", "g2g3", "g8f6", "f1g2", "f8e7"],
];

/// A set of opening lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningBook {
    lines: Vec<Vec<String>>,
}

impl Default for OpeningBook {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OpeningBook {
    /// The built-in book of common openings.
    pub fn builtin() -> Self {
        Self::from_lines(
            BUILTIN_LINES
                .iter()
                .map(|line| line.iter().map(|uci| uci.to_string()).collect())
                .collect(),
        )
    }

    /// A book of custom lines. Empty lines are dropped.
    pub fn from_lines(lines: Vec<Vec<String>>) -> Self {
        Self {
            lines: lines.into_iter().filter(|l| !l.is_empty()).collect(),
        }
    }

    /// A book that never seeds anything.
    pub fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn lines(&self) -> &[Vec<String>] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Picks a line uniformly and returns at most its first `plies` moves.
    ///
    /// Returns an empty line if the book is empty or `plies` is zero.
    pub fn choose<R: Rng + ?Sized>(&self, plies: usize, rng: &mut R) -> Vec<String> {
        if plies == 0 {
            return Vec::new();
        }
        self.lines
            .choose(rng)
            .map(|line| line.iter().take(plies).cloned().collect())
            .unwrap_or_default()
    }
}
