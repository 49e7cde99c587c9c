//! A strategy driven by the decimal digits of *e*.

use bot_arena::{BotState, Strategy};
use chess_rules::{Move, Position, RuleSet, StandardChess};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::warn;

/// Number of digits cached for the bot. The cursor wraps past the end.
const STREAM_LEN: usize = 2000;

/// Digits consumed per move.
const DIGITS_PER_MOVE: usize = 2;

/// The first `count` decimal digits of *e*, starting with the leading 2.
///
/// Uses the spigot over the mixed-radix expansion
/// `e = 2 + 1/2 (1 + 1/3 (1 + 1/4 (1 + ...)))`.
pub fn e_digits(count: usize) -> Vec<u8> {
    if count == 0 {
        return Vec::new();
    }
    // n terms give n! > 10^count with a wide margin.
    let terms = count + 10;
    let mut remainders = vec![1u32; terms];
    let mut digits = Vec::with_capacity(count);
    digits.push(2);

    while digits.len() < count {
        let mut carry = 0u32;
        for (i, r) in remainders.iter_mut().enumerate().rev() {
            let base = i as u32 + 2;
            let x = *r * 10 + carry;
            *r = x % base;
            carry = x / base;
        }
        digits.push(carry as u8);
    }
    digits
}

fn stream() -> &'static [u8] {
    static DIGITS: OnceLock<Vec<u8>> = OnceLock::new();
    DIGITS.get_or_init(|| e_digits(STREAM_LEN))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Cursor {
    cursor: usize,
}

/// Picks moves by reading the digits of *e*.
///
/// Legal moves are sorted by their UCI text; the next two digits, read as a
/// number from 0 to 99, index into that list modulo its length. The position
/// in the digit stream is the bot's persisted state, so consecutive games
/// continue where the last one stopped.
#[derive(Debug, Default)]
pub struct DigitStreamBot {
    cursor: usize,
}

impl DigitStreamBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn next_value(&mut self) -> usize {
        let digits = stream();
        let mut value = 0;
        for _ in 0..DIGITS_PER_MOVE {
            value = value * 10 + usize::from(digits[self.cursor % digits.len()]);
            self.cursor = (self.cursor + 1) % digits.len();
        }
        value
    }
}

impl Strategy for DigitStreamBot {
    fn select_move(&mut self, position: &Position) -> Move {
        let rules = StandardChess;
        let mut moves = rules.legal_moves(position);
        moves.sort_by_cached_key(|mv| rules.to_uci(mv));
        let value = self.next_value();
        if moves.is_empty() {
            // Never called without a legal move; the null move forfeits.
            return Move::Put {
                role: chess_rules::Role::Pawn,
                to: chess_rules::Square::A1,
            };
        }
        moves.swap_remove(value % moves.len())
    }

    fn load_state(&mut self, state: Option<&BotState>) {
        self.cursor = match state {
            Some(state) => match serde_json::from_str::<Cursor>(state.as_str()) {
                Ok(saved) => saved.cursor,
                Err(e) => {
                    warn!(error = %e, "unreadable digit cursor, starting over");
                    0
                }
            },
            None => 0,
        };
    }

    fn save_state(&self) -> Option<BotState> {
        serde_json::to_string(&Cursor {
            cursor: self.cursor,
        })
        .ok()
        .map(BotState::new)
    }
}
