//! The bot strategy interface and the roster of registered bots.
//!
//! A [`Strategy`] is the only thing a bot author implements. The arena owns
//! everything else: it creates a fresh strategy instance per game from the
//! bot's [`BotDescriptor`], hands it the bot's saved [`BotState`] before each
//! turn, and persists whatever the strategy saves afterwards.

use chess_rules::{Move, Position};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque per-bot state, round-tripped between turns.
///
/// Only the strategy that produced a state interprets its contents; the arena
/// stores and returns it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotState(String);

impl BotState {
    /// Wraps a serialized state blob.
    pub fn new(blob: impl Into<String>) -> Self {
        Self(blob.into())
    }

    /// The serialized contents.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Store path of a bot's saved state.
pub fn state_path(bot: &str) -> String {
    format!("state/{}", bot)
}

/// A chess-playing strategy.
///
/// The arena calls the methods of a strategy in a fixed order on every turn:
///
/// 1. [`load_state`](Strategy::load_state) with the bot's last saved state
///    (`None` the first time the bot ever plays)
/// 2. [`select_move`](Strategy::select_move) with a copy of the position
/// 3. [`save_state`](Strategy::save_state); `None` keeps the previous state
///
/// `select_move` is only called when the side to move has at least one legal
/// move, and must return one of them. A strategy that returns an illegal move
/// forfeits the game. The arena imposes no time limit.
pub trait Strategy: Send {
    /// Chooses a move for the side to move.
    fn select_move(&mut self, position: &Position) -> Move;

    /// Restores cross-turn memory.
    fn load_state(&mut self, _state: Option<&BotState>) {}

    /// Returns the state to persist after this turn.
    fn save_state(&self) -> Option<BotState> {
        None
    }
}

/// Creates fresh strategy instances for a bot.
pub type StrategyFactory = Arc<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// Identity and display metadata of a bot, bound to its strategy.
#[derive(Clone)]
pub struct BotDescriptor {
    /// Unique bot id, used as the key for ratings and state.
    pub id: String,
    /// Who wrote the bot.
    pub creator: String,
    /// Accent color used by presentation layers, e.g. `#3b82f6`.
    pub color: String,
    factory: StrategyFactory,
}

impl fmt::Debug for BotDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotDescriptor")
            .field("id", &self.id)
            .field("creator", &self.creator)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl BotDescriptor {
    /// Creates a descriptor from an id and a strategy constructor.
    ///
    /// # Example
    ///
    /// ```
    /// use bot_arena::strategy::{BotDescriptor, Strategy};
    /// use chess_rules::{Move, Position, RuleSet, StandardChess};
    ///
    /// struct FirstMove;
    ///
    /// impl Strategy for FirstMove {
    ///     fn select_move(&mut self, position: &Position) -> Move {
    ///         StandardChess.legal_moves(position).remove(0)
    ///     }
    /// }
    ///
    /// let bot = BotDescriptor::new("first", || FirstMove).with_creator("docs");
    /// assert_eq!(bot.id, "first");
    /// ```
    pub fn new<S, F>(id: impl Into<String>, factory: F) -> Self
    where
        S: Strategy + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            creator: String::new(),
            color: String::new(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Strategy>),
        }
    }

    /// Sets the creator shown next to the bot.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Sets the accent color shown next to the bot.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Creates a fresh strategy instance for one game or puzzle batch.
    pub fn instantiate(&self) -> Box<dyn Strategy> {
        (self.factory)()
    }
}

/// Errors raised while building a roster.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RosterError {
    /// Two bots share the same id.
    #[error("duplicate bot id: {0}")]
    DuplicateId(String),
}

/// The set of bots taking part in the arena.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    bots: Vec<BotDescriptor>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bot.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::DuplicateId`] if a bot with the same id is
    /// already registered.
    pub fn register(&mut self, bot: BotDescriptor) -> Result<(), RosterError> {
        if self.get(&bot.id).is_some() {
            return Err(RosterError::DuplicateId(bot.id));
        }
        self.bots.push(bot);
        Ok(())
    }

    /// Looks up a bot by id.
    pub fn get(&self, id: &str) -> Option<&BotDescriptor> {
        self.bots.iter().find(|b| b.id == id)
    }

    /// Bot ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.bots.iter().map(|b| b.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BotDescriptor> {
        self.bots.iter()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

impl FromIterator<BotDescriptor> for Roster {
    /// Collects bots, keeping the first of any duplicated id.
    fn from_iter<I: IntoIterator<Item = BotDescriptor>>(iter: I) -> Self {
        let mut roster = Roster::new();
        for bot in iter {
            let _ = roster.register(bot);
        }
        roster
    }
}
