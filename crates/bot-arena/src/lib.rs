//! Bot Arena - A daily tournament for in-process chess bots.
//!
//! This crate pairs a roster of chess strategies by rating, plays their games,
//! tests them on puzzles, keeps Elo ratings for both, and hands the day's
//! results to presentation on a fixed schedule.
//!
//! # Modules
//!
//! - [`strategy`] - The bot interface, bot state and the roster
//! - [`game_runner`] - Plays one game between two strategies
//! - [`openings`] - Opening lines used to vary the games
//! - [`matchmaking`] - Rating-weighted random pairing
//! - [`elo`] - Match and puzzle ratings with history
//! - [`puzzles`] - Puzzle sources and the puzzle evaluator
//! - [`results`] - Compute records, leaderboard and announcements
//! - [`cadence`] - The daily compute and announce phases
//! - [`storage`] - Key-value persistence on SQLite
//! - [`config`] - TOML configuration
//! - [`pgn`] - PGN file generation

pub mod cadence;
pub mod config;
pub mod elo;
pub mod game_runner;
pub mod matchmaking;
pub mod openings;
pub mod pgn;
pub mod puzzles;
pub mod results;
pub mod storage;
pub mod strategy;

pub use cadence::{ArenaSettings, CadenceController, CadenceError, Schedule};
pub use strategy::{BotDescriptor, BotState, Roster, Strategy};
