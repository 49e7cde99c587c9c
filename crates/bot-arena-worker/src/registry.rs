//! Strategy registry: builds the roster from configured strategy names.

use anyhow::{bail, Context, Result};
use bot_arena::config::{ArenaConfig, BotConfig};
use bot_arena::{BotDescriptor, Roster};
use bot_minimax::{GenerousBot, GreedyBot, MinimaxBot, DEFAULT_DEPTH};
use bot_random::{DigitStreamBot, RandomBot};

/// Names accepted in `strategy = "..."`.
pub const STRATEGIES: [&str; 5] = ["random", "digits", "greedy", "generous", "minimax"];

/// Builds the descriptor for one configured bot.
///
/// # Errors
///
/// Returns an error for an unknown strategy name or an out-of-range depth.
pub fn descriptor(id: &str, config: &BotConfig) -> Result<BotDescriptor> {
    let bot = match config.strategy.as_str() {
        "random" => match config.seed {
            Some(seed) => BotDescriptor::new(id, move || RandomBot::seeded(seed)),
            None => BotDescriptor::new(id, RandomBot::new),
        },
        "digits" => BotDescriptor::new(id, DigitStreamBot::new),
        "greedy" => BotDescriptor::new(id, || GreedyBot),
        "generous" => BotDescriptor::new(id, || GenerousBot),
        "minimax" => {
            let depth = match config.depth {
                Some(depth) => u8::try_from(depth)
                    .with_context(|| format!("bot {}: depth {} is too large", id, depth))?,
                None => DEFAULT_DEPTH,
            };
            BotDescriptor::new(id, move || MinimaxBot::new(depth))
        }
        other => bail!(
            "bot {}: unknown strategy {:?}, expected one of {:?}",
            id,
            other,
            STRATEGIES
        ),
    };
    Ok(bot
        .with_creator(config.creator.clone())
        .with_color(config.color.clone()))
}

/// The roster used when the config names no bots: one bot per strategy.
pub fn default_bots() -> Vec<(String, BotConfig)> {
    let colors = ["#9ca3af", "#f59e0b", "#ef4444", "#22c55e", "#3b82f6"];
    STRATEGIES
        .iter()
        .zip(colors)
        .map(|(strategy, color)| {
            (
                strategy.to_string(),
                BotConfig {
                    strategy: strategy.to_string(),
                    creator: "arena".to_string(),
                    color: color.to_string(),
                    depth: None,
                    seed: None,
                },
            )
        })
        .collect()
}

/// Builds the roster from the `[bots]` tables of the config.
///
/// # Errors
///
/// Returns an error if any bot cannot be built.
pub fn build_roster(config: &ArenaConfig) -> Result<Roster> {
    let bots: Vec<(String, BotConfig)> = if config.bots.is_empty() {
        tracing::info!("No bots configured, using the default roster");
        default_bots()
    } else {
        config
            .bots
            .iter()
            .map(|(id, bot)| (id.clone(), bot.clone()))
            .collect()
    };

    let mut roster = Roster::new();
    for (id, bot) in &bots {
        roster.register(descriptor(id, bot)?)?;
    }
    Ok(roster)
}
