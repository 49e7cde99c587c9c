//! Rating-aware random pairing of the roster for one round.
//!
//! Bots are visited in shuffled order. Each one picks an opponent among the
//! bots still unpaired, with a Gaussian preference for similar ratings, so
//! close matchups are likely but any pairing remains possible.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default width of the rating preference.
pub const DEFAULT_SIGMA: f64 = 128.0;

/// One entry of a round's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pairing {
    /// A game; `white` is the bot that was drawn first.
    Match { white: String, black: String },
    /// A bot that sits this round out.
    Bye { bot: String },
}

impl Pairing {
    /// Bot ids taking part in this entry.
    pub fn bots(&self) -> Vec<&str> {
        match self {
            Pairing::Match { white, black } => vec![white.as_str(), black.as_str()],
            Pairing::Bye { bot } => vec![bot.as_str()],
        }
    }
}

/// Pairs bots for a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matchmaker {
    sigma: f64,
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new(DEFAULT_SIGMA)
    }
}

impl Matchmaker {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Unnormalised preference for pairing a bot rated `rating` with one
    /// rated `other`. 1.0 for equal ratings, falling towards 0 with distance.
    pub fn weight(&self, rating: f64, other: f64) -> f64 {
        let diff = other - rating;
        (-(diff * diff) / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// Builds the schedule for one round.
    ///
    /// Every bot appears exactly once, either in a match or as the single
    /// bye of an odd-sized roster. No bot is paired with itself.
    ///
    /// # Arguments
    ///
    /// * `ratings` - `(bot id, current match rating)` for the whole roster
    /// * `rng` - Source of randomness for the shuffle and the draws
    pub fn pair<R: Rng + ?Sized>(&self, ratings: &[(String, f64)], rng: &mut R) -> Vec<Pairing> {
        let mut pool = ratings.to_vec();
        pool.shuffle(rng);

        let mut pairings = Vec::with_capacity(pool.len().div_ceil(2));
        while !pool.is_empty() {
            let (bot, rating) = pool.remove(0);
            if pool.is_empty() {
                pairings.push(Pairing::Bye { bot });
                break;
            }

            let index = self.pick_opponent(rating, &pool, rng);
            let (opponent, _) = pool.remove(index);
            pairings.push(Pairing::Match {
                white: bot,
                black: opponent,
            });
        }
        pairings
    }

    fn pick_opponent<R: Rng + ?Sized>(
        &self,
        rating: f64,
        candidates: &[(String, f64)],
        rng: &mut R,
    ) -> usize {
        let weights: Vec<f64> = candidates
            .iter()
            .map(|(_, other)| self.weight(rating, *other))
            .collect();
        match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // Every weight underflowed: fall back to the closest rating.
            Err(_) => candidates
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (a.1 - rating).abs().total_cmp(&(b.1 - rating).abs()))
                .map(|(i, _)| i)
                .unwrap_or(0),
        }
    }
}
