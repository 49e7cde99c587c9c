//! Daily compute and announce phases.
//!
//! The [`CadenceController`] owns everything a round needs: the roster, the
//! store, the puzzle source and the tournament settings. `compute` plays the
//! day's matches and puzzles and persists a [`ComputeRecord`]; `announce`
//! reads that record back and builds an [`Announcement`] without touching
//! ratings, so it can be repeated.
//!
//! At most one compute runs at a time per controller. The compute itself is
//! blocking work (bots may search for a long time) and is moved to tokio's
//! blocking pool by [`CadenceController::spawn_compute`].

use chess_rules::{RuleSet, StandardChess, STARTING_FEN};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::elo::{RatingSystem, Track, DEFAULT_RATING, K_FACTOR};
use crate::game_runner::{GameRunner, Seat};
use crate::matchmaking::{Matchmaker, Pairing, DEFAULT_SIGMA};
use crate::openings::{OpeningBook, DEFAULT_OPENING_PLIES};
use crate::puzzles::{PuzzleEvaluator, PuzzleReport, PuzzleSource};
use crate::results::{
    announced_path, leaderboard, results_path, Announcement, ComputeRecord, ComputeStatus,
    LeaderboardEntry, MatchReport, PuzzleSummary, SkippedMatch,
};
use crate::storage::{StorageError, Store, StoreExt};
use crate::strategy::{state_path, BotState, Roster};

/// Errors raised by the cadence controller.
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Another compute is in flight.
    #[error("a compute pass is already running")]
    AlreadyRunning,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Nothing has been computed for the date.
    #[error("no compute results for {0}")]
    NotComputed(NaiveDate),
    /// The compute for the date is still running or failed.
    #[error("compute for {date} is not complete: {status:?}")]
    Incomplete {
        date: NaiveDate,
        status: ComputeStatus,
    },
    /// A strategy or the rules provider panicked during the round.
    #[error("compute panicked: {0}")]
    Panicked(String),
    /// The blocking compute task panicked or was cancelled.
    #[error("compute task failed: {0}")]
    Join(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Times of day for the two phases, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub compute_at: NaiveTime,
    pub announce_at: NaiveTime,
    pub poll_interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            compute_at: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default(),
            announce_at: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Tournament parameters.
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    pub k_factor: f64,
    pub initial_rating: f64,
    pub sigma: f64,
    pub opening_plies: usize,
    pub openings: OpeningBook,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            k_factor: K_FACTOR,
            initial_rating: DEFAULT_RATING,
            sigma: DEFAULT_SIGMA,
            opening_plies: DEFAULT_OPENING_PLIES,
            openings: OpeningBook::builtin(),
        }
    }
}

/// Proof that the holder is the only compute in flight.
///
/// Dropping the guard, including during a panic, lets the next compute in.
#[derive(Debug)]
pub struct ComputeGuard {
    flag: Arc<AtomicBool>,
}

impl ComputeGuard {
    /// Takes the guard.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::AlreadyRunning`] if it is already held.
    pub fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, CadenceError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CadenceError::AlreadyRunning)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ComputeGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What one scheduler tick started or delivered.
#[derive(Debug, Default)]
pub struct Tick {
    /// The compute started by this tick, if any.
    pub compute: Option<JoinHandle<Result<ComputeRecord, CadenceError>>>,
    /// True if an announcement was sent.
    pub announced: bool,
}

/// Runs the daily compute and announce phases.
#[derive(Clone)]
pub struct CadenceController<R = StandardChess> {
    rules: R,
    store: Arc<dyn Store>,
    roster: Arc<Roster>,
    puzzles: Option<Arc<dyn PuzzleSource>>,
    settings: ArenaSettings,
    seed: Option<u64>,
    running: Arc<AtomicBool>,
}

impl CadenceController<StandardChess> {
    /// Creates a controller playing standard chess.
    pub fn new(store: Arc<dyn Store>, roster: Arc<Roster>) -> Self {
        Self::with_rules(StandardChess, store, roster)
    }
}

impl<R> CadenceController<R>
where
    R: RuleSet + Clone + Send + Sync + 'static,
{
    pub fn with_rules(rules: R, store: Arc<dyn Store>, roster: Arc<Roster>) -> Self {
        Self {
            rules,
            store,
            roster,
            puzzles: None,
            settings: ArenaSettings::default(),
            seed: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enables the puzzle phase.
    pub fn with_puzzles(mut self, source: Arc<dyn PuzzleSource>) -> Self {
        self.puzzles = Some(source);
        self
    }

    pub fn with_settings(mut self, settings: ArenaSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Makes pairings and openings reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// True while a compute is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn ratings(&self, track: Track) -> RatingSystem<'_> {
        RatingSystem::new(self.store.as_ref(), track)
            .with_k_factor(self.settings.k_factor)
            .with_initial(self.settings.initial_rating)
    }

    /// Returns true if a compute record exists for the date, in any state.
    pub fn has_computed(&self, date: NaiveDate) -> Result<bool, CadenceError> {
        Ok(self.store.contains(&results_path(date))?)
    }

    /// The compute record for the date, if any.
    pub fn record(&self, date: NaiveDate) -> Result<Option<ComputeRecord>, CadenceError> {
        Ok(self.store.load_opt(&results_path(date))?)
    }

    /// Runs the day's matches and puzzles on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::AlreadyRunning`] if another compute holds the
    /// guard, a storage error, or [`CadenceError::Panicked`] if a bot
    /// panicked. On error the record is marked `Failed`.
    pub fn compute(&self, date: NaiveDate) -> Result<ComputeRecord, CadenceError> {
        let _guard = ComputeGuard::acquire(&self.running)?;
        self.compute_guarded(date)
    }

    /// Runs [`compute`](Self::compute) on tokio's blocking pool.
    ///
    /// The guard is taken before returning, so a second call fails
    /// immediately with [`CadenceError::AlreadyRunning`].
    pub fn spawn_compute(
        &self,
        date: NaiveDate,
    ) -> Result<JoinHandle<Result<ComputeRecord, CadenceError>>, CadenceError> {
        let guard = ComputeGuard::acquire(&self.running)?;
        let controller = self.clone();
        Ok(tokio::task::spawn_blocking(move || {
            let _guard = guard;
            controller.compute_guarded(date)
        }))
    }

    fn compute_guarded(&self, date: NaiveDate) -> Result<ComputeRecord, CadenceError> {
        let path = results_path(date);
        let mut record = ComputeRecord::started(date);
        self.store.save(&path, &record)?;
        info!(%date, bots = self.roster.len(), "compute started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_round(date, &mut record)))
            .unwrap_or_else(|payload| Err(CadenceError::Panicked(panic_message(payload.as_ref()))));
        record.finished_at = Some(Utc::now());
        match outcome {
            Ok(()) => {
                record.status = ComputeStatus::Complete;
                self.store.save(&path, &record)?;
                info!(
                    %date,
                    games = record.matches.len(),
                    skipped = record.skipped.len(),
                    puzzles = record.puzzles.is_some(),
                    "compute complete"
                );
                Ok(record)
            }
            Err(e) => {
                error!(%date, error = %e, "compute failed");
                record.status = ComputeStatus::Failed {
                    reason: e.to_string(),
                };
                if let Err(save_error) = self.store.save(&path, &record) {
                    error!(%date, error = %save_error, "failed to record compute failure");
                }
                Err(e)
            }
        }
    }

    fn run_round(&self, date: NaiveDate, record: &mut ComputeRecord) -> Result<(), CadenceError> {
        let store = self.store.as_ref();
        let label = date.format("%Y-%m-%d").to_string();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let ids = self.roster.ids();
        let match_ratings = self.ratings(Track::Match);
        let current = match_ratings.ratings(&ids)?;
        record.pairings = Matchmaker::new(self.settings.sigma).pair(&current, &mut rng);
        store.save(&results_path(date), &*record)?;

        for pairing in record.pairings.clone() {
            let Pairing::Match { white, black } = pairing else {
                continue;
            };
            let opening = self
                .settings
                .openings
                .choose(self.settings.opening_plies, &mut rng);
            match self.play_match(&white, &black, &opening)? {
                Ok(report) => {
                    info!(
                        %white,
                        %black,
                        result = report.game.outcome.as_pgn(),
                        forfeit = report.game.termination.is_forfeit(),
                        white_delta = report.white.delta(),
                        black_delta = report.black.delta(),
                        "match rated"
                    );
                    record.matches.push(report);
                }
                Err(reason) => {
                    warn!(%white, %black, %reason, "match skipped");
                    record.skipped.push(SkippedMatch {
                        white,
                        black,
                        reason,
                    });
                }
            }
        }
        match_ratings.append_snapshot(&label, &ids)?;

        record.puzzles = self.run_puzzles(date, &label)?;
        record.leaderboard = self.leaderboard()?;
        Ok(())
    }

    /// Plays one match and applies its rating change.
    ///
    /// The outer `Result` carries storage failures, which abort the round;
    /// the inner one a reason the match could not be played.
    fn play_match(
        &self,
        white: &str,
        black: &str,
        opening: &[String],
    ) -> Result<Result<MatchReport, String>, CadenceError> {
        let (Some(white_bot), Some(black_bot)) = (self.roster.get(white), self.roster.get(black))
        else {
            return Ok(Err("bot not in roster".to_string()));
        };
        let store = self.store.as_ref();
        let white_state: Option<BotState> = store.load_opt(&state_path(white))?;
        let black_state: Option<BotState> = store.load_opt(&state_path(black))?;

        let mut runner = GameRunner::new(
            &self.rules,
            Seat::new(white, white_bot.instantiate(), white_state.clone()),
            Seat::new(black, black_bot.instantiate(), black_state.clone()),
        );
        let game = match runner.play_game(STARTING_FEN, opening) {
            Ok(game) => game,
            Err(e) => return Ok(Err(e.to_string())),
        };

        let (white_final, black_final) = runner.into_states();
        for (bot, before, after) in [
            (white, white_state, white_final),
            (black, black_state, black_final),
        ] {
            if let Some(state) = after.filter(|s| Some(s) != before.as_ref()) {
                store.save(&state_path(bot), &state)?;
            }
        }

        let (white_change, black_change) =
            self.ratings(Track::Match)
                .record_game(white, black, game.outcome.white_score())?;
        Ok(Ok(MatchReport {
            game,
            white: white_change,
            black: black_change,
        }))
    }

    fn run_puzzles(
        &self,
        date: NaiveDate,
        label: &str,
    ) -> Result<Option<PuzzleReport>, CadenceError> {
        let Some(source) = &self.puzzles else {
            return Ok(None);
        };
        let batch = match source.fetch(date) {
            Ok(batch) if !batch.is_empty() => batch,
            Ok(_) => {
                warn!(%date, "puzzle batch is empty, skipping puzzles");
                return Ok(None);
            }
            Err(e) => {
                warn!(%date, error = %e, "puzzle source unavailable, skipping puzzles");
                return Ok(None);
            }
        };

        let report = PuzzleEvaluator::new(&self.rules, self.store.as_ref())
            .with_ratings(self.ratings(Track::Puzzle))
            .evaluate(&self.roster, &batch)?;
        self.ratings(Track::Puzzle)
            .append_snapshot(label, &self.roster.ids())?;
        Ok(Some(report))
    }

    /// Builds the announcement for a completed compute.
    ///
    /// Reads only, and the leaderboard is the one stored when the round
    /// finished, so announcing a date again gives the same result even after
    /// later rounds.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::NotComputed`] if there is no record for the
    /// date and [`CadenceError::Incomplete`] if it is running or failed.
    pub fn announce(&self, date: NaiveDate) -> Result<Announcement, CadenceError> {
        let record = self
            .record(date)?
            .ok_or(CadenceError::NotComputed(date))?;
        if !record.is_complete() {
            return Err(CadenceError::Incomplete {
                date,
                status: record.status,
            });
        }

        Ok(Announcement {
            date,
            byes: record.byes(),
            games: record.matches,
            skipped: record.skipped,
            puzzles: record.puzzles.as_ref().map(PuzzleSummary::from_report),
            leaderboard: record.leaderboard,
        })
    }

    /// Current standings of the roster on both tracks.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CadenceError> {
        Ok(leaderboard(
            self.store.as_ref(),
            &self.roster,
            &self.ratings(Track::Match),
            &self.ratings(Track::Puzzle),
        )?)
    }

    /// Records that the date's results were handed to presentation.
    pub fn mark_announced(&self, date: NaiveDate) -> Result<(), CadenceError> {
        Ok(self.store.save(&announced_path(date), &Utc::now())?)
    }

    pub fn is_announced(&self, date: NaiveDate) -> Result<bool, CadenceError> {
        Ok(self.store.contains(&announced_path(date))?)
    }

    /// One scheduler step at local time `now`.
    ///
    /// Starts the day's compute once `compute_at` has passed and no record
    /// exists yet, and sends the announcement once `announce_at` has passed,
    /// the compute is complete and the day has not been announced. A compute
    /// of the previous day that finished after midnight is announced right
    /// away.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn tick(
        &self,
        now: NaiveDateTime,
        schedule: &Schedule,
        announcements: &mpsc::Sender<Announcement>,
    ) -> Result<Tick, CadenceError> {
        let date = now.date();
        let mut tick = Tick::default();

        if now.time() >= schedule.compute_at && !self.is_running() && !self.has_computed(date)? {
            match self.spawn_compute(date) {
                Ok(handle) => tick.compute = Some(handle),
                Err(CadenceError::AlreadyRunning) => debug!(%date, "compute already running"),
                Err(e) => return Err(e),
            }
        }

        if let Some(yesterday) = date.pred_opt() {
            if self.has_computed(yesterday)? {
                tick.announced |= self.announce_pending(yesterday, announcements).await?;
            }
        }
        if now.time() >= schedule.announce_at {
            tick.announced |= self.announce_pending(date, announcements).await?;
        }

        Ok(tick)
    }

    /// Sends the date's announcement unless it was sent already or the
    /// compute is not complete. Returns true if it was sent.
    async fn announce_pending(
        &self,
        date: NaiveDate,
        announcements: &mpsc::Sender<Announcement>,
    ) -> Result<bool, CadenceError> {
        if self.is_announced(date)? {
            return Ok(false);
        }
        match self.announce(date) {
            Ok(announcement) => {
                if announcements.send(announcement).await.is_err() {
                    warn!(%date, "announcement receiver closed");
                    return Ok(false);
                }
                self.mark_announced(date)?;
                info!(%date, "results announced");
                Ok(true)
            }
            Err(CadenceError::NotComputed(_)) | Err(CadenceError::Incomplete { .. }) => {
                debug!(%date, "nothing to announce yet");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the scheduler until `shutdown` is set.
    ///
    /// Announcements are sent over `announcements`. Errors of a single tick
    /// are logged and retried on the next one.
    pub async fn run(
        &self,
        schedule: Schedule,
        announcements: mpsc::Sender<Announcement>,
        shutdown: Arc<AtomicBool>,
    ) {
        info!(
            compute_at = %schedule.compute_at,
            announce_at = %schedule.announce_at,
            "scheduler started"
        );
        while !shutdown.load(Ordering::SeqCst) {
            match self.tick(Local::now().naive_local(), &schedule, &announcements).await {
                Ok(Tick {
                    compute: Some(handle),
                    ..
                }) => {
                    tokio::spawn(async move {
                        match handle.await {
                            Ok(Ok(record)) => {
                                info!(date = %record.date, games = record.matches.len(), "daily compute finished")
                            }
                            Ok(Err(e)) => error!(error = %e, "daily compute failed"),
                            Err(e) => error!(error = %e, "daily compute task failed"),
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "scheduler tick failed"),
            }
            tokio::time::sleep(schedule.poll_interval).await;
        }
        info!("scheduler stopped");
    }
}

/// Waits for a spawned compute and flattens the join error.
pub async fn join_compute(
    handle: JoinHandle<Result<ComputeRecord, CadenceError>>,
) -> Result<ComputeRecord, CadenceError> {
    handle
        .await
        .map_err(|e| CadenceError::Join(e.to_string()))?
}
