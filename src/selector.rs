// Raffle Engine - Winner Selector
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{Config, DrawWeighting};
use crate::entropy::{seed_value, RandomSource};
use crate::error::{ErrorBody, RaffleError};
use crate::state::{DrawnWinner, Raffle, RaffleId, RaffleStatus, UnixTimestamp};
use crate::store::{DrawCommit, RaffleStore};
use crate::utils::{pick_winner_index, serialize_timestamp, to_datetime};

/// Result of a successful draw
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOutcome {
    /// One participant won
    Winner(DrawnWinner),
    /// Nobody entered; the raffle was completed without a winner
    NoEntries {
        raffle_id: RaffleId,
        completed_at: UnixTimestamp,
    },
}

/// One raffle drawn by a sweep
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub raffle_id: RaffleId,
    pub title: String,
    pub winner_wallet: String,
}

/// A raffle the sweep could not finish
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub raffle_id: RaffleId,
    pub title: String,
    pub error: ErrorBody,
}

/// Summary of one sweep over the raffles due for a draw
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub drawn_count: usize,
    pub results: Vec<SweepResult>,
    /// Raffles completed without a winner because nobody entered
    pub completed_without_winner: Vec<RaffleId>,
    pub failures: Vec<SweepFailure>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub swept_at: UnixTimestamp,
}

/// Draws one winner per ended raffle, exactly once.
pub struct WinnerSelector<S> {
    store: Arc<S>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    weighting: DrawWeighting,
}

impl<S: RaffleStore> WinnerSelector<S> {
    pub fn new(
        store: Arc<S>,
        config: &Config,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            random,
            clock,
            weighting: config.draw_weighting,
        }
    }

    /// Draws the winner of one raffle.
    ///
    /// The raffle must be live, past its end time and without a winner. The
    /// winner, the draw time and the `completed` status are committed in a
    /// single conditional write; a caller that loses a race receives
    /// [`RaffleError::AlreadyDrawn`] carrying the winner that was committed.
    pub async fn draw_winner(&self, raffle_id: RaffleId) -> Result<DrawOutcome, RaffleError> {
        let raffle = self
            .store
            .get_raffle(raffle_id)
            .await?
            .ok_or(RaffleError::RaffleNotFound)?;
        let now = self.clock.now();
        self.ensure_drawable(&raffle, now).await?;

        let entries = self.store.list_entries(raffle_id).await?;
        let winner = if entries.is_empty() {
            None
        } else {
            let seed = self.random.next_seed(raffle_id);
            let index = pick_winner_index(&entries, self.weighting, seed_value(&seed))
                .ok_or(RaffleError::InvalidRaffle("entries carry no tickets".to_string()))?;
            debug!(%raffle_id, index, entries = entries.len(), "winner index drawn");
            Some(entries[index].user_id)
        };

        let committed = match self.store.commit_draw(raffle_id, winner, now).await? {
            DrawCommit::Committed(raffle) => raffle,
            DrawCommit::Stale(current) => {
                debug!(%raffle_id, status = %current.status, "draw lost to a concurrent commit");
                return Err(self.rejection(&current).await?);
            }
            DrawCommit::Missing => return Err(RaffleError::RaffleNotFound),
        };

        match self.winner_record(&committed).await? {
            Some(winner) => {
                info!(%raffle_id, winner = %winner.wallet_address, "raffle completed with winner");
                Ok(DrawOutcome::Winner(winner))
            }
            None => {
                info!(%raffle_id, "raffle completed without entries");
                Ok(DrawOutcome::NoEntries {
                    raffle_id,
                    completed_at: now,
                })
            }
        }
    }

    /// Draws every live raffle that has ended without a winner.
    ///
    /// Each raffle is drawn independently; a failure is recorded in the
    /// report and the sweep moves on to the next raffle.
    pub async fn sweep_ended_raffles(&self) -> Result<SweepReport, RaffleError> {
        let now = self.clock.now();
        let due = self.store.list_due_raffles(now).await?;
        let mut report = SweepReport {
            swept_at: now,
            ..SweepReport::default()
        };
        if due.is_empty() {
            debug!("no raffles need winner drawing");
            return Ok(report);
        }

        for raffle in due {
            match self.draw_winner(raffle.id).await {
                Ok(DrawOutcome::Winner(winner)) => {
                    report.results.push(SweepResult {
                        raffle_id: raffle.id,
                        title: raffle.title,
                        winner_wallet: winner.wallet_address,
                    });
                }
                Ok(DrawOutcome::NoEntries { raffle_id, .. }) => {
                    report.completed_without_winner.push(raffle_id);
                }
                Err(RaffleError::AlreadyDrawn { .. }) => {
                    debug!(raffle_id = %raffle.id, "already drawn by another caller");
                }
                Err(e) => {
                    error!(raffle_id = %raffle.id, error = %e, "failed to draw raffle");
                    report.failures.push(SweepFailure {
                        raffle_id: raffle.id,
                        title: raffle.title,
                        error: e.into(),
                    });
                }
            }
        }

        report.drawn_count = report.results.len();
        info!(
            drawn = report.drawn_count,
            empty = report.completed_without_winner.len(),
            failed = report.failures.len(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn ensure_drawable(&self, raffle: &Raffle, now: UnixTimestamp) -> Result<(), RaffleError> {
        if raffle.status == RaffleStatus::Live && raffle.winner.is_none() {
            if !raffle.has_ended(now) {
                return Err(RaffleError::RaffleNotEnded {
                    ends_at: raffle.ends_at,
                });
            }
            return Ok(());
        }
        Err(self.rejection(raffle).await?)
    }

    /// The error describing why `raffle` cannot be drawn any more.
    async fn rejection(&self, raffle: &Raffle) -> Result<RaffleError, RaffleError> {
        if raffle.winner.is_some() || raffle.status == RaffleStatus::Completed {
            let winner = self.winner_record(raffle).await?;
            return Ok(RaffleError::AlreadyDrawn { winner });
        }
        if raffle.status != RaffleStatus::Live {
            warn!(raffle_id = %raffle.id, status = %raffle.status, "raffle is not drawable");
            return Ok(RaffleError::RaffleNotLive(raffle.status));
        }
        Ok(RaffleError::RaffleNotEnded {
            ends_at: raffle.ends_at,
        })
    }

    /// Resolves the recorded winner to a wallet address.
    async fn winner_record(&self, raffle: &Raffle) -> Result<Option<DrawnWinner>, RaffleError> {
        let Some(user_id) = raffle.winner else {
            return Ok(None);
        };
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(RaffleError::UserNotFound)?;
        Ok(Some(DrawnWinner {
            user_id,
            wallet_address: user.wallet_address,
            drawn_at: to_datetime(raffle.winner_drawn_at.unwrap_or(raffle.ends_at)),
        }))
    }
}
