// Raffle Engine - Raffle administration
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::clock::Clock;
use crate::error::RaffleError;
use crate::state::{Raffle, RaffleId, RaffleStatus};
use crate::store::{RaffleStore, StatusChange};
use crate::utils::{optional_field, require_field};

fn default_prize_symbol() -> String {
    "ETH".to_string()
}

fn default_status() -> RaffleStatus {
    RaffleStatus::Draft
}

/// Raffle definition submitted by an administrator
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRaffle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub prize_amount: f64,
    #[serde(default = "default_prize_symbol")]
    pub prize_symbol: String,
    pub ticket_price: f64,
    pub max_tickets: u64,
    pub receiving_address: String,
    /// `draft` or `live`
    #[serde(default = "default_status")]
    pub status: RaffleStatus,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: DateTime<Utc>,
}

/// Creates raffles and drives the administrator-owned status transitions.
///
/// `completed` is never set here; only the draw commit reaches it.
pub struct RaffleAdmin<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: RaffleStore> RaffleAdmin<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_raffle(&self, new: NewRaffle) -> Result<Raffle, RaffleError> {
        let title = require_field("title", &new.title)?;
        let receiving_address = require_field("receivingAddress", &new.receiving_address)?;
        if new.max_tickets == 0 {
            return Err(RaffleError::InvalidRaffle("maxTickets must be positive".to_string()));
        }
        for (name, amount) in [("prizeAmount", new.prize_amount), ("ticketPrice", new.ticket_price)] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(RaffleError::InvalidRaffle(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }
        if !matches!(new.status, RaffleStatus::Draft | RaffleStatus::Live) {
            return Err(RaffleError::InvalidRaffle(format!(
                "a raffle cannot be created as {}",
                new.status
            )));
        }
        let ends_at = new.ends_at.timestamp();
        let starts_at = new.starts_at.map(|t| t.timestamp());
        if matches!(starts_at, Some(start) if start > ends_at) {
            return Err(RaffleError::InvalidRaffle("startsAt is after endsAt".to_string()));
        }

        let raffle = Raffle {
            id: RaffleId::new(),
            title: title.to_string(),
            description: optional_field(new.description.as_deref()),
            image_url: optional_field(new.image_url.as_deref()),
            prize_amount: new.prize_amount,
            prize_symbol: new.prize_symbol.trim().to_string(),
            ticket_price: new.ticket_price,
            max_tickets: new.max_tickets,
            status: new.status,
            receiving_address: receiving_address.to_string(),
            starts_at,
            ends_at,
            winner: None,
            winner_drawn_at: None,
            created_at: self.clock.now(),
        };
        let raffle = self.store.insert_raffle(raffle).await?;
        info!(raffle_id = %raffle.id, status = %raffle.status, "raffle created");
        Ok(raffle)
    }

    /// draft -> live
    pub async fn publish(&self, raffle_id: RaffleId) -> Result<Raffle, RaffleError> {
        self.transition(raffle_id, RaffleStatus::Draft, RaffleStatus::Live)
            .await
    }

    /// live -> closed. A closed raffle takes no entries and is never drawn.
    pub async fn close(&self, raffle_id: RaffleId) -> Result<Raffle, RaffleError> {
        self.transition(raffle_id, RaffleStatus::Live, RaffleStatus::Closed)
            .await
    }

    async fn transition(
        &self,
        raffle_id: RaffleId,
        from: RaffleStatus,
        to: RaffleStatus,
    ) -> Result<Raffle, RaffleError> {
        match self.store.transition_status(raffle_id, from, to).await? {
            StatusChange::Changed(raffle) => {
                info!(%raffle_id, %from, %to, "raffle status changed");
                Ok(raffle)
            }
            StatusChange::Stale(current) => Err(RaffleError::InvalidTransition {
                from: current.status,
                to,
            }),
            StatusChange::Missing => Err(RaffleError::RaffleNotFound),
        }
    }
}
