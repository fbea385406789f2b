// Raffle Engine - Entry Ledger
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{RaffleError, StoreError};
use crate::payment::{PaymentClaim, PaymentVerifier};
use crate::state::{Entry, NewEntry, Raffle, RaffleId, RaffleStatus, UnixTimestamp, User, UserId};
use crate::store::{EntryWrite, RaffleStore};
use crate::utils::{self, optional_field, require_field};

/// A participant's request to record a paid purchase
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    pub raffle_id: RaffleId,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub tx_hash: String,
    /// Defaults to one ticket
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub email: Option<String>,
}

impl EntryRequest {
    pub fn new(raffle_id: RaffleId, wallet_address: &str, tx_hash: &str, quantity: u32) -> Self {
        Self {
            raffle_id,
            wallet_address: wallet_address.to_string(),
            tx_hash: tx_hash.to_string(),
            quantity: Some(quantity),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// The recorded entry and whether it replaced the wallet's earlier payment
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEntry {
    pub entry: Entry,
    pub duplicate: bool,
}

/// Records ticket purchases against a raffle's cap, one entry row per wallet.
pub struct EntryLedger<S, V> {
    store: Arc<S>,
    verifier: V,
    clock: Arc<dyn Clock>,
    min_quantity: u32,
    max_quantity: u32,
}

impl<S: RaffleStore, V: PaymentVerifier> EntryLedger<S, V> {
    pub fn new(store: Arc<S>, config: &Config, clock: Arc<dyn Clock>, verifier: V) -> Self {
        Self {
            store,
            verifier,
            clock,
            min_quantity: config.min_quantity,
            max_quantity: config.max_quantity,
        }
    }

    /// Idempotent: the same wallet always maps to the same user.
    pub async fn get_or_create_user(&self, wallet_address: &str) -> Result<User, RaffleError> {
        let wallet_address = require_field("walletAddress", wallet_address)?;
        let user = self.store.upsert_user(wallet_address, self.clock.now()).await?;
        debug!(user_id = %user.id, "user resolved");
        Ok(user)
    }

    /// The wallet's entry for a raffle, if it has one.
    pub async fn check_entry(
        &self,
        raffle_id: RaffleId,
        user_id: UserId,
    ) -> Result<Option<Entry>, RaffleError> {
        Ok(self.store.find_entry(raffle_id, user_id).await?)
    }

    /// Sum of quantities recorded so far.
    pub async fn tickets_sold(&self, raffle_id: RaffleId) -> Result<u64, RaffleError> {
        let entries = self.store.list_entries(raffle_id).await?;
        Ok(utils::tickets_sold(&entries))
    }

    /// Loads a raffle together with its ticket count.
    pub async fn raffle_with_sales(&self, raffle_id: RaffleId) -> Result<(Raffle, u64), RaffleError> {
        let raffle = self
            .store
            .get_raffle(raffle_id)
            .await?
            .ok_or(RaffleError::RaffleNotFound)?;
        let sold = self.tickets_sold(raffle_id).await?;
        Ok((raffle, sold))
    }

    /// Records a purchase.
    ///
    /// A wallet that already entered keeps its single entry: the new
    /// transaction hash replaces the old one and the result is flagged as a
    /// duplicate. Otherwise the entry is inserted if its quantity fits under
    /// the cap; the check and the insert are one atomic store write.
    pub async fn record_entry(&self, request: EntryRequest) -> Result<RecordedEntry, RaffleError> {
        let quantity = request.quantity.unwrap_or(1);
        if quantity < self.min_quantity || quantity > self.max_quantity {
            return Err(RaffleError::InvalidQuantity {
                quantity,
                min: self.min_quantity,
                max: self.max_quantity,
            });
        }
        let wallet_address = require_field("walletAddress", &request.wallet_address)?;
        let tx_hash = require_field("txHash", &request.tx_hash)?;
        let email = optional_field(request.email.as_deref());

        let now = self.clock.now();
        let raffle = self
            .store
            .get_raffle(request.raffle_id)
            .await?
            .ok_or(RaffleError::RaffleNotFound)?;
        if let Some(rejection) = entry_rejection(&raffle, now) {
            return Err(rejection);
        }

        let user = self.store.upsert_user(wallet_address, now).await?;

        // A repeat submission is charged for the quantity already recorded.
        let claimed_quantity = match self.store.find_entry(raffle.id, user.id).await? {
            Some(existing) => existing.quantity,
            None => quantity,
        };
        let claim = PaymentClaim {
            raffle: &raffle,
            wallet_address,
            tx_hash,
            quantity: claimed_quantity,
        };
        if let Err(rejection) = self.verifier.verify(&claim).await {
            warn!(raffle_id = %raffle.id, tx_hash, %rejection, "payment rejected");
            return Err(RaffleError::PaymentRejected(rejection.to_string()));
        }

        let new_entry = NewEntry {
            raffle_id: raffle.id,
            user_id: user.id,
            tx_hash: tx_hash.to_string(),
            quantity,
            email,
        };
        // Read after verification; the store re-checks lifecycle and end time against it.
        let written_at = self.clock.now();
        let write = self
            .store
            .record_entry_capped(new_entry, written_at)
            .await
            .map_err(|e| match e {
                StoreError::MissingRow("raffles") => RaffleError::RaffleNotFound,
                e => RaffleError::Storage(e),
            })?;

        match write {
            EntryWrite::Inserted(entry) => {
                info!(raffle_id = %entry.raffle_id, user_id = %entry.user_id, quantity, "entry recorded");
                Ok(RecordedEntry {
                    entry,
                    duplicate: false,
                })
            }
            EntryWrite::Duplicate(entry) => {
                info!(raffle_id = %entry.raffle_id, user_id = %entry.user_id, "duplicate entry, tx hash updated");
                Ok(RecordedEntry {
                    entry,
                    duplicate: true,
                })
            }
            EntryWrite::CapacityExceeded { remaining } => {
                warn!(raffle_id = %raffle.id, quantity, remaining, "entry exceeds ticket cap");
                Err(RaffleError::CapacityExceeded { remaining })
            }
            EntryWrite::NotAccepting(current) => {
                warn!(raffle_id = %current.id, status = %current.status, "raffle closed before entry was written");
                Err(entry_rejection(&current, written_at)
                    .unwrap_or(RaffleError::RaffleNotLive(current.status)))
            }
        }
    }
}

/// Why `raffle` refuses entries at `now`, if it does.
fn entry_rejection(raffle: &Raffle, now: UnixTimestamp) -> Option<RaffleError> {
    if raffle.status != RaffleStatus::Live {
        return Some(RaffleError::RaffleNotLive(raffle.status));
    }
    if raffle.has_ended(now) {
        return Some(RaffleError::RaffleEnded);
    }
    None
}
