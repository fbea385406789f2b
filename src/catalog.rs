// Raffle Engine - Read models
use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::error::RaffleError;
use crate::state::{PublicRaffle, Raffle, WalletEntry, WinnerSummary};
use crate::store::RaffleStore;
use crate::utils::{self, require_field};

/// Listings shown to visitors: open raffles, ended raffles, past winners and
/// a wallet's own entries.
pub struct RaffleCatalog<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: RaffleStore> RaffleCatalog<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Live raffles with their ticket counts, newest first.
    pub async fn live_raffles(&self) -> Result<Vec<PublicRaffle>, RaffleError> {
        let raffles = self.store.list_live_raffles().await?;
        self.with_sales(raffles).await
    }

    /// Raffles past their end time, drafts excluded, latest end first.
    pub async fn ended_raffles(&self) -> Result<Vec<PublicRaffle>, RaffleError> {
        let raffles = self.store.list_ended_raffles(self.clock.now()).await?;
        self.with_sales(raffles).await
    }

    pub async fn winners(&self) -> Result<Vec<WinnerSummary>, RaffleError> {
        let winners = self.store.list_winners().await?;
        Ok(winners
            .iter()
            .map(|(raffle, user)| WinnerSummary::project(raffle, user))
            .collect())
    }

    /// Entries of the wallet with raffle details, newest first. A wallet
    /// that never entered has none.
    pub async fn wallet_entries(&self, wallet_address: &str) -> Result<Vec<WalletEntry>, RaffleError> {
        let wallet_address = require_field("walletAddress", wallet_address)?;
        let Some(user) = self.store.find_user_by_wallet(wallet_address).await? else {
            debug!("wallet has no entries");
            return Ok(Vec::new());
        };
        let joined = self.store.list_user_entries(user.id).await?;
        Ok(joined
            .into_iter()
            .map(|(entry, raffle)| WalletEntry::project(entry, &raffle))
            .collect())
    }

    async fn with_sales(&self, raffles: Vec<Raffle>) -> Result<Vec<PublicRaffle>, RaffleError> {
        let mut projected = Vec::with_capacity(raffles.len());
        for raffle in &raffles {
            let entries = self.store.list_entries(raffle.id).await?;
            projected.push(PublicRaffle::project(raffle, utils::tickets_sold(&entries)));
        }
        Ok(projected)
    }
}
