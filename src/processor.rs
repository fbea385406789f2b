// Raffle Engine - Request Processor
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::admin::RaffleAdmin;
use crate::catalog::RaffleCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::entropy::OsEntropy;
use crate::error::{ErrorBody, RaffleError, StoreError};
use crate::instruction::RaffleRequest;
use crate::ledger::EntryLedger;
use crate::payment::{PaymentVerifier, UnverifiedPayments};
use crate::selector::{DrawOutcome, WinnerSelector};
use crate::session::RequestContext;
use crate::state::{PaymentRaffle, PublicRaffle, RaffleId};
use crate::store::RaffleStore;

/// Dispatches boundary requests to the ledger, the selector, the catalog and
/// the admin API.
pub struct Processor<S, V> {
    ledger: EntryLedger<S, V>,
    selector: WinnerSelector<S>,
    catalog: RaffleCatalog<S>,
    admin: RaffleAdmin<S>,
}

impl<S: RaffleStore> Processor<S, UnverifiedPayments> {
    /// Wall clock, OS entropy and unverified payments.
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::from_parts(
            EntryLedger::new(store.clone(), config, clock.clone(), UnverifiedPayments),
            WinnerSelector::new(store.clone(), config, clock.clone(), Arc::new(OsEntropy)),
            RaffleCatalog::new(store.clone(), clock.clone()),
            RaffleAdmin::new(store, clock),
        )
    }
}

impl<S: RaffleStore, V: PaymentVerifier> Processor<S, V> {
    pub fn from_parts(
        ledger: EntryLedger<S, V>,
        selector: WinnerSelector<S>,
        catalog: RaffleCatalog<S>,
        admin: RaffleAdmin<S>,
    ) -> Self {
        Self {
            ledger,
            selector,
            catalog,
            admin,
        }
    }

    pub fn ledger(&self) -> &EntryLedger<S, V> {
        &self.ledger
    }

    pub fn selector(&self) -> &WinnerSelector<S> {
        &self.selector
    }

    /// Parses a JSON request and processes it. Malformed input is a
    /// validation error.
    pub async fn process_json(&self, ctx: &RequestContext<'_>, input: &str) -> Result<Value, ErrorBody> {
        let request: RaffleRequest = serde_json::from_str(input).map_err(|e| {
            warn!(request_id = %ctx.request_id, error = %e, "malformed request");
            ErrorBody::validation(format!("Malformed request: {}", e))
        })?;
        self.process(ctx, request).await
    }

    pub async fn process(&self, ctx: &RequestContext<'_>, request: RaffleRequest) -> Result<Value, ErrorBody> {
        info!(
            request_id = %ctx.request_id,
            chain_id = ctx.chain_id(),
            "Request: {}",
            request.name()
        );
        let result = self.dispatch(ctx, request).await;
        if let Err(e) = &result {
            warn!(request_id = %ctx.request_id, code = e.code(), error = %e, "request failed");
        }
        result.map_err(ErrorBody::from)
    }

    async fn dispatch(&self, ctx: &RequestContext<'_>, request: RaffleRequest) -> Result<Value, RaffleError> {
        match request {
            RaffleRequest::RecordEntry(entry) => {
                let recorded = self.ledger.record_entry(entry).await?;
                Ok(json!({
                    "entry": to_json(&recorded.entry)?,
                    "duplicate": recorded.duplicate,
                }))
            }
            RaffleRequest::CheckEntry { raffle_id, user_id } => {
                let entry = self.ledger.check_entry(raffle_id, user_id).await?;
                to_json(&entry)
            }
            RaffleRequest::GetOrCreateUser { wallet_address } => {
                let user = self.ledger.get_or_create_user(&wallet_address).await?;
                Ok(json!({ "userId": user.id }))
            }
            RaffleRequest::DrawWinner { raffle_id } => match self.selector.draw_winner(raffle_id).await? {
                DrawOutcome::Winner(winner) => to_json(&winner),
                DrawOutcome::NoEntries { raffle_id, .. } => Ok(json!({
                    "raffleId": raffle_id,
                    "winnerUserId": Value::Null,
                })),
            },
            RaffleRequest::SweepEndedRaffles => {
                let report = self.selector.sweep_ended_raffles().await?;
                to_json(&report)
            }
            RaffleRequest::GetRaffle { raffle_id } => self.raffle_view(ctx, raffle_id).await,
            RaffleRequest::ListLiveRaffles => to_json(&self.catalog.live_raffles().await?),
            RaffleRequest::ListEndedRaffles => to_json(&self.catalog.ended_raffles().await?),
            RaffleRequest::ListWinners => to_json(&self.catalog.winners().await?),
            RaffleRequest::ListWalletEntries { wallet_address } => {
                to_json(&self.catalog.wallet_entries(&wallet_address).await?)
            }
            RaffleRequest::CreateRaffle(new) => {
                let raffle = self.admin.create_raffle(new).await?;
                to_json(&PaymentRaffle::project(&raffle, 0))
            }
            RaffleRequest::PublishRaffle { raffle_id } => {
                self.admin.publish(raffle_id).await?;
                self.raffle_view(ctx, raffle_id).await
            }
            RaffleRequest::CloseRaffle { raffle_id } => {
                self.admin.close(raffle_id).await?;
                self.raffle_view(ctx, raffle_id).await
            }
        }
    }

    /// Payment projection for a connected payer, public projection otherwise.
    async fn raffle_view(&self, ctx: &RequestContext<'_>, raffle_id: RaffleId) -> Result<Value, RaffleError> {
        let (raffle, sold) = self.ledger.raffle_with_sales(raffle_id).await?;
        match ctx.payer_wallet() {
            Some(_) => to_json(&PaymentRaffle::project(&raffle, sold)),
            None => to_json(&PublicRaffle::project(&raffle, sold)),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, RaffleError> {
    serde_json::to_value(value).map_err(|e| StoreError::Codec(e.to_string()).into())
}
