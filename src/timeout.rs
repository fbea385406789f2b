// Raffle Engine - Bounded storage calls
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::StoreError;
use crate::state::{Entry, NewEntry, Raffle, RaffleId, RaffleStatus, UnixTimestamp, User, UserId};
use crate::store::{DrawCommit, EntryWrite, RaffleStore, StatusChange};

/// Wraps a store so that every call fails with [`StoreError::Timeout`] once
/// it runs longer than `limit`.
#[derive(Debug)]
pub struct TimedStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimedStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, limit_ms = self.limit.as_millis() as u64, "storage call timed out");
                Err(StoreError::Timeout(self.limit))
            }
        }
    }
}

impl<S: RaffleStore> RaffleStore for TimedStore<S> {
    async fn get_raffle(&self, id: RaffleId) -> Result<Option<Raffle>, StoreError> {
        self.bounded("get_raffle", self.inner.get_raffle(id)).await
    }

    async fn insert_raffle(&self, raffle: Raffle) -> Result<Raffle, StoreError> {
        self.bounded("insert_raffle", self.inner.insert_raffle(raffle)).await
    }

    async fn transition_status(
        &self,
        id: RaffleId,
        from: RaffleStatus,
        to: RaffleStatus,
    ) -> Result<StatusChange, StoreError> {
        self.bounded("transition_status", self.inner.transition_status(id, from, to))
            .await
    }

    async fn list_due_raffles(&self, now: UnixTimestamp) -> Result<Vec<Raffle>, StoreError> {
        self.bounded("list_due_raffles", self.inner.list_due_raffles(now)).await
    }

    async fn list_live_raffles(&self) -> Result<Vec<Raffle>, StoreError> {
        self.bounded("list_live_raffles", self.inner.list_live_raffles()).await
    }

    async fn list_ended_raffles(&self, now: UnixTimestamp) -> Result<Vec<Raffle>, StoreError> {
        self.bounded("list_ended_raffles", self.inner.list_ended_raffles(now)).await
    }

    async fn list_winners(&self) -> Result<Vec<(Raffle, User)>, StoreError> {
        self.bounded("list_winners", self.inner.list_winners()).await
    }

    async fn upsert_user(&self, wallet_address: &str, now: UnixTimestamp) -> Result<User, StoreError> {
        self.bounded("upsert_user", self.inner.upsert_user(wallet_address, now))
            .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.bounded("get_user", self.inner.get_user(id)).await
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StoreError> {
        self.bounded("find_user_by_wallet", self.inner.find_user_by_wallet(wallet_address))
            .await
    }

    async fn find_entry(&self, raffle_id: RaffleId, user_id: UserId) -> Result<Option<Entry>, StoreError> {
        self.bounded("find_entry", self.inner.find_entry(raffle_id, user_id))
            .await
    }

    async fn list_entries(&self, raffle_id: RaffleId) -> Result<Vec<Entry>, StoreError> {
        self.bounded("list_entries", self.inner.list_entries(raffle_id)).await
    }

    async fn list_user_entries(&self, user_id: UserId) -> Result<Vec<(Entry, Raffle)>, StoreError> {
        self.bounded("list_user_entries", self.inner.list_user_entries(user_id))
            .await
    }

    async fn record_entry_capped(&self, entry: NewEntry, now: UnixTimestamp) -> Result<EntryWrite, StoreError> {
        self.bounded("record_entry_capped", self.inner.record_entry_capped(entry, now))
            .await
    }

    async fn commit_draw(
        &self,
        raffle_id: RaffleId,
        winner: Option<UserId>,
        drawn_at: UnixTimestamp,
    ) -> Result<DrawCommit, StoreError> {
        self.bounded("commit_draw", self.inner.commit_draw(raffle_id, winner, drawn_at))
            .await
    }
}
