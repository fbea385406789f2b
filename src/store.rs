// Raffle Engine - Storage interface
use std::future::Future;

use crate::error::StoreError;
use crate::state::{Entry, NewEntry, Raffle, RaffleId, RaffleStatus, UnixTimestamp, User, UserId};

/// Result of the atomic entry write
#[derive(Clone, Debug, PartialEq)]
pub enum EntryWrite {
    /// A new entry row was inserted
    Inserted(Entry),
    /// The wallet already held an entry; its `tx_hash` was replaced
    Duplicate(Entry),
    /// The quantity does not fit under the cap; nothing was written
    CapacityExceeded { remaining: u64 },
    /// The raffle stopped accepting entries; nothing was written
    NotAccepting(Raffle),
}

/// Result of the conditional draw commit
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommit {
    /// Winner fields and `completed` status written together
    Committed(Raffle),
    /// The raffle was no longer live or already had a winner; unchanged
    Stale(Raffle),
    Missing,
}

/// Result of a conditional status transition
#[derive(Clone, Debug, PartialEq)]
pub enum StatusChange {
    Changed(Raffle),
    /// The raffle was not in the expected status; unchanged
    Stale(Raffle),
    Missing,
}

/// Transactional data access used by the ledger, the selector and the admin API.
///
/// Every method is one round trip. The two conditional writes,
/// [`record_entry_capped`](RaffleStore::record_entry_capped) and
/// [`commit_draw`](RaffleStore::commit_draw), must each be atomic with
/// respect to every other write on the same raffle.
pub trait RaffleStore: Send + Sync {
    fn get_raffle(
        &self,
        id: RaffleId,
    ) -> impl Future<Output = Result<Option<Raffle>, StoreError>> + Send;

    fn insert_raffle(&self, raffle: Raffle) -> impl Future<Output = Result<Raffle, StoreError>> + Send;

    /// Moves the raffle from `from` to `to` only if it is currently in `from`.
    fn transition_status(
        &self,
        id: RaffleId,
        from: RaffleStatus,
        to: RaffleStatus,
    ) -> impl Future<Output = Result<StatusChange, StoreError>> + Send;

    /// Live raffles without a winner whose end time is at or before `now`.
    fn list_due_raffles(
        &self,
        now: UnixTimestamp,
    ) -> impl Future<Output = Result<Vec<Raffle>, StoreError>> + Send;

    /// Live raffles, newest first.
    fn list_live_raffles(&self) -> impl Future<Output = Result<Vec<Raffle>, StoreError>> + Send;

    /// Raffles other than drafts whose end time is before `now`, latest end first.
    fn list_ended_raffles(
        &self,
        now: UnixTimestamp,
    ) -> impl Future<Output = Result<Vec<Raffle>, StoreError>> + Send;

    /// Completed raffles with a winner, joined to the winner's row, most
    /// recent draw first.
    fn list_winners(&self) -> impl Future<Output = Result<Vec<(Raffle, User)>, StoreError>> + Send;

    /// Returns the user holding `wallet_address`, creating it if needed.
    fn upsert_user(
        &self,
        wallet_address: &str,
        now: UnixTimestamp,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;

    fn get_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn find_user_by_wallet(
        &self,
        wallet_address: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn find_entry(
        &self,
        raffle_id: RaffleId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Entry>, StoreError>> + Send;

    /// All entries of a raffle in insertion order.
    fn list_entries(
        &self,
        raffle_id: RaffleId,
    ) -> impl Future<Output = Result<Vec<Entry>, StoreError>> + Send;

    /// Entries of one user joined to their raffles, newest entry first.
    fn list_user_entries(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<(Entry, Raffle)>, StoreError>> + Send;

    /// Atomically records an entry:
    /// 1. the raffle must accept entries at `now`;
    /// 2. an existing (raffle, user) entry gets its `tx_hash` replaced;
    /// 3. otherwise the entry is inserted only if sold + quantity <= max_tickets.
    fn record_entry_capped(
        &self,
        entry: NewEntry,
        now: UnixTimestamp,
    ) -> impl Future<Output = Result<EntryWrite, StoreError>> + Send;

    /// Sets winner, drawn-at and `completed` in one write, only if the raffle
    /// is still live and has no winner.
    fn commit_draw(
        &self,
        raffle_id: RaffleId,
        winner: Option<UserId>,
        drawn_at: UnixTimestamp,
    ) -> impl Future<Output = Result<DrawCommit, StoreError>> + Send;
}
