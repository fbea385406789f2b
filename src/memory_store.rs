// Raffle Engine - In-process transactional store
use std::cmp::Reverse;
use std::path::Path;

use borsh::{BorshDeserialize, BorshSerialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::state::{
    Entry, EntryId, NewEntry, Raffle, RaffleId, RaffleStatus, UnixTimestamp, User, UserId,
};
use crate::store::{DrawCommit, EntryWrite, RaffleStore, StatusChange};
use crate::utils;

/// All rows of the store, in insertion order
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub raffles: Vec<Raffle>,
    pub users: Vec<User>,
    pub entries: Vec<Entry>,
}

/// Store holding every table behind one lock.
///
/// Each trait call takes the lock once, so every call (including the two
/// conditional writes) is serialized against all others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            tables: Mutex::new(snapshot),
        }
    }

    /// Copy of every row
    pub async fn snapshot(&self) -> Snapshot {
        self.tables.lock().await.clone()
    }

    /// Borsh encoding of the current rows
    pub async fn encode(&self) -> Result<Vec<u8>, StoreError> {
        self.tables
            .lock()
            .await
            .try_to_vec()
            .map_err(|e| StoreError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let snapshot =
            Snapshot::try_from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.encode().await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| StoreError::backend(format!("writing {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::backend(format!("reading {}: {}", path.display(), e)))?;
        let store = Self::decode(&bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "snapshot loaded");
        Ok(store)
    }
}

impl RaffleStore for MemoryStore {
    async fn get_raffle(&self, id: RaffleId) -> Result<Option<Raffle>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.raffles.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_raffle(&self, raffle: Raffle) -> Result<Raffle, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.raffles.iter().any(|r| r.id == raffle.id) {
            return Err(StoreError::UniqueViolation("raffles.id"));
        }
        tables.raffles.push(raffle.clone());
        Ok(raffle)
    }

    async fn transition_status(
        &self,
        id: RaffleId,
        from: RaffleStatus,
        to: RaffleStatus,
    ) -> Result<StatusChange, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(raffle) = tables.raffles.iter_mut().find(|r| r.id == id) else {
            return Ok(StatusChange::Missing);
        };
        if raffle.status != from {
            return Ok(StatusChange::Stale(raffle.clone()));
        }
        raffle.status = to;
        Ok(StatusChange::Changed(raffle.clone()))
    }

    async fn list_due_raffles(&self, now: UnixTimestamp) -> Result<Vec<Raffle>, StoreError> {
        let tables = self.tables.lock().await;
        let mut due: Vec<Raffle> = tables
            .raffles
            .iter()
            .filter(|r| r.is_due_for_draw(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.ends_at);
        Ok(due)
    }

    async fn list_live_raffles(&self) -> Result<Vec<Raffle>, StoreError> {
        let tables = self.tables.lock().await;
        let mut live: Vec<Raffle> = tables
            .raffles
            .iter()
            .filter(|r| r.status == RaffleStatus::Live)
            .cloned()
            .collect();
        live.sort_by_key(|r| Reverse(r.created_at));
        Ok(live)
    }

    async fn list_ended_raffles(&self, now: UnixTimestamp) -> Result<Vec<Raffle>, StoreError> {
        let tables = self.tables.lock().await;
        let mut ended: Vec<Raffle> = tables
            .raffles
            .iter()
            .filter(|r| r.status != RaffleStatus::Draft && r.ends_at < now)
            .cloned()
            .collect();
        ended.sort_by_key(|r| Reverse(r.ends_at));
        Ok(ended)
    }

    async fn list_winners(&self) -> Result<Vec<(Raffle, User)>, StoreError> {
        let tables = self.tables.lock().await;
        let mut winners: Vec<(Raffle, User)> = tables
            .raffles
            .iter()
            .filter(|r| r.status == RaffleStatus::Completed)
            .filter_map(|r| {
                let winner = r.winner?;
                let user = tables.users.iter().find(|u| u.id == winner)?;
                Some((r.clone(), user.clone()))
            })
            .collect();
        winners.sort_by_key(|(r, _)| Reverse(r.winner_drawn_at));
        Ok(winners)
    }

    async fn upsert_user(&self, wallet_address: &str, now: UnixTimestamp) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter().find(|u| u.wallet_address == wallet_address) {
            return Ok(user.clone());
        }
        let user = User {
            id: UserId::new(),
            wallet_address: wallet_address.to_string(),
            created_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.wallet_address == wallet_address)
            .cloned())
    }

    async fn find_entry(&self, raffle_id: RaffleId, user_id: UserId) -> Result<Option<Entry>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .entries
            .iter()
            .find(|e| e.raffle_id == raffle_id && e.user_id == user_id)
            .cloned())
    }

    async fn list_entries(&self, raffle_id: RaffleId) -> Result<Vec<Entry>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .entries
            .iter()
            .filter(|e| e.raffle_id == raffle_id)
            .cloned()
            .collect())
    }

    async fn list_user_entries(&self, user_id: UserId) -> Result<Vec<(Entry, Raffle)>, StoreError> {
        let tables = self.tables.lock().await;
        let mut joined: Vec<(Entry, Raffle)> = tables
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| {
                let raffle = tables.raffles.iter().find(|r| r.id == e.raffle_id)?;
                Some((e.clone(), raffle.clone()))
            })
            .collect();
        joined.sort_by_key(|(e, _)| Reverse(e.created_at));
        Ok(joined)
    }

    async fn record_entry_capped(&self, entry: NewEntry, now: UnixTimestamp) -> Result<EntryWrite, StoreError> {
        let mut guard = self.tables.lock().await;
        let Snapshot {
            raffles,
            users,
            entries,
        } = &mut *guard;

        let raffle = raffles
            .iter()
            .find(|r| r.id == entry.raffle_id)
            .ok_or(StoreError::MissingRow("raffles"))?;
        if !users.iter().any(|u| u.id == entry.user_id) {
            return Err(StoreError::MissingRow("users"));
        }
        if !raffle.accepts_entries(now) {
            return Ok(EntryWrite::NotAccepting(raffle.clone()));
        }

        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.raffle_id == entry.raffle_id && e.user_id == entry.user_id)
        {
            existing.tx_hash = entry.tx_hash;
            return Ok(EntryWrite::Duplicate(existing.clone()));
        }

        let sold = utils::tickets_sold(entries.iter().filter(|e| e.raffle_id == entry.raffle_id));
        let remaining = raffle.tickets_left(sold);
        if u64::from(entry.quantity) > remaining {
            return Ok(EntryWrite::CapacityExceeded { remaining });
        }

        let row = Entry {
            id: EntryId::new(),
            raffle_id: entry.raffle_id,
            user_id: entry.user_id,
            tx_hash: entry.tx_hash,
            quantity: entry.quantity,
            email: entry.email,
            created_at: now,
        };
        entries.push(row.clone());
        Ok(EntryWrite::Inserted(row))
    }

    async fn commit_draw(
        &self,
        raffle_id: RaffleId,
        winner: Option<UserId>,
        drawn_at: UnixTimestamp,
    ) -> Result<DrawCommit, StoreError> {
        let mut guard = self.tables.lock().await;
        let Snapshot { raffles, users, .. } = &mut *guard;

        let Some(raffle) = raffles.iter_mut().find(|r| r.id == raffle_id) else {
            return Ok(DrawCommit::Missing);
        };
        if raffle.status != RaffleStatus::Live || raffle.winner.is_some() {
            return Ok(DrawCommit::Stale(raffle.clone()));
        }
        if let Some(user_id) = winner {
            if !users.iter().any(|u| u.id == user_id) {
                return Err(StoreError::MissingRow("users"));
            }
        }

        raffle.status = RaffleStatus::Completed;
        raffle.winner = winner;
        raffle.winner_drawn_at = winner.map(|_| drawn_at);
        Ok(DrawCommit::Committed(raffle.clone()))
    }
}
