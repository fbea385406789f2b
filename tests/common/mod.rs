#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use raffle_engine::admin::{NewRaffle, RaffleAdmin};
use raffle_engine::catalog::RaffleCatalog;
use raffle_engine::clock::{Clock, FixedClock};
use raffle_engine::config::{Config, DrawWeighting};
use raffle_engine::entropy::{RandomSource, SeededEntropy};
use raffle_engine::error::StoreError;
use raffle_engine::ledger::EntryLedger;
use raffle_engine::memory_store::MemoryStore;
use raffle_engine::payment::UnverifiedPayments;
use raffle_engine::selector::WinnerSelector;
use raffle_engine::state::{
    Entry, NewEntry, Raffle, RaffleId, RaffleStatus, UnixTimestamp, User, UserId,
};
use raffle_engine::store::{DrawCommit, EntryWrite, RaffleStore, StatusChange};
use raffle_engine::utils::to_datetime;

pub const NOW: UnixTimestamp = 1_700_000_000;
pub const HOUR: i64 = 3_600;

pub struct Harness<S> {
    pub store: Arc<S>,
    pub clock: Arc<FixedClock>,
    pub entropy: Arc<SeededEntropy>,
    pub ledger: EntryLedger<S, UnverifiedPayments>,
    pub selector: WinnerSelector<S>,
    pub catalog: RaffleCatalog<S>,
    pub admin: RaffleAdmin<S>,
}

impl<S: RaffleStore> Harness<S> {
    pub fn with_store(store: S, config: &Config) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(FixedClock::new(NOW));
        let entropy = Arc::new(SeededEntropy::new(7));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let dyn_entropy: Arc<dyn RandomSource> = entropy.clone();
        Self {
            ledger: EntryLedger::new(store.clone(), config, dyn_clock.clone(), UnverifiedPayments),
            selector: WinnerSelector::new(store.clone(), config, dyn_clock.clone(), dyn_entropy),
            catalog: RaffleCatalog::new(store.clone(), dyn_clock.clone()),
            admin: RaffleAdmin::new(store.clone(), dyn_clock),
            store,
            clock,
            entropy,
        }
    }

    /// A live raffle ending `ends_in` seconds from now.
    pub async fn live_raffle(&self, title: &str, max_tickets: u64, ends_in: i64) -> Raffle {
        self.admin
            .create_raffle(new_raffle(title, max_tickets, NOW + ends_in, RaffleStatus::Live))
            .await
            .unwrap()
    }

    /// Moves the clock past every raffle created by the helpers.
    pub fn end_all(&self) {
        self.clock.set(NOW + 30 * 24 * HOUR);
    }
}

// Setup harness over the in-memory store
pub async fn setup() -> Harness<MemoryStore> {
    setup_with(&Config::default()).await
}

pub async fn setup_with(config: &Config) -> Harness<MemoryStore> {
    Harness::with_store(MemoryStore::new(), config)
}

pub fn per_ticket() -> Config {
    Config {
        draw_weighting: DrawWeighting::PerTicket,
        ..Config::default()
    }
}

pub fn new_raffle(title: &str, max_tickets: u64, ends_at: UnixTimestamp, status: RaffleStatus) -> NewRaffle {
    NewRaffle {
        title: title.to_string(),
        description: Some("Weekly draw".to_string()),
        image_url: None,
        prize_amount: 1.5,
        prize_symbol: "ETH".to_string(),
        ticket_price: 0.01,
        max_tickets,
        receiving_address: "0xReceiver".to_string(),
        status,
        starts_at: Some(to_datetime(NOW - HOUR)),
        ends_at: to_datetime(ends_at),
    }
}

pub fn wallet(n: usize) -> String {
    format!("0xWallet{:04}", n)
}

pub fn tx(n: usize) -> String {
    format!("0xTx{:06}", n)
}

/// In-memory store with injectable faults: listing the entries of
/// `failing_raffle` fails with a backend error, and every `get_raffle`
/// sleeps for `delay`.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_raffle: Mutex<Option<RaffleId>>,
    delay: Mutex<Duration>,
}

impl FlakyStore {
    pub fn fail_entries_of(&self, raffle_id: RaffleId) {
        *self.failing_raffle.lock().unwrap() = Some(raffle_id);
    }

    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

impl RaffleStore for FlakyStore {
    async fn get_raffle(&self, id: RaffleId) -> Result<Option<Raffle>, StoreError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_raffle(id).await
    }

    async fn insert_raffle(&self, raffle: Raffle) -> Result<Raffle, StoreError> {
        self.inner.insert_raffle(raffle).await
    }

    async fn transition_status(
        &self,
        id: RaffleId,
        from: RaffleStatus,
        to: RaffleStatus,
    ) -> Result<StatusChange, StoreError> {
        self.inner.transition_status(id, from, to).await
    }

    async fn list_due_raffles(&self, now: UnixTimestamp) -> Result<Vec<Raffle>, StoreError> {
        self.inner.list_due_raffles(now).await
    }

    async fn list_live_raffles(&self) -> Result<Vec<Raffle>, StoreError> {
        self.inner.list_live_raffles().await
    }

    async fn list_ended_raffles(&self, now: UnixTimestamp) -> Result<Vec<Raffle>, StoreError> {
        self.inner.list_ended_raffles(now).await
    }

    async fn list_winners(&self) -> Result<Vec<(Raffle, User)>, StoreError> {
        self.inner.list_winners().await
    }

    async fn upsert_user(&self, wallet_address: &str, now: UnixTimestamp) -> Result<User, StoreError> {
        self.inner.upsert_user(wallet_address, now).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.get_user(id).await
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_wallet(wallet_address).await
    }

    async fn find_entry(&self, raffle_id: RaffleId, user_id: UserId) -> Result<Option<Entry>, StoreError> {
        self.inner.find_entry(raffle_id, user_id).await
    }

    async fn list_entries(&self, raffle_id: RaffleId) -> Result<Vec<Entry>, StoreError> {
        let failing = *self.failing_raffle.lock().unwrap();
        if failing == Some(raffle_id) {
            return Err(StoreError::Backend {
                code: Some("XX000".to_string()),
                message: "connection reset".to_string(),
            });
        }
        self.inner.list_entries(raffle_id).await
    }

    async fn list_user_entries(&self, user_id: UserId) -> Result<Vec<(Entry, Raffle)>, StoreError> {
        self.inner.list_user_entries(user_id).await
    }

    async fn record_entry_capped(&self, entry: NewEntry, now: UnixTimestamp) -> Result<EntryWrite, StoreError> {
        self.inner.record_entry_capped(entry, now).await
    }

    async fn commit_draw(
        &self,
        raffle_id: RaffleId,
        winner: Option<UserId>,
        drawn_at: UnixTimestamp,
    ) -> Result<DrawCommit, StoreError> {
        self.inner.commit_draw(raffle_id, winner, drawn_at).await
    }
}
