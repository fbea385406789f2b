// Raffle Engine - State
use std::convert::TryFrom;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use solana_program::clock::UnixTimestamp;
use uuid::Uuid;

use crate::utils::{serialize_opt_timestamp, serialize_timestamp};

/// Declares an opaque row identifier backed by a UUID.
///
/// Ids are stored as their 16 raw bytes in snapshots and as the hyphenated
/// string form on the wire.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl BorshSerialize for $name {
            fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
                BorshSerialize::serialize(self.0.as_bytes(), writer)
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize(buf: &mut &[u8]) -> std::io::Result<Self> {
                let bytes = <[u8; 16] as BorshDeserialize>::deserialize(buf)?;
                Ok(Self(Uuid::from_bytes(bytes)))
            }
        }
    };
}

row_id!(
    /// Identifier of a raffle row
    RaffleId
);
row_id!(
    /// Identifier of a participant row
    UserId
);
row_id!(
    /// Identifier of an entry row
    EntryId
);

/// Lifecycle status of a raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaffleStatus {
    /// Being prepared, not visible to participants
    Draft,
    /// Open for entries until the end time
    Live,
    /// Closed by an administrator, no draw will happen
    Closed,
    /// Winner drawn (or no participants); terminal
    Completed,
}

impl RaffleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaffleStatus::Draft => "draft",
            RaffleStatus::Live => "live",
            RaffleStatus::Closed => "closed",
            RaffleStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RaffleStatus {
    type Error = &'static str;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val {
            "draft" => Ok(RaffleStatus::Draft),
            "live" => Ok(RaffleStatus::Live),
            "closed" => Ok(RaffleStatus::Closed),
            "completed" => Ok(RaffleStatus::Completed),
            _ => Err("Invalid raffle status"),
        }
    }
}

/// Raffle row
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Raffle {
    pub id: RaffleId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Prize amount in the prize currency
    pub prize_amount: f64,
    /// Prize currency symbol, e.g. `ETH`
    pub prize_symbol: String,
    /// Price of one ticket in the prize currency
    pub ticket_price: f64,
    /// Upper bound on the sum of entry quantities
    pub max_tickets: u64,
    pub status: RaffleStatus,
    /// Payment destination; only exposed through the payment projection
    pub receiving_address: String,
    pub starts_at: Option<UnixTimestamp>,
    pub ends_at: UnixTimestamp,
    /// Winning participant, set once by the draw
    pub winner: Option<UserId>,
    pub winner_drawn_at: Option<UnixTimestamp>,
    pub created_at: UnixTimestamp,
}

impl Raffle {
    /// Check if the raffle has ended
    pub fn has_ended(&self, now: UnixTimestamp) -> bool {
        now >= self.ends_at
    }

    pub fn accepts_entries(&self, now: UnixTimestamp) -> bool {
        self.status == RaffleStatus::Live && !self.has_ended(now)
    }

    /// Live, past its end time and without a winner.
    pub fn is_due_for_draw(&self, now: UnixTimestamp) -> bool {
        self.status == RaffleStatus::Live && self.winner.is_none() && self.has_ended(now)
    }

    pub fn tickets_left(&self, tickets_sold: u64) -> u64 {
        self.max_tickets.saturating_sub(tickets_sold)
    }
}

/// Participant row, keyed by wallet address
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userId")]
    pub id: UserId,
    pub wallet_address: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: UnixTimestamp,
}

/// A participant's recorded purchase for one raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub raffle_id: RaffleId,
    pub user_id: UserId,
    /// Proof of payment reported by the client
    pub tx_hash: String,
    /// Number of tickets, at least 1
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: UnixTimestamp,
}

/// Entry fields supplied by the ledger; the store assigns id and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEntry {
    pub raffle_id: RaffleId,
    pub user_id: UserId,
    pub tx_hash: String,
    pub quantity: u32,
    pub email: Option<String>,
}

/// The drawn winner of a raffle, resolved to a wallet for display
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnWinner {
    #[serde(rename = "winnerUserId")]
    pub user_id: UserId,
    pub wallet_address: String,
    pub drawn_at: DateTime<Utc>,
}

/// Public view of a raffle. Never carries the receiving address.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRaffle {
    pub id: RaffleId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub prize_amount: f64,
    pub prize_symbol: String,
    pub ticket_price: f64,
    pub max_tickets: u64,
    pub tickets_sold: u64,
    pub tickets_left: u64,
    pub status: RaffleStatus,
    #[serde(serialize_with = "serialize_opt_timestamp")]
    pub starts_at: Option<UnixTimestamp>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub ends_at: UnixTimestamp,
    pub winner_user_id: Option<UserId>,
    #[serde(serialize_with = "serialize_opt_timestamp")]
    pub winner_drawn_at: Option<UnixTimestamp>,
}

impl PublicRaffle {
    pub fn project(raffle: &Raffle, tickets_sold: u64) -> Self {
        Self {
            id: raffle.id,
            title: raffle.title.clone(),
            description: raffle.description.clone(),
            image_url: raffle.image_url.clone(),
            prize_amount: raffle.prize_amount,
            prize_symbol: raffle.prize_symbol.clone(),
            ticket_price: raffle.ticket_price,
            max_tickets: raffle.max_tickets,
            tickets_sold,
            tickets_left: raffle.tickets_left(tickets_sold),
            status: raffle.status,
            starts_at: raffle.starts_at,
            ends_at: raffle.ends_at,
            winner_user_id: raffle.winner,
            winner_drawn_at: raffle.winner_drawn_at,
        }
    }
}

/// View handed to a connected payer building the transfer transaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRaffle {
    #[serde(flatten)]
    pub raffle: PublicRaffle,
    pub receiving_address: String,
}

impl PaymentRaffle {
    pub fn project(raffle: &Raffle, tickets_sold: u64) -> Self {
        Self {
            raffle: PublicRaffle::project(raffle, tickets_sold),
            receiving_address: raffle.receiving_address.clone(),
        }
    }
}

/// A completed raffle and the wallet that won it
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSummary {
    pub raffle_id: RaffleId,
    pub raffle_title: String,
    pub winner_wallet: String,
    #[serde(serialize_with = "serialize_opt_timestamp")]
    pub drawn_at: Option<UnixTimestamp>,
    pub prize_amount: f64,
    pub prize_symbol: String,
}

impl WinnerSummary {
    pub fn project(raffle: &Raffle, winner: &User) -> Self {
        Self {
            raffle_id: raffle.id,
            raffle_title: raffle.title.clone(),
            winner_wallet: winner.wallet_address.clone(),
            drawn_at: raffle.winner_drawn_at,
            prize_amount: raffle.prize_amount,
            prize_symbol: raffle.prize_symbol.clone(),
        }
    }
}

/// Raffle details shown next to a participant's entry
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRaffle {
    pub title: String,
    pub image_url: Option<String>,
    pub prize_amount: f64,
    pub prize_symbol: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub ends_at: UnixTimestamp,
    pub status: RaffleStatus,
}

/// One of a participant's entries with its raffle
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub raffle: EntryRaffle,
}

impl WalletEntry {
    pub fn project(entry: Entry, raffle: &Raffle) -> Self {
        Self {
            entry,
            raffle: EntryRaffle {
                title: raffle.title.clone(),
                image_url: raffle.image_url.clone(),
                prize_amount: raffle.prize_amount,
                prize_symbol: raffle.prize_symbol.clone(),
                ends_at: raffle.ends_at,
                status: raffle.status,
            },
        }
    }
}
