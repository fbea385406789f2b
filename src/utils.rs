// Raffle Engine - Utility Functions
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::config::DrawWeighting;
use crate::error::RaffleError;
use crate::state::{Entry, UnixTimestamp};

/// Mixing step of splitmix64.
pub fn mix(a: u64, b: u64) -> u64 {
    let mut z = a.wrapping_add(b).wrapping_add(0x9e3779b97f4a7c15);

    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Maps a random value into `[0, range)` without modulo bias.
///
/// Values above the largest multiple of `range` are re-mixed and retried.
/// Returns `None` for an empty range.
pub fn unbiased_range(x: u64, range: u64) -> Option<u64> {
    if range == 0 {
        return None;
    }
    if range.is_power_of_two() {
        return Some(x & (range - 1));
    }

    let threshold = u64::MAX - (u64::MAX % range);
    let mut value = x;
    for attempt in 0..64u64 {
        if value < threshold {
            return Some(value % range);
        }
        value = mix(value, attempt + 1);
    }

    // Unreachable in practice: each attempt fails with probability < 1/2.
    Some(value % range)
}

/// Sum of ticket quantities
pub fn tickets_sold<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> u64 {
    entries.into_iter().map(|e| u64::from(e.quantity)).sum()
}

/// Picks the index of the winning entry.
///
/// `PerEntry` gives every entry the same chance. `PerTicket` draws a ticket
/// number over the summed quantities and finds the entry owning it through
/// the cumulative totals.
pub fn pick_winner_index(entries: &[Entry], weighting: DrawWeighting, random: u64) -> Option<usize> {
    match weighting {
        DrawWeighting::PerEntry => {
            unbiased_range(random, entries.len() as u64).map(|index| index as usize)
        }
        DrawWeighting::PerTicket => {
            let cumulative: Vec<u64> = entries
                .iter()
                .scan(0u64, |total, entry| {
                    *total += u64::from(entry.quantity);
                    Some(*total)
                })
                .collect();
            let total = cumulative.last().copied().unwrap_or(0);
            let ticket = unbiased_range(random, total)?;
            Some(cumulative.partition_point(|&upper| upper <= ticket))
        }
    }
}

/// Trims a required text field, rejecting it when empty.
pub fn require_field<'a>(name: &'static str, value: &'a str) -> Result<&'a str, RaffleError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RaffleError::MissingField(name));
    }
    Ok(value)
}

/// Trims an optional text field; blank becomes `None`.
pub fn optional_field(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

pub fn to_datetime(ts: UnixTimestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

pub fn serialize_timestamp<S: Serializer>(ts: &UnixTimestamp, serializer: S) -> Result<S::Ok, S::Error> {
    to_datetime(*ts).serialize(serializer)
}

pub fn serialize_opt_timestamp<S: Serializer>(
    ts: &Option<UnixTimestamp>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    ts.map(to_datetime).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EntryId, RaffleId, UserId};

    fn entry(quantity: u32) -> Entry {
        Entry {
            id: EntryId::new(),
            raffle_id: RaffleId::new(),
            user_id: UserId::new(),
            tx_hash: "0xhash".to_string(),
            quantity,
            email: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_unbiased_range_bounds() {
        assert_eq!(unbiased_range(42, 0), None);
        assert_eq!(unbiased_range(u64::MAX, 1), Some(0));
        assert_eq!(unbiased_range(13, 8), Some(5));
        for x in [0, 1, 7, u64::MAX / 3, u64::MAX - 1, u64::MAX] {
            let value = unbiased_range(x, 10).unwrap();
            assert!(value < 10);
        }
    }

    #[test]
    fn test_per_entry_ignores_quantity() {
        let entries = vec![entry(1), entry(50)];
        assert_eq!(pick_winner_index(&entries, DrawWeighting::PerEntry, 0), Some(0));
        assert_eq!(pick_winner_index(&entries, DrawWeighting::PerEntry, 1), Some(1));
    }

    #[test]
    fn test_per_ticket_maps_ticket_to_owner() {
        // Tickets 0..2 belong to entry 0, 2..7 to entry 1, 7 to entry 2.
        let entries = vec![entry(2), entry(5), entry(1)];
        let total = 8;
        let owners: Vec<usize> = (0..total)
            .map(|ticket| pick_winner_index(&entries, DrawWeighting::PerTicket, ticket).unwrap())
            .collect();
        assert_eq!(owners, vec![0, 0, 1, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_pick_from_empty() {
        assert_eq!(pick_winner_index(&[], DrawWeighting::PerEntry, 9), None);
        assert_eq!(pick_winner_index(&[], DrawWeighting::PerTicket, 9), None);
    }

    #[test]
    fn test_tickets_sold_sums_quantities() {
        let entries = vec![entry(1), entry(5), entry(3)];
        assert_eq!(tickets_sold(&entries), 9);
    }

    #[test]
    fn test_require_field_trims() {
        assert_eq!(require_field("walletAddress", "  0xA "), Ok("0xA"));
        assert_eq!(
            require_field("txHash", "   "),
            Err(RaffleError::MissingField("txHash"))
        );
        assert_eq!(optional_field(Some("  ")), None);
        assert_eq!(optional_field(Some(" a@b.io ")), Some("a@b.io".to_string()));
    }
}
