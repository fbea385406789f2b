// Raffle Engine - Boundary requests
use serde::Deserialize;

use crate::admin::NewRaffle;
use crate::ledger::EntryRequest;
use crate::state::{RaffleId, UserId};

/// A request accepted by the [`Processor`](crate::processor::Processor).
///
/// On the wire the variant is selected by the `action` field, e.g.
/// `{ "action": "draw_winner", "raffleId": "..." }`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RaffleRequest {
    /// Record a paid purchase
    RecordEntry(EntryRequest),

    /// Look up a wallet's entry for a raffle
    #[serde(rename_all = "camelCase")]
    CheckEntry { raffle_id: RaffleId, user_id: UserId },

    /// Resolve a wallet to its user row, creating it on first sight
    #[serde(rename_all = "camelCase")]
    GetOrCreateUser {
        #[serde(default)]
        wallet_address: String,
    },

    /// Draw the winner of one ended raffle
    #[serde(rename_all = "camelCase")]
    DrawWinner { raffle_id: RaffleId },

    /// Draw every ended raffle still waiting for a winner
    SweepEndedRaffles,

    /// Read a raffle with its ticket counts
    #[serde(rename_all = "camelCase")]
    GetRaffle { raffle_id: RaffleId },

    /// Live raffles, newest first
    ListLiveRaffles,

    /// Raffles past their end time, drafts excluded
    ListEndedRaffles,

    /// Completed raffles with their winning wallets
    ListWinners,

    /// A wallet's entries with raffle details
    #[serde(rename_all = "camelCase")]
    ListWalletEntries {
        #[serde(default)]
        wallet_address: String,
    },

    /// Administrator: define a new raffle
    CreateRaffle(NewRaffle),

    /// Administrator: draft -> live
    #[serde(rename_all = "camelCase")]
    PublishRaffle { raffle_id: RaffleId },

    /// Administrator: live -> closed
    #[serde(rename_all = "camelCase")]
    CloseRaffle { raffle_id: RaffleId },
}

impl RaffleRequest {
    /// Label used when logging the dispatched request
    pub fn name(&self) -> &'static str {
        match self {
            RaffleRequest::RecordEntry(_) => "Record Entry",
            RaffleRequest::CheckEntry { .. } => "Check Entry",
            RaffleRequest::GetOrCreateUser { .. } => "Get Or Create User",
            RaffleRequest::DrawWinner { .. } => "Draw Winner",
            RaffleRequest::SweepEndedRaffles => "Sweep Ended Raffles",
            RaffleRequest::GetRaffle { .. } => "Get Raffle",
            RaffleRequest::ListLiveRaffles => "List Live Raffles",
            RaffleRequest::ListEndedRaffles => "List Ended Raffles",
            RaffleRequest::ListWinners => "List Winners",
            RaffleRequest::ListWalletEntries { .. } => "List Wallet Entries",
            RaffleRequest::CreateRaffle(_) => "Create Raffle",
            RaffleRequest::PublishRaffle { .. } => "Publish Raffle",
            RaffleRequest::CloseRaffle { .. } => "Close Raffle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_entry_parses_camel_case_fields() {
        let raffle_id = RaffleId::new();
        let json = format!(
            r#"{{"action":"record_entry","raffleId":"{}","walletAddress":"0xA","txHash":"0xT","quantity":3}}"#,
            raffle_id
        );
        let request: RaffleRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(
            request,
            RaffleRequest::RecordEntry(EntryRequest::new(raffle_id, "0xA", "0xT", 3))
        );
    }

    #[test]
    fn test_quantity_is_optional() {
        let raffle_id = RaffleId::new();
        let json = format!(
            r#"{{"action":"record_entry","raffleId":"{}","walletAddress":"0xA","txHash":"0xT"}}"#,
            raffle_id
        );
        match serde_json::from_str::<RaffleRequest>(&json).unwrap() {
            RaffleRequest::RecordEntry(entry) => assert_eq!(entry.quantity, None),
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_unit_and_struct_actions() {
        let request: RaffleRequest =
            serde_json::from_str(r#"{"action":"sweep_ended_raffles"}"#).unwrap();
        assert_eq!(request, RaffleRequest::SweepEndedRaffles);

        let raffle_id = RaffleId::new();
        let json = format!(r#"{{"action":"draw_winner","raffleId":"{}"}}"#, raffle_id);
        let request: RaffleRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, RaffleRequest::DrawWinner { raffle_id });
        assert_eq!(request.name(), "Draw Winner");

        let request: RaffleRequest =
            serde_json::from_str(r#"{"action":"list_wallet_entries","walletAddress":"0xA"}"#).unwrap();
        assert_eq!(
            request,
            RaffleRequest::ListWalletEntries {
                wallet_address: "0xA".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<RaffleRequest>(r#"{"action":"refund"}"#).is_err());
        assert!(serde_json::from_str::<RaffleRequest>(r#"{"raffleId":"x"}"#).is_err());
    }
}
