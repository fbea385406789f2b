// Raffle Engine - Payment verification
use std::future::Future;

use thiserror::Error;

use crate::state::Raffle;

/// A participant's claim that a transfer paid for their tickets
#[derive(Clone, Copy, Debug)]
pub struct PaymentClaim<'a> {
    pub raffle: &'a Raffle,
    pub wallet_address: &'a str,
    pub tx_hash: &'a str,
    pub quantity: u32,
}

impl PaymentClaim<'_> {
    /// Amount due in the prize currency
    pub fn expected_amount(&self) -> f64 {
        self.raffle.ticket_price * f64::from(self.quantity)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentRejection {
    #[error("transaction {0} was not found on chain")]
    UnknownTransaction(String),

    #[error("transaction paid {paid} but {expected} was due")]
    Underpaid { paid: f64, expected: f64 },

    #[error("transaction was not sent to the raffle's receiving address")]
    WrongRecipient,

    #[error("transaction was sent from a different wallet")]
    WrongSender,
}

/// Confirms a reported payment before the ledger records the entry.
///
/// Implementations normally query a chain RPC node for `tx_hash` and compare
/// sender, recipient and amount against the claim.
pub trait PaymentVerifier: Send + Sync {
    fn verify(
        &self,
        claim: &PaymentClaim<'_>,
    ) -> impl Future<Output = Result<(), PaymentRejection>> + Send;
}

/// Accepts every claim. The reported hash is recorded as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnverifiedPayments;

impl PaymentVerifier for UnverifiedPayments {
    async fn verify(&self, _claim: &PaymentClaim<'_>) -> Result<(), PaymentRejection> {
        Ok(())
    }
}
