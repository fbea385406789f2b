// Raffle Engine - Errors
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::state::{DrawnWinner, RaffleStatus, UnixTimestamp};

/// Errors raised by a storage adapter.
///
/// Adapters translate their backend's failures into these variants so that
/// callers never inspect error message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The call did not complete within the configured bound
    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),

    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(&'static str),

    /// A referenced row does not exist
    #[error("Referenced row missing in {0}")]
    MissingRow(&'static str),

    /// Any other backend failure, with the backend's own code when it has one
    #[error("Storage backend error: {message}")]
    Backend { code: Option<String>, message: String },

    /// Snapshot bytes could not be encoded or decoded
    #[error("Snapshot codec error: {0}")]
    Codec(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            code: None,
            message: message.into(),
        }
    }

    /// Backend-specific code, if the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Broad category of a [`RaffleError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected before any storage mutation
    Validation,
    /// Raffle or user absent
    NotFound,
    /// Business rule rejection (capacity, lifecycle, already drawn)
    Rejected,
    /// Storage or infrastructure failure, possibly transient
    Storage,
}

/// Errors that may be returned by the ledger, the selector and the admin API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaffleError {
    /// A required field was empty or absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Ticket quantity outside the accepted range
    #[error("Quantity must be between {min} and {max}, got {quantity}")]
    InvalidQuantity { quantity: u32, min: u32, max: u32 },

    /// Raffle definition failed validation
    #[error("Invalid raffle: {0}")]
    InvalidRaffle(String),

    /// Raffle does not exist
    #[error("Raffle not found")]
    RaffleNotFound,

    /// User does not exist
    #[error("User not found")]
    UserNotFound,

    /// Raffle is not live
    #[error("Raffle is not live (status: {0})")]
    RaffleNotLive(RaffleStatus),

    /// Raffle has already ended
    #[error("Raffle has already ended")]
    RaffleEnded,

    /// Raffle has not ended yet
    #[error("Raffle has not ended yet")]
    RaffleNotEnded { ends_at: UnixTimestamp },

    /// A winner was drawn before; carries that winner when there is one
    #[error("Winner already drawn")]
    AlreadyDrawn { winner: Option<DrawnWinner> },

    /// Not enough tickets available
    #[error("Not enough tickets available, {}", tickets_left(.remaining))]
    CapacityExceeded { remaining: u64 },

    /// The payment verifier refused the reported transaction
    #[error("Payment rejected: {0}")]
    PaymentRejected(String),

    /// Status change not allowed from the current status
    #[error("Cannot move raffle from {from} to {to}")]
    InvalidTransition { from: RaffleStatus, to: RaffleStatus },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

fn tickets_left(remaining: &u64) -> String {
    match remaining {
        1 => "1 ticket left".to_string(),
        n => format!("{} tickets left", n),
    }
}

impl RaffleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RaffleError::MissingField(_)
            | RaffleError::InvalidQuantity { .. }
            | RaffleError::InvalidRaffle(_) => ErrorKind::Validation,
            RaffleError::RaffleNotFound | RaffleError::UserNotFound => ErrorKind::NotFound,
            RaffleError::RaffleNotLive(_)
            | RaffleError::RaffleEnded
            | RaffleError::RaffleNotEnded { .. }
            | RaffleError::AlreadyDrawn { .. }
            | RaffleError::CapacityExceeded { .. }
            | RaffleError::PaymentRejected(_)
            | RaffleError::InvalidTransition { .. } => ErrorKind::Rejected,
            RaffleError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RaffleError::MissingField(_)
            | RaffleError::InvalidQuantity { .. }
            | RaffleError::InvalidRaffle(_) => "validation",
            RaffleError::RaffleNotFound | RaffleError::UserNotFound => "not_found",
            RaffleError::RaffleNotLive(_) => "not_live",
            RaffleError::RaffleEnded => "ended",
            RaffleError::RaffleNotEnded { .. } => "not_ended",
            RaffleError::AlreadyDrawn { .. } => "already_drawn",
            RaffleError::CapacityExceeded { .. } => "capacity",
            RaffleError::PaymentRejected(_) => "payment_rejected",
            RaffleError::InvalidTransition { .. } => "invalid_transition",
            RaffleError::Storage(StoreError::Timeout(_)) => "timeout",
            RaffleError::Storage(_) => "storage",
        }
    }

    /// HTTP-equivalent status for callers that expose the core over HTTP.
    pub fn status_code(&self) -> u16 {
        match self {
            RaffleError::RaffleNotFound | RaffleError::UserNotFound => 404,
            RaffleError::AlreadyDrawn { .. } | RaffleError::InvalidTransition { .. } => 409,
            RaffleError::Storage(StoreError::Timeout(_)) => 504,
            RaffleError::Storage(_) => 500,
            _ => 400,
        }
    }
}

/// Wire form of an error: `{ kind, message }`, plus the existing winner for
/// `already_drawn` and the backend code for storage failures.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<DrawnWinner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl ErrorBody {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: "validation",
            message: message.into(),
            winner: None,
            code: None,
            status: 400,
        }
    }
}

impl From<RaffleError> for ErrorBody {
    fn from(e: RaffleError) -> Self {
        let code = match &e {
            RaffleError::Storage(store) => store.code().map(str::to_owned),
            _ => None,
        };
        let kind = e.code();
        let status = e.status_code();
        let message = e.to_string();
        let winner = match e {
            RaffleError::AlreadyDrawn { winner } => winner,
            _ => None,
        };
        Self {
            kind,
            message,
            winner,
            code,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_counts_tickets() {
        let message = |remaining| RaffleError::CapacityExceeded { remaining }.to_string();
        assert_eq!(message(4), "Not enough tickets available, 4 tickets left");
        assert_eq!(message(1), "Not enough tickets available, 1 ticket left");
        assert_eq!(message(0), "Not enough tickets available, 0 tickets left");
    }

    #[test]
    fn test_error_body_carries_store_code() {
        let err = RaffleError::Storage(StoreError::Backend {
            code: Some("40001".to_string()),
            message: "serialization failure".to_string(),
        });
        let body = ErrorBody::from(err);
        assert_eq!(body.kind, "storage");
        assert_eq!(body.code.as_deref(), Some("40001"));
        assert_eq!(body.status, 500);
    }
}
