// Raffle Engine
// Ticket ledger and winner selection for prize raffles paid on chain

// Core modules
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Raffle services
pub mod admin;
pub mod catalog;
pub mod ledger;
pub mod selector;
pub mod session;

// Storage
pub mod memory_store;
pub mod store;
pub mod timeout;

// Collaborators injected into the services
pub mod clock;
pub mod config;
pub mod entropy;
pub mod payment;

pub use config::Config;
pub use error::{ErrorBody, RaffleError, StoreError};
pub use processor::Processor;
