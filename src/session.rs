// Raffle Engine - Wallet session and request context
use uuid::Uuid;

use crate::error::RaffleError;
use crate::state::UnixTimestamp;
use crate::utils::require_field;

/// A wallet connection with an explicit connect/disconnect lifecycle.
///
/// Owned by whoever handles the participant's connection and lent to each
/// request through a [`RequestContext`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletSession {
    wallet_address: String,
    chain_id: Option<u64>,
    connected_at: UnixTimestamp,
    connected: bool,
}

impl WalletSession {
    pub fn connect(
        wallet_address: &str,
        chain_id: Option<u64>,
        now: UnixTimestamp,
    ) -> Result<Self, RaffleError> {
        let wallet_address = require_field("walletAddress", wallet_address)?;
        Ok(Self {
            wallet_address: wallet_address.to_string(),
            chain_id,
            connected_at: now,
            connected: true,
        })
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn switch_chain(&mut self, chain_id: u64) {
        self.chain_id = Some(chain_id);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The connected wallet; `None` once disconnected.
    pub fn wallet_address(&self) -> Option<&str> {
        self.connected.then_some(self.wallet_address.as_str())
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn connected_at(&self) -> UnixTimestamp {
        self.connected_at
    }
}

/// Per-request context handed to the processor.
#[derive(Clone, Copy, Debug)]
pub struct RequestContext<'a> {
    pub request_id: Uuid,
    session: Option<&'a WalletSession>,
}

impl<'a> RequestContext<'a> {
    /// A request from a visitor with no wallet connected
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            session: None,
        }
    }

    pub fn with_session(session: &'a WalletSession) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            session: Some(session),
        }
    }

    /// Wallet of a connected payer, if any.
    pub fn payer_wallet(&self) -> Option<&'a str> {
        self.session.and_then(WalletSession::wallet_address)
    }

    /// Chain the connected wallet is on; `None` without a live session.
    pub fn chain_id(&self) -> Option<u64> {
        self.session
            .filter(|session| session.is_connected())
            .and_then(WalletSession::chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = WalletSession::connect(" 0xA ", Some(1), 100).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.wallet_address(), Some("0xA"));
        assert_eq!(session.connected_at(), 100);

        session.switch_chain(8453);
        assert_eq!(session.chain_id(), Some(8453));

        session.disconnect();
        assert!(!session.is_connected());
        assert_eq!(session.wallet_address(), None);
    }

    #[test]
    fn test_connect_requires_wallet() {
        assert_eq!(
            WalletSession::connect("", None, 0),
            Err(RaffleError::MissingField("walletAddress"))
        );
    }

    #[test]
    fn test_context_payer_follows_session() {
        assert_eq!(RequestContext::anonymous().payer_wallet(), None);

        let mut session = WalletSession::connect("0xB", None, 0).unwrap();
        assert_eq!(RequestContext::with_session(&session).payer_wallet(), Some("0xB"));

        session.disconnect();
        assert_eq!(RequestContext::with_session(&session).payer_wallet(), None);
    }

    #[test]
    fn test_context_reports_current_chain() {
        let mut session = WalletSession::connect("0xC", Some(1), 0).unwrap();
        assert_eq!(RequestContext::with_session(&session).chain_id(), Some(1));

        session.switch_chain(8453);
        assert_eq!(RequestContext::with_session(&session).chain_id(), Some(8453));

        session.disconnect();
        assert_eq!(RequestContext::with_session(&session).chain_id(), None);
        assert_eq!(RequestContext::anonymous().chain_id(), None);
    }
}
