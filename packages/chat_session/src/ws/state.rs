//! Per-session state bundle.
//!
//! Everything the reducer and the controller mutate lives here, so the whole
//! session can be driven in tests without a live transport. Mutation is
//! sequenced by the actor loop; there are no locks.

use crate::feed::MessageFeed;
use crate::models::{ConnectionState, ConnectionStatus, Identity};
use crate::presence::PresenceTracker;
use crate::retry::RetryState;
use crate::typing::{TypingDebounce, TypingTracker};

#[derive(Debug)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub connection: ConnectionState,
    /// Human-readable status detail (retry countdowns, terminal failures).
    pub detail: Option<String>,
    /// Handshake already sent on the current transport.
    pub handshake_sent: bool,
    /// `connection_established` received on the current transport.
    pub established: bool,
    pub retry: RetryState,
    pub feed: MessageFeed,
    pub presence: PresenceTracker,
    pub typing: TypingTracker,
    pub debounce: TypingDebounce,
}

impl SessionState {
    pub fn new(identity: Option<Identity>, max_retries: u32) -> Self {
        Self {
            identity,
            connection: ConnectionState::Disconnected,
            detail: None,
            handshake_sent: false,
            established: false,
            retry: RetryState::new(max_retries),
            feed: MessageFeed::new(),
            presence: PresenceTracker::new(),
            typing: TypingTracker::new(),
            debounce: TypingDebounce::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.connection,
            detail: self.detail.clone(),
        }
    }

    /// Transport opened: awaiting auth until `authentication_success`.
    pub fn on_transport_open(&mut self) {
        self.connection = ConnectionState::Connecting;
        self.handshake_sent = false;
        self.established = false;
    }

    /// Transport gone: drop per-connection ephemeral state. The retry
    /// decision is made separately from the close disposition.
    pub fn on_transport_closed(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.handshake_sent = false;
        self.established = false;
        self.typing.clear();
        self.debounce.disarm();
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Send gate: authenticated and a conversation joined.
    pub fn can_send(&self) -> bool {
        self.is_connected() && self.feed.conversation_id().is_some()
    }
}
