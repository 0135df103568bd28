//! Events broadcast to session subscribers.

use crate::models::{ConnectionStatus, Message, OnlineUser, TypingIndicator};

/// One observable change to the session. Delivered over a broadcast channel
/// in the order the underlying frames were dispatched.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connection lifecycle or status-line change.
    Status(ConnectionStatus),
    /// The feed (and joined conversation) was replaced wholesale.
    FeedReplaced {
        conversation_id: String,
        messages: Vec<Message>,
    },
    /// One message was inserted or updated in place.
    MessageUpserted(Message),
    UserOnline(OnlineUser),
    UserOffline { user_id: String },
    /// Additive presence snapshot was applied.
    PresenceSnapshot { online_count: usize },
    TypingStarted(TypingIndicator),
    TypingStopped(TypingIndicator),
}
