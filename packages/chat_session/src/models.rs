//! Core data model shared between the wire protocol and the session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller identity used for the post-connect handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user identity (the marketplace account email).
    pub user_id: String,
    pub display_name: String,
    /// Account role on the platform (e.g. "client" or "freelancer").
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Conversation to rejoin immediately after authentication, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Message payload kind. Non-text kinds carry an opaque serialized payload
/// in `content` that the feed never interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    File,
    Image,
    Interview,
    InterviewInvitation,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

/// One chat message. Identity is `id`; the feed upserts on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
}

/// A remote identity currently online, keyed by stable `user_id`.
/// Multiple simultaneous connections by one identity coalesce to one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Ephemeral typing marker: a peer is composing in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub user_id: String,
    pub conversation_id: String,
}

/// Connection lifecycle state. `Connecting` subsumes "transport open,
/// awaiting auth" — `Connected` is only entered after `authentication_success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Caller-visible status: lifecycle state plus a human-readable detail line
/// (retry countdowns, terminal failures) intended for direct display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub detail: Option<String>,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            detail: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
