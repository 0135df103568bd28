//! Wire protocol types.
//!
//! Every frame on the duplex connection is one JSON object shaped
//! `{type, payload}`. Both directions are modeled as serde enums tagged on
//! `type` with the body under `payload`; payload field names are camelCase
//! to match the server.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::{Identity, Message, MessageKind, OnlineUser, TypingIndicator};

/// Frames sent FROM the client TO the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Post-connect identity handshake. Must be acknowledged by
    /// `authentication_success` before the session accepts sends.
    Authenticate(AuthenticatePayload),
    JoinConversation {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    SendMessage {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        content: String,
        #[serde(rename = "type")]
        kind: MessageKind,
    },
    Typing {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    StopTyping {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    /// Interview scheduling request. `interview_data` is opaque to this
    /// client; the server echoes it back as a message-bearing frame.
    InterviewScheduled {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "interviewData")]
        interview_data: serde_json::Value,
        #[serde(rename = "proposalId", skip_serializing_if = "Option::is_none")]
        proposal_id: Option<String>,
    },
}

/// Payload of the `authenticate` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatePayload {
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "type")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(
        rename = "conversationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_id: Option<String>,
}

impl From<&Identity> for AuthenticatePayload {
    fn from(identity: &Identity) -> Self {
        Self {
            user_email: identity.user_id.clone(),
            user_name: identity.display_name.clone(),
            role: identity.role.clone(),
            avatar: identity.avatar.clone(),
            conversation_id: identity.conversation_id.clone(),
        }
    }
}

impl ClientFrame {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// Frames sent FROM the server TO the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerFrame {
    /// First frame after transport open; a deferred handshake is flushed on it.
    ConnectionEstablished {},
    /// Handshake accepted — the session becomes usable for sends.
    AuthenticationSuccess {},
    Error {
        code: u16,
        message: String,
    },
    MessagesLoaded {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        messages: Vec<Message>,
    },
    NewMessage(Message),
    UserOnline(OnlineUser),
    UserOffline {
        #[serde(rename = "userId")]
        user_id: String,
    },
    OnlineUsersList {
        users: Vec<OnlineUser>,
    },
    UserTyping(TypingIndicator),
    UserStopTyping(TypingIndicator),
    UserJoined(OnlineUser),
    UserLeft {
        #[serde(rename = "userId")]
        user_id: String,
    },
    // Interview lifecycle frames all carry a full message snapshot whose
    // content is an opaque serialized payload; the feed upserts them like
    // any other message event.
    InterviewScheduled(Message),
    InterviewStatusUpdated(Message),
    InterviewRescheduled(Message),
    InterviewInvitationSent(Message),
    InterviewInvitationUpdated(Message),
}

/// Frame types this client understands. Anything else decodes into the
/// explicit unrecognized branch instead of silently falling through.
const KNOWN_SERVER_TYPES: [&str; 17] = [
    "connection_established",
    "authentication_success",
    "error",
    "messages_loaded",
    "new_message",
    "user_online",
    "user_offline",
    "online_users_list",
    "user_typing",
    "user_stop_typing",
    "user_joined",
    "user_left",
    "interview_scheduled",
    "interview_status_updated",
    "interview_rescheduled",
    "interview_invitation_sent",
    "interview_invitation_updated",
];

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

impl ServerFrame {
    /// Decode one inbound text frame, distinguishing an unknown frame type
    /// (log-and-ignore at the call site) from a malformed one (dropped).
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawFrame =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        if !KNOWN_SERVER_TYPES.contains(&raw.frame_type.as_str()) {
            return Err(ProtocolError::UnrecognizedType(raw.frame_type));
        }
        let normalized = serde_json::json!({
            "type": raw.frame_type,
            "payload": raw.payload.unwrap_or_else(|| serde_json::json!({})),
        });
        serde_json::from_value(normalized).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// The message snapshot carried by message-bearing frames, if this is one.
    pub fn into_message(self) -> Option<Message> {
        match self {
            ServerFrame::NewMessage(m)
            | ServerFrame::InterviewScheduled(m)
            | ServerFrame::InterviewStatusUpdated(m)
            | ServerFrame::InterviewRescheduled(m)
            | ServerFrame::InterviewInvitationSent(m)
            | ServerFrame::InterviewInvitationUpdated(m) => Some(m),
            _ => None,
        }
    }
}
