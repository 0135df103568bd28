//! Inbound frame reducer.
//!
//! One pure function applies a decoded `ServerFrame` to the `SessionState`
//! and returns what to surface (events) and what to write back to the wire
//! (outbound frames). The actor invokes it sequentially from the receive
//! loop; tests invoke it directly with no transport.

use tracing::{debug, info, warn};

use crate::error::{SessionError, is_auth_code};
use crate::events::SessionEvent;
use crate::models::ConnectionState;

use super::protocol::{AuthenticatePayload, ClientFrame, ServerFrame};
use super::state::SessionState;

/// Result of applying one frame.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub events: Vec<SessionEvent>,
    pub outbound: Vec<ClientFrame>,
}

impl Dispatch {
    fn status(state: &SessionState) -> Self {
        Dispatch {
            events: vec![SessionEvent::Status(state.status())],
            outbound: Vec::new(),
        }
    }
}

pub fn apply_frame(state: &mut SessionState, frame: ServerFrame) -> Dispatch {
    match frame {
        ServerFrame::ConnectionEstablished {} => {
            state.established = true;
            // Identity may have arrived after the transport opened; flush the
            // deferred handshake now.
            let mut out = Dispatch::default();
            if !state.handshake_sent {
                if let Some(identity) = &state.identity {
                    debug!("[AUTH] sending deferred handshake for {}", identity.user_id);
                    out.outbound
                        .push(ClientFrame::Authenticate(AuthenticatePayload::from(identity)));
                    state.handshake_sent = true;
                }
            }
            out
        }

        ServerFrame::AuthenticationSuccess {} => {
            info!("[AUTH] authenticated");
            state.connection = ConnectionState::Connected;
            state.detail = None;
            state.retry.on_authenticated();
            Dispatch::status(state)
        }

        ServerFrame::Error { code, message } => {
            if is_auth_code(code) {
                // Terminal: reconnection stays disabled until a manual
                // reconnect, regardless of remaining retry budget.
                warn!("[AUTH] auth error {}: {}", code, message);
                state.retry.on_close(crate::retry::CloseDisposition::AuthError(code));
                state.detail = Some(SessionError::Auth { code, message }.to_string());
            } else {
                warn!("[WS] server error {}: {}", code, message);
                state.detail = Some(message);
            }
            Dispatch::status(state)
        }

        ServerFrame::MessagesLoaded {
            conversation_id,
            messages,
        } => {
            state.feed.load_bulk(conversation_id.clone(), messages);
            Dispatch {
                events: vec![SessionEvent::FeedReplaced {
                    conversation_id,
                    messages: state.feed.messages().to_vec(),
                }],
                outbound: Vec::new(),
            }
        }

        ServerFrame::NewMessage(message)
        | ServerFrame::InterviewScheduled(message)
        | ServerFrame::InterviewStatusUpdated(message)
        | ServerFrame::InterviewRescheduled(message)
        | ServerFrame::InterviewInvitationSent(message)
        | ServerFrame::InterviewInvitationUpdated(message) => {
            match state.feed.conversation_id() {
                Some(joined) if joined == message.conversation_id => {
                    state.feed.apply_event(message.clone());
                    Dispatch {
                        events: vec![SessionEvent::MessageUpserted(message)],
                        outbound: Vec::new(),
                    }
                }
                _ => {
                    debug!(
                        "[FEED] dropping message {} for non-joined conversation {}",
                        message.id, message.conversation_id
                    );
                    Dispatch::default()
                }
            }
        }

        ServerFrame::UserOnline(user) | ServerFrame::UserJoined(user) => {
            debug!("[PRESENCE] {} online", user.user_id);
            state.presence.apply_join(user.clone());
            Dispatch {
                events: vec![SessionEvent::UserOnline(user)],
                outbound: Vec::new(),
            }
        }

        ServerFrame::UserOffline { user_id } => {
            let mut events = Vec::new();
            if state.presence.apply_leave(&user_id) {
                events.push(SessionEvent::UserOffline { user_id });
            }
            Dispatch {
                events,
                outbound: Vec::new(),
            }
        }

        ServerFrame::OnlineUsersList { users } => {
            state.presence.apply_snapshot(users);
            Dispatch {
                events: vec![SessionEvent::PresenceSnapshot {
                    online_count: state.presence.len(),
                }],
                outbound: Vec::new(),
            }
        }

        ServerFrame::UserTyping(indicator) => {
            let mut events = Vec::new();
            if state.typing.remote_start(indicator.clone()) {
                events.push(SessionEvent::TypingStarted(indicator));
            }
            Dispatch {
                events,
                outbound: Vec::new(),
            }
        }

        ServerFrame::UserStopTyping(indicator) => {
            let mut events = Vec::new();
            if state.typing.remote_stop(&indicator) {
                events.push(SessionEvent::TypingStopped(indicator));
            }
            Dispatch {
                events,
                outbound: Vec::new(),
            }
        }

        ServerFrame::UserLeft { user_id } => {
            // Leaving a conversation clears typing only; `user_offline` owns
            // presence removal.
            let events = state
                .typing
                .remove_user(&user_id)
                .into_iter()
                .map(SessionEvent::TypingStopped)
                .collect();
            Dispatch {
                events,
                outbound: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionState, Identity, Message, MessageKind, OnlineUser, TypingIndicator};
    use chrono::{DateTime, Utc};

    fn identity() -> Identity {
        Identity {
            user_id: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
            role: "client".to_string(),
            avatar: None,
            conversation_id: None,
        }
    }

    fn state_with_identity() -> SessionState {
        let mut state = SessionState::new(Some(identity()), 5);
        state.on_transport_open();
        state
    }

    fn at(hhmm: &str) -> DateTime<Utc> {
        format!("2025-03-01T{hhmm}:00Z").parse().unwrap()
    }

    fn msg(id: &str, conversation: &str, hhmm: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation.to_string(),
            sender_id: "bob@example.com".to_string(),
            content: "hi".to_string(),
            timestamp: at(hhmm),
            kind: MessageKind::Text,
        }
    }

    fn online(user_id: &str) -> OnlineUser {
        OnlineUser {
            user_id: user_id.to_string(),
            display_name: user_id.to_string(),
            last_seen_at: None,
        }
    }

    #[test]
    fn established_flushes_deferred_handshake_once() {
        let mut state = state_with_identity();
        let out = apply_frame(&mut state, ServerFrame::ConnectionEstablished {});
        assert_eq!(out.outbound.len(), 1);
        assert!(matches!(out.outbound[0], ClientFrame::Authenticate(_)));
        assert!(state.handshake_sent);

        // Re-delivery does not re-send.
        let out = apply_frame(&mut state, ServerFrame::ConnectionEstablished {});
        assert!(out.outbound.is_empty());
    }

    #[test]
    fn established_without_identity_defers() {
        let mut state = SessionState::new(None, 5);
        state.on_transport_open();
        let out = apply_frame(&mut state, ServerFrame::ConnectionEstablished {});
        assert!(out.outbound.is_empty());
        assert!(!state.handshake_sent);
        assert!(state.established);
    }

    #[test]
    fn auth_success_connects_and_resets_retries() {
        let mut state = state_with_identity();
        state.retry.attempt = 3;
        state.detail = Some("retrying in 4s (3/5)".to_string());

        let out = apply_frame(&mut state, ServerFrame::AuthenticationSuccess {});
        assert_eq!(state.connection, ConnectionState::Connected);
        assert_eq!(state.retry.attempt, 0);
        assert!(state.detail.is_none());
        assert!(matches!(out.events[0], SessionEvent::Status(_)));
    }

    #[test]
    fn auth_error_code_halts_reconnection_immediately() {
        // First failure, full budget remaining — 4001 still goes terminal.
        let mut state = state_with_identity();
        let _ = apply_frame(
            &mut state,
            ServerFrame::Error {
                code: 4001,
                message: "invalid session".to_string(),
            },
        );
        assert!(!state.retry.auto_reconnect);
        assert!(!state.retry.may_connect());
        assert_eq!(
            state.detail.as_deref(),
            Some("authentication failed (4001): invalid session")
        );
    }

    #[test]
    fn transient_error_code_only_surfaces_message() {
        let mut state = state_with_identity();
        let _ = apply_frame(
            &mut state,
            ServerFrame::Error {
                code: 1011,
                message: "internal hiccup".to_string(),
            },
        );
        assert!(state.retry.auto_reconnect);
        assert_eq!(state.detail.as_deref(), Some("internal hiccup"));
    }

    #[test]
    fn messages_loaded_then_late_message_keeps_order() {
        let mut state = state_with_identity();
        let _ = apply_frame(
            &mut state,
            ServerFrame::MessagesLoaded {
                conversation_id: "C1".to_string(),
                messages: vec![msg("a", "C1", "10:00"), msg("c", "C1", "10:02")],
            },
        );
        let _ = apply_frame(&mut state, ServerFrame::NewMessage(msg("b", "C1", "10:01")));

        let ids: Vec<_> = state.feed.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn bulk_load_supersedes_other_conversation() {
        let mut state = state_with_identity();
        let _ = apply_frame(
            &mut state,
            ServerFrame::MessagesLoaded {
                conversation_id: "A".to_string(),
                messages: vec![msg("a1", "A", "10:00")],
            },
        );
        let _ = apply_frame(
            &mut state,
            ServerFrame::MessagesLoaded {
                conversation_id: "B".to_string(),
                messages: vec![msg("b1", "B", "09:00")],
            },
        );
        assert_eq!(state.feed.conversation_id(), Some("B"));
        assert!(state.feed.messages().iter().all(|m| m.conversation_id == "B"));
    }

    #[test]
    fn message_for_non_joined_conversation_is_dropped() {
        let mut state = state_with_identity();
        let _ = apply_frame(
            &mut state,
            ServerFrame::MessagesLoaded {
                conversation_id: "A".to_string(),
                messages: vec![],
            },
        );
        let out = apply_frame(&mut state, ServerFrame::NewMessage(msg("x", "B", "10:00")));
        assert!(out.events.is_empty());
        assert!(state.feed.is_empty());
    }

    #[test]
    fn interview_update_upserts_in_place() {
        let mut state = state_with_identity();
        let _ = apply_frame(
            &mut state,
            ServerFrame::MessagesLoaded {
                conversation_id: "C1".to_string(),
                messages: vec![msg("i-1", "C1", "10:00")],
            },
        );
        let mut update = msg("i-1", "C1", "10:00");
        update.content = r#"{"status":"accepted"}"#.to_string();
        let out = apply_frame(&mut state, ServerFrame::InterviewStatusUpdated(update));

        assert_eq!(state.feed.len(), 1);
        assert_eq!(state.feed.messages()[0].content, r#"{"status":"accepted"}"#);
        assert!(matches!(out.events[0], SessionEvent::MessageUpserted(_)));
    }

    #[test]
    fn presence_frames_update_tracker() {
        let mut state = state_with_identity();
        let _ = apply_frame(&mut state, ServerFrame::UserOnline(online("bob@example.com")));
        assert!(state.presence.is_online("bob@example.com"));

        let _ = apply_frame(
            &mut state,
            ServerFrame::OnlineUsersList {
                users: vec![online("carol@example.com")],
            },
        );
        // Snapshot is additive.
        assert_eq!(state.presence.len(), 2);

        let out = apply_frame(
            &mut state,
            ServerFrame::UserOffline {
                user_id: "bob@example.com".to_string(),
            },
        );
        assert!(!state.presence.is_online("bob@example.com"));
        assert_eq!(out.events.len(), 1);

        // Offline for an unknown user emits nothing.
        let out = apply_frame(
            &mut state,
            ServerFrame::UserOffline {
                user_id: "nobody@example.com".to_string(),
            },
        );
        assert!(out.events.is_empty());
    }

    #[test]
    fn remote_typing_is_idempotent() {
        let mut state = state_with_identity();
        let indicator = TypingIndicator {
            user_id: "bob@example.com".to_string(),
            conversation_id: "C1".to_string(),
        };
        let out = apply_frame(&mut state, ServerFrame::UserTyping(indicator.clone()));
        assert_eq!(out.events.len(), 1);
        let out = apply_frame(&mut state, ServerFrame::UserTyping(indicator.clone()));
        assert!(out.events.is_empty());

        let out = apply_frame(&mut state, ServerFrame::UserStopTyping(indicator));
        assert_eq!(out.events.len(), 1);
        assert!(state.typing.is_empty());
    }

    #[test]
    fn user_left_clears_typing_not_presence() {
        let mut state = state_with_identity();
        let _ = apply_frame(&mut state, ServerFrame::UserOnline(online("bob@example.com")));
        let _ = apply_frame(
            &mut state,
            ServerFrame::UserTyping(TypingIndicator {
                user_id: "bob@example.com".to_string(),
                conversation_id: "C1".to_string(),
            }),
        );

        let out = apply_frame(
            &mut state,
            ServerFrame::UserLeft {
                user_id: "bob@example.com".to_string(),
            },
        );
        assert!(matches!(out.events[0], SessionEvent::TypingStopped(_)));
        assert!(state.typing.is_empty());
        assert!(state.presence.is_online("bob@example.com"));
    }
}
