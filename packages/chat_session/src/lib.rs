//! Realtime chat session client for the marketplace platform.
//!
//! One spawned actor per session owns the websocket transport, the retry
//! policy, and all conversation state (ordered message feed, presence,
//! typing indicators). Callers drive it through a cloneable
//! [`SessionHandle`] and observe it through a broadcast event stream plus a
//! status watch channel:
//!
//! ```no_run
//! use chat_session::config::SessionConfig;
//! use chat_session::models::Identity;
//! use chat_session::ws::spawn_session;
//!
//! # async fn run() {
//! let identity = Identity {
//!     user_id: "alice@example.com".to_string(),
//!     display_name: "Alice".to_string(),
//!     role: "client".to_string(),
//!     avatar: None,
//!     conversation_id: None,
//! };
//! let handle = spawn_session(SessionConfig::default(), Some(identity));
//! let mut events = handle.subscribe();
//! handle.connect();
//! handle.join_conversation("C1");
//! while let Ok(event) = events.recv().await {
//!     // react to feed / presence / typing / status changes
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod models;
pub mod presence;
pub mod rest;
pub mod retry;
pub mod typing;
pub mod ws;

pub use config::SessionConfig;
pub use error::{ProtocolError, SessionError};
pub use events::SessionEvent;
pub use models::{
    ConnectionState, ConnectionStatus, Identity, Message, MessageKind, OnlineUser,
    TypingIndicator,
};
pub use rest::ConversationApi;
pub use ws::{SessionHandle, spawn_session};
