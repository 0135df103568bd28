//! Public gateway to a running session actor.
//!
//! `spawn_session` starts the actor task and returns a cheaply-cloneable
//! `SessionHandle`. Realtime operations are fire-and-forget commands; the
//! outcomes come back through the event stream and the status watch. The
//! REST collaborator rides along on the handle because conversation creation
//! happens out-of-band from the realtime channel.

use tokio::sync::{broadcast, mpsc, watch};
use tracing::warn;

use crate::config::SessionConfig;
use crate::events::SessionEvent;
use crate::models::{ConnectionStatus, Identity, MessageKind};
use crate::rest::ConversationApi;

use super::session::{Command, Session};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Start a session actor. The session does not connect until
/// [`SessionHandle::connect`] is called; `identity` may arrive later via
/// [`SessionHandle::update_identity`].
pub fn spawn_session(config: SessionConfig, identity: Option<Identity>) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::disconnected());
    let api = ConversationApi::new(config.rest_base_url.clone());

    let session = Session::new(config, identity, cmd_rx, events_tx.clone(), status_tx);
    tokio::spawn(session.run());

    SessionHandle {
        cmd_tx,
        events_tx,
        status_rx,
        api,
    }
}

#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SessionEvent>,
    status_rx: watch::Receiver<ConnectionStatus>,
    api: ConversationApi,
}

impl SessionHandle {
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Reset the retry budget and terminal failures, then connect.
    pub fn reconnect(&self) {
        self.command(Command::ManualReconnect);
    }

    pub fn join_conversation(&self, conversation_id: impl Into<String>) {
        self.command(Command::Join(conversation_id.into()));
    }

    /// Send a text message to the joined conversation. Whitespace-only
    /// content is discarded by the session.
    pub fn send(&self, content: impl Into<String>) {
        self.send_with_kind(content, MessageKind::Text);
    }

    pub fn send_with_kind(&self, content: impl Into<String>, kind: MessageKind) {
        self.command(Command::Send {
            content: content.into(),
            kind,
        });
    }

    pub fn start_typing(&self) {
        self.command(Command::StartTyping);
    }

    pub fn stop_typing(&self) {
        self.command(Command::StopTyping);
    }

    /// Announce a scheduled interview. Targets the joined conversation when
    /// `conversation_id` is `None`.
    pub fn send_interview(
        &self,
        data: serde_json::Value,
        conversation_id: Option<String>,
        proposal_id: Option<String>,
    ) {
        self.command(Command::SendInterview {
            data,
            conversation_id,
            proposal_id,
        });
    }

    /// Replace the session identity. Re-sends the auth handshake if a
    /// transport is currently open.
    pub fn update_identity(&self, identity: Identity) {
        self.command(Command::UpdateIdentity(identity));
    }

    /// Stop the actor. Closes the transport cleanly first.
    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch channel mirroring every status change, for callers that only
    /// care about connection state.
    pub fn status_stream(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// `POST /conversations` against the configured REST base. Returns the
    /// conversation id, or `None` on any failure.
    pub async fn create_conversation(
        &self,
        other_user_email: &str,
        project_name: Option<&str>,
        job_id: Option<&str>,
    ) -> Option<String> {
        self.api
            .create_conversation(other_user_email, project_name, job_id)
            .await
    }

    fn command(&self, cmd: Command) {
        if let Err(e) = self.cmd_tx.try_send(cmd) {
            warn!("[SESSION] command dropped: {}", e);
        }
    }
}
