//! Session actor: owns the transport, the retry policy, and the timers.
//!
//! One task per session. Commands arrive over an mpsc channel from
//! `SessionHandle`; inbound frames, the reconnect timer, and the typing
//! debounce are multiplexed in a single select loop, so all state mutation
//! is sequenced — no locks. Inbound frames funnel through the pure reducer
//! in `dispatch`; this file only does I/O.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{ProtocolError, SessionError};
use crate::events::SessionEvent;
use crate::models::{ConnectionState, ConnectionStatus, Identity, MessageKind};
use crate::retry::{CloseDisposition, RetryPlan};

use super::dispatch;
use super::protocol::{AuthenticatePayload, ClientFrame, ServerFrame};
use super::state::SessionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands from `SessionHandle`. All fire-and-forget; outcomes are observed
/// via inbound frames or status changes.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    ManualReconnect,
    Join(String),
    Send {
        content: String,
        kind: MessageKind,
    },
    StartTyping,
    StopTyping,
    SendInterview {
        data: serde_json::Value,
        conversation_id: Option<String>,
        proposal_id: Option<String>,
    },
    UpdateIdentity(Identity),
    Shutdown,
}

pub(crate) struct Session {
    config: SessionConfig,
    state: SessionState,
    transport: Option<WsStream>,
    /// Single outstanding reconnect deadline, exclusively owned here.
    reconnect_at: Option<Instant>,
    /// Next defensive typing-expiry sweep, armed only when configured.
    typing_prune_at: Option<Instant>,
    cmd_rx: mpsc::Receiver<Command>,
    events_tx: broadcast::Sender<SessionEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl Session {
    pub(crate) fn new(
        config: SessionConfig,
        identity: Option<Identity>,
        cmd_rx: mpsc::Receiver<Command>,
        events_tx: broadcast::Sender<SessionEvent>,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        let state = SessionState::new(identity, config.max_retries);
        let typing_prune_at = config
            .remote_typing_ttl
            .map(|ttl| Instant::now() + ttl / 2);
        Self {
            config,
            state,
            transport: None,
            reconnect_at: None,
            typing_prune_at,
            cmd_rx,
            events_tx,
            status_tx,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let typing_deadline = self.state.debounce.deadline();
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            self.disconnect().await;
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                incoming = recv_frame(&mut self.transport) => {
                    self.handle_incoming(incoming).await;
                }
                _ = sleep_or_pending(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.open_transport().await;
                }
                _ = sleep_or_pending(typing_deadline) => {
                    // Debounce fired with no intervening start_typing.
                    if self.state.debounce.fire() {
                        self.stop_typing().await;
                    }
                }
                _ = sleep_or_pending(self.typing_prune_at) => {
                    self.prune_remote_typing();
                }
            }
        }
        debug!("[SESSION] actor stopped");
    }

    // =========================================================================
    // Commands (gateway surface)
    // =========================================================================

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.connect().await,
            Command::Disconnect => self.disconnect().await,
            Command::ManualReconnect => {
                self.state.retry.on_manual_reconnect();
                self.state.detail = None;
                self.emit_status();
                self.connect().await;
            }
            Command::Join(conversation_id) => self.join(conversation_id).await,
            Command::Send { content, kind } => self.send_message(&content, kind).await,
            Command::StartTyping => self.start_typing().await,
            Command::StopTyping => self.stop_typing().await,
            Command::SendInterview {
                data,
                conversation_id,
                proposal_id,
            } => self.send_interview(data, conversation_id, proposal_id).await,
            Command::UpdateIdentity(identity) => self.update_identity(identity).await,
            // Intercepted by the run loop before dispatch.
            Command::Shutdown => {}
        }
    }

    async fn connect(&mut self) {
        if matches!(
            self.state.connection,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!("[CONN] connect ignored: already {:?}", self.state.connection);
            return;
        }
        if !self.state.retry.may_connect() {
            warn!(
                "[CONN] connect refused: {}",
                self.state.detail.as_deref().unwrap_or("terminal state")
            );
            self.emit_status();
            return;
        }
        self.open_transport().await;
    }

    async fn disconnect(&mut self) {
        self.state.retry.on_manual_disconnect();
        self.reconnect_at = None;
        // Take the transport out of the select loop before closing so the
        // trailing close event cannot re-enter the retry logic.
        if let Some(mut stream) = self.transport.take() {
            let close = CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            };
            if let Err(e) = stream.close(Some(close)).await {
                debug!("[CONN] close handshake failed: {}", e);
            }
        }
        self.state.on_transport_closed();
        self.state.detail = None;
        info!("[CONN] disconnected");
        self.emit_status();
    }

    async fn join(&mut self, conversation_id: String) {
        if self.transport.is_none() {
            warn!("[CONV] join {} dropped: transport not open", conversation_id);
            return;
        }
        self.write_frame(ClientFrame::JoinConversation { conversation_id })
            .await;
    }

    async fn send_message(&mut self, content: &str, kind: MessageKind) {
        let content = content.trim();
        if content.is_empty() {
            debug!("[SEND] empty message ignored");
            return;
        }
        let Some(conversation_id) = self.sendable_conversation() else {
            warn!("[SEND] message dropped: not connected to a conversation");
            return;
        };
        let sent = self
            .write_frame(ClientFrame::SendMessage {
                conversation_id,
                content: content.to_string(),
                kind,
            })
            .await;
        // No optimistic insert — the message enters the feed on server echo.
        if sent {
            self.stop_typing().await;
        }
    }

    async fn start_typing(&mut self) {
        let Some(conversation_id) = self.sendable_conversation() else {
            debug!("[TYPING] start ignored: not connected to a conversation");
            return;
        };
        if self.write_frame(ClientFrame::Typing { conversation_id }).await {
            self.state.debounce.arm(self.config.typing_debounce);
        }
    }

    async fn stop_typing(&mut self) {
        self.state.debounce.disarm();
        if let Some(conversation_id) = self.sendable_conversation() {
            self.write_frame(ClientFrame::StopTyping { conversation_id })
                .await;
        }
    }

    async fn send_interview(
        &mut self,
        data: serde_json::Value,
        conversation_id: Option<String>,
        proposal_id: Option<String>,
    ) {
        let Some(joined) = self.sendable_conversation() else {
            warn!("[SEND] interview dropped: not connected to a conversation");
            return;
        };
        self.write_frame(ClientFrame::InterviewScheduled {
            conversation_id: conversation_id.unwrap_or(joined),
            interview_data: data,
            proposal_id,
        })
        .await;
    }

    /// Identity became available or changed. Re-send the handshake on the
    /// live transport instead of waiting for anything external.
    async fn update_identity(&mut self, identity: Identity) {
        self.state.identity = Some(identity.clone());
        if self.transport.is_some() {
            self.send_handshake(&identity).await;
        }
    }

    /// Joined conversation id, when the session is usable for sends.
    fn sendable_conversation(&self) -> Option<String> {
        if self.transport.is_none() || !self.state.can_send() {
            return None;
        }
        self.state.feed.conversation_id().map(str::to_string)
    }

    // =========================================================================
    // Transport lifecycle
    // =========================================================================

    async fn open_transport(&mut self) {
        self.reconnect_at = None;
        if let Some(mut old) = self.transport.take() {
            let _ = old.close(None).await;
        }
        self.state.on_transport_open();
        self.emit_status();

        info!("[CONN] connecting to {}", self.config.server_url);
        match connect_async(&self.config.server_url).await {
            Ok((stream, _)) => {
                self.transport = Some(stream);
                // Identity already known: handshake immediately. Otherwise it
                // is deferred until `connection_established` (see dispatch).
                if let Some(identity) = self.state.identity.clone() {
                    self.send_handshake(&identity).await;
                }
            }
            Err(e) => {
                warn!("[CONN] connect failed: {}", e);
                self.state.detail =
                    Some(SessionError::Transport(e.to_string()).to_string());
                self.handle_close(None).await;
            }
        }
    }

    async fn send_handshake(&mut self, identity: &Identity) {
        debug!("[AUTH] sending handshake for {}", identity.user_id);
        if self
            .write_frame(ClientFrame::Authenticate(AuthenticatePayload::from(identity)))
            .await
        {
            self.state.handshake_sent = true;
        }
    }

    async fn handle_incoming(
        &mut self,
        incoming: Option<Result<WsMessage, tungstenite::Error>>,
    ) {
        match incoming {
            Some(Ok(WsMessage::Text(text))) => self.on_text(&text).await,
            Some(Ok(WsMessage::Close(frame))) => {
                let code = frame.map(|f| u16::from(f.code));
                debug!("[CONN] close frame received (code {:?})", code);
                self.handle_close(code).await;
            }
            Some(Ok(_)) => {} // ping/pong/binary
            Some(Err(e)) => {
                // Surface only; the stream ending decides reconnection.
                warn!("[CONN] transport error: {}", e);
                self.state.detail =
                    Some(SessionError::Transport(e.to_string()).to_string());
                self.emit_status();
            }
            None => self.handle_close(None).await,
        }
    }

    async fn on_text(&mut self, text: &str) {
        match ServerFrame::decode(text) {
            Ok(frame) => {
                let out = dispatch::apply_frame(&mut self.state, frame);
                for frame in out.outbound {
                    self.write_frame(frame).await;
                }
                for event in out.events {
                    self.emit(event);
                }
            }
            Err(ProtocolError::UnrecognizedType(frame_type)) => {
                debug!("[WS] ignoring unrecognized frame type `{}`", frame_type);
            }
            Err(e) => {
                // Frame dropped; session unaffected.
                warn!("[WS] {}", e);
            }
        }
    }

    /// Transport is gone. Clear ephemeral state and decide the follow-up.
    async fn handle_close(&mut self, close_code: Option<u16>) {
        self.transport = None;
        let manual = self.state.retry.manual_disconnect;
        self.state.on_transport_closed();

        match self
            .state
            .retry
            .on_close(CloseDisposition::classify(manual, close_code))
        {
            RetryPlan::Retry { attempt, max, delay } => {
                let detail = format!("retrying in {}s ({}/{})", delay.as_secs(), attempt, max);
                info!("[CONN] {}", detail);
                self.state.detail = Some(detail);
                self.reconnect_at = Some(Instant::now() + delay);
            }
            RetryPlan::Stop => {
                debug!("[CONN] closed, not retrying");
            }
            RetryPlan::AuthFailed(code) => {
                // An inbound error frame usually carried the real message
                // just before this close; keep it when present.
                let already_reported = self
                    .state
                    .detail
                    .as_deref()
                    .is_some_and(|d| d.starts_with("authentication failed"));
                if !already_reported {
                    self.state.detail = Some(
                        SessionError::Auth {
                            code,
                            message: "authorization rejected".to_string(),
                        }
                        .to_string(),
                    );
                }
                warn!("[CONN] auth failure (code {}), reconnect disabled", code);
            }
            RetryPlan::Exhausted { attempts } => {
                let detail = SessionError::RetriesExhausted { attempts }.to_string();
                warn!("[CONN] {}", detail);
                self.state.detail = Some(detail);
            }
        }
        self.emit_status();
    }

    // =========================================================================
    // Output
    // =========================================================================

    async fn write_frame(&mut self, frame: ClientFrame) -> bool {
        let Some(stream) = self.transport.as_mut() else {
            warn!("[WS] frame dropped: transport not open");
            return false;
        };
        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                error!("[WS] failed to encode frame: {}", e);
                return false;
            }
        };
        match stream.send(WsMessage::Text(text.into())).await {
            Ok(()) => true,
            Err(e) => {
                warn!("[WS] send failed: {}", e);
                false
            }
        }
    }

    fn prune_remote_typing(&mut self) {
        if let Some(ttl) = self.config.remote_typing_ttl {
            if let Ok(ttl_chrono) = chrono::Duration::from_std(ttl) {
                for indicator in self.state.typing.prune_older_than(ttl_chrono) {
                    debug!("[TYPING] expired stale indicator for {}", indicator.user_id);
                    self.emit(SessionEvent::TypingStopped(indicator));
                }
            }
            self.typing_prune_at = Some(Instant::now() + ttl / 2);
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let SessionEvent::Status(status) = &event {
            let status = status.clone();
            self.status_tx.send_if_modified(|current| {
                if *current != status {
                    *current = status;
                    true
                } else {
                    false
                }
            });
        }
        let _ = self.events_tx.send(event);
    }

    fn emit_status(&self) {
        self.emit(SessionEvent::Status(self.state.status()));
    }
}

/// Read the next transport message, or pend forever while disconnected so
/// the select loop only wakes for commands and timers.
async fn recv_frame(
    transport: &mut Option<WsStream>,
) -> Option<Result<WsMessage, tungstenite::Error>> {
    match transport {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
