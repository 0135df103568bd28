//! Session error taxonomy.
//!
//! Connection-level failures are surfaced to callers as a single
//! human-readable status line (see `ConnectionStatus`); the variants here are
//! the structured source those lines are formatted from. REST collaborator
//! failures never reach callers as errors — they come back as `None` results.

/// Close/error codes in `[4000, 5000)` are non-retryable authentication or
/// authorization failures. Everything else is treated as transient.
pub const AUTH_CODE_RANGE: std::ops::Range<u16> = 4000..5000;

/// Whether a server error or close code denotes an auth failure.
pub fn is_auth_code(code: u16) -> bool {
    AUTH_CODE_RANGE.contains(&code)
}

/// A frame that could not be turned into a typed `ServerFrame`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// The outer `{type, payload}` envelope or the payload body did not parse.
    /// The frame is dropped; the session is otherwise unaffected.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Valid envelope, but a frame type this client does not know.
    /// Logged and ignored rather than silently falling through.
    #[error("unrecognized frame type `{0}`")]
    UnrecognizedType(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Close/error from the underlying connection; drives the retry policy.
    #[error("connection error: {0}")]
    Transport(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Server rejected the handshake or revoked the session. Terminal until
    /// a manual reconnect.
    #[error("authentication failed ({code}): {message}")]
    Auth { code: u16, message: String },

    /// All retry budget spent without a successful authentication.
    #[error("connection failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Failure outside the realtime channel (e.g. REST collaborator).
    #[error(transparent)]
    Application(#[from] anyhow::Error),
}
