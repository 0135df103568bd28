//! Reconnection policy: close classification, exponential backoff, and the
//! retry budget. Pure state — the session actor owns the actual timer.

use std::time::Duration;

use crate::error::is_auth_code;

/// Normal-closure codes sent on intentional shutdown (1000) or endpoint
/// going away (1001). Neither triggers a retry.
const MANUAL_CLOSE_CODES: [u16; 2] = [1000, 1001];

/// Base backoff delay for the first retry.
const BACKOFF_BASE_MS: u64 = 1000;
/// Backoff ceiling.
const BACKOFF_CAP_MS: u64 = 10_000;

/// Delay before retry number `attempt` (1-based): `min(1000 * 2^(n-1), 10000)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
    Duration::from_millis((BACKOFF_BASE_MS * factor).min(BACKOFF_CAP_MS))
}

/// Why the transport closed, as far as retry policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Explicit `disconnect()` or a normal-closure close code.
    Manual,
    /// Close code in the reserved auth range `[4000, 5000)`.
    AuthError(u16),
    /// Anything else — network failure, server restart, unclean shutdown.
    Transient,
}

impl CloseDisposition {
    /// Classify a close event from the manual-disconnect flag and the close
    /// code, if the peer sent one.
    pub fn classify(manual_disconnect: bool, close_code: Option<u16>) -> Self {
        if manual_disconnect {
            return CloseDisposition::Manual;
        }
        match close_code {
            Some(code) if MANUAL_CLOSE_CODES.contains(&code) => CloseDisposition::Manual,
            Some(code) if is_auth_code(code) => CloseDisposition::AuthError(code),
            _ => CloseDisposition::Transient,
        }
    }
}

/// What the controller should do after a close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPlan {
    /// Reconnect after `delay`; this is retry number `attempt` of `max`.
    Retry {
        attempt: u32,
        max: u32,
        delay: Duration,
    },
    /// Manual close — stay down quietly.
    Stop,
    /// Auth failure — stay down, auto-reconnect disabled until manual reconnect.
    AuthFailed(u16),
    /// Retry budget spent — terminal until manual reconnect.
    Exhausted { attempts: u32 },
}

/// Retry counter and the flags that gate auto-reconnection.
#[derive(Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub max_retries: u32,
    pub auto_reconnect: bool,
    pub manual_disconnect: bool,
    /// Set on exhaustion or auth failure; only a manual reconnect clears it.
    terminal: bool,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries,
            auto_reconnect: true,
            manual_disconnect: false,
            terminal: false,
        }
    }

    /// Whether a fresh `connect()` may proceed. Refused in the terminal
    /// exhausted-retries / auth-error states.
    pub fn may_connect(&self) -> bool {
        !self.terminal
    }

    /// Decide the follow-up to a transport close and update the counter/flags.
    pub fn on_close(&mut self, disposition: CloseDisposition) -> RetryPlan {
        match disposition {
            CloseDisposition::Manual => RetryPlan::Stop,
            CloseDisposition::AuthError(code) => {
                self.auto_reconnect = false;
                self.terminal = true;
                RetryPlan::AuthFailed(code)
            }
            CloseDisposition::Transient => {
                if !self.auto_reconnect {
                    return RetryPlan::Stop;
                }
                if self.attempt >= self.max_retries {
                    self.auto_reconnect = false;
                    self.terminal = true;
                    RetryPlan::Exhausted {
                        attempts: self.attempt,
                    }
                } else {
                    self.attempt += 1;
                    RetryPlan::Retry {
                        attempt: self.attempt,
                        max: self.max_retries,
                        delay: backoff_delay(self.attempt),
                    }
                }
            }
        }
    }

    /// Successful authentication: the only non-manual counter reset.
    pub fn on_authenticated(&mut self) {
        self.attempt = 0;
    }

    /// Manual reconnect: reset the counter, re-enable auto-reconnect, clear
    /// the manual flag. The only escape from a terminal state.
    pub fn on_manual_reconnect(&mut self) {
        self.attempt = 0;
        self.auto_reconnect = true;
        self.manual_disconnect = false;
        self.terminal = false;
    }

    /// Manual disconnect: disable auto-reconnect, remember the intent so the
    /// trailing close event is classified as manual, reset the counter for a
    /// future manual reconnect.
    pub fn on_manual_disconnect(&mut self) {
        self.manual_disconnect = true;
        self.auto_reconnect = false;
        self.attempt = 0;
    }
}
