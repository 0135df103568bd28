//! Typing-state coordination.
//!
//! Remote side: a set of peers currently marked as typing, fed by
//! `user_typing` / `user_stop_typing` frames. The server owns expiry; a
//! dropped `stop_typing` would otherwise pin a peer as typing forever, so an
//! optional client-side TTL can be enabled in config (off by default).
//!
//! Local side: a 3-second debounce deadline. `start_typing` (re)arms it;
//! if it fires with no intervening start, the session emits one
//! `stop_typing` on the caller's behalf.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

use crate::models::TypingIndicator;

/// Remote peers currently marked as typing.
#[derive(Debug, Default)]
pub struct TypingTracker {
    // Value is when the indicator was first seen; re-delivery does not
    // refresh it.
    peers: HashMap<TypingIndicator, DateTime<Utc>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a peer as typing. Idempotent: returns false (and keeps the
    /// original timestamp) when the peer is already marked.
    pub fn remote_start(&mut self, indicator: TypingIndicator) -> bool {
        match self.peers.entry(indicator) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                true
            }
        }
    }

    /// Unmark a peer. Returns whether it was marked.
    pub fn remote_stop(&mut self, indicator: &TypingIndicator) -> bool {
        self.peers.remove(indicator).is_some()
    }

    /// Remove every indicator for a user (they left the conversation).
    /// Returns the removed indicators.
    pub fn remove_user(&mut self, user_id: &str) -> Vec<TypingIndicator> {
        let removed: Vec<TypingIndicator> = self
            .peers
            .keys()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        for key in &removed {
            self.peers.remove(key);
        }
        removed
    }

    /// Drop indicators older than `ttl`. Only called when the defensive
    /// client-side expiry is configured. Returns the expired indicators.
    pub fn prune_older_than(&mut self, ttl: Duration) -> Vec<TypingIndicator> {
        let cutoff = Utc::now() - ttl;
        let expired: Vec<TypingIndicator> = self
            .peers
            .iter()
            .filter(|(_, seen)| **seen < cutoff)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.peers.remove(key);
        }
        expired
    }

    /// Per-connection ephemeral state: cleared on every transport close.
    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn is_typing(&self, user_id: &str, conversation_id: &str) -> bool {
        self.peers.contains_key(&TypingIndicator {
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Local outgoing-typing debounce deadline.
#[derive(Debug, Default)]
pub struct TypingDebounce {
    deadline: Option<Instant>,
}

impl TypingDebounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)arm the deadline `window` from now.
    pub fn arm(&mut self, window: std::time::Duration) {
        self.deadline = Some(Instant::now() + window);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline when it fires. Returns true exactly once per arm,
    /// so a fire emits a single automatic `stop_typing`.
    pub fn fire(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator(user: &str, conversation: &str) -> TypingIndicator {
        TypingIndicator {
            user_id: user.to_string(),
            conversation_id: conversation.to_string(),
        }
    }

    #[test]
    fn remote_start_is_idempotent_without_refresh() {
        let mut typing = TypingTracker::new();
        assert!(typing.remote_start(indicator("bob@example.com", "c-1")));
        let first_seen = *typing.peers.values().next().unwrap();

        assert!(!typing.remote_start(indicator("bob@example.com", "c-1")));
        assert_eq!(*typing.peers.values().next().unwrap(), first_seen);
        assert_eq!(typing.len(), 1);
    }

    #[test]
    fn remote_stop_removes() {
        let mut typing = TypingTracker::new();
        typing.remote_start(indicator("bob@example.com", "c-1"));
        assert!(typing.remote_stop(&indicator("bob@example.com", "c-1")));
        assert!(!typing.remote_stop(&indicator("bob@example.com", "c-1")));
        assert!(typing.is_empty());
    }

    #[test]
    fn leave_removes_all_indicators_for_user() {
        let mut typing = TypingTracker::new();
        typing.remote_start(indicator("bob@example.com", "c-1"));
        typing.remote_start(indicator("bob@example.com", "c-2"));
        typing.remote_start(indicator("carol@example.com", "c-1"));

        let removed = typing.remove_user("bob@example.com");
        assert_eq!(removed.len(), 2);
        assert!(!typing.is_typing("bob@example.com", "c-1"));
        assert!(typing.is_typing("carol@example.com", "c-1"));
    }

    #[test]
    fn prune_expires_stale_indicators() {
        let mut typing = TypingTracker::new();
        typing.remote_start(indicator("bob@example.com", "c-1"));
        // Backdate the entry past any TTL.
        for seen in typing.peers.values_mut() {
            *seen = Utc::now() - Duration::seconds(60);
        }
        typing.remote_start(indicator("carol@example.com", "c-1"));

        let expired = typing.prune_older_than(Duration::seconds(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].user_id, "bob@example.com");
        assert!(typing.is_typing("carol@example.com", "c-1"));
    }

    #[test]
    fn clear_empties_the_set() {
        let mut typing = TypingTracker::new();
        typing.remote_start(indicator("bob@example.com", "c-1"));
        typing.clear();
        assert!(typing.is_empty());
    }

    #[test]
    fn debounce_fires_exactly_once_per_arm() {
        let mut debounce = TypingDebounce::new();
        assert!(!debounce.fire());

        debounce.arm(std::time::Duration::from_secs(3));
        assert!(debounce.deadline().is_some());
        assert!(debounce.fire());
        assert!(!debounce.fire());
    }

    #[test]
    fn rearm_pushes_deadline_forward() {
        let mut debounce = TypingDebounce::new();
        debounce.arm(std::time::Duration::from_secs(1));
        let first = debounce.deadline().unwrap();
        debounce.arm(std::time::Duration::from_secs(3));
        assert!(debounce.deadline().unwrap() >= first);
    }

    #[test]
    fn disarm_cancels_pending_fire() {
        let mut debounce = TypingDebounce::new();
        debounce.arm(std::time::Duration::from_secs(3));
        debounce.disarm();
        assert!(!debounce.fire());
    }
}
