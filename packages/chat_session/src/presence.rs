//! Online-presence tracking.
//!
//! Keyed by stable user id, not connection id — a user connected from two
//! tabs coalesces into one entry. Snapshots are additive upserts, never a
//! full replace.

use std::collections::HashMap;

use chrono::Utc;

use crate::models::OnlineUser;

#[derive(Debug, Default)]
pub struct PresenceTracker {
    online: HashMap<String, OnlineUser>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert every entry from an `online_users_list` snapshot. Entries not
    /// mentioned by the snapshot are kept.
    pub fn apply_snapshot(&mut self, users: Vec<OnlineUser>) {
        for user in users {
            self.upsert(user);
        }
    }

    /// Upsert a single user, refreshing `last_seen_at`.
    pub fn apply_join(&mut self, user: OnlineUser) {
        self.upsert(user);
    }

    /// Remove a user if present; no-op otherwise. Returns whether an entry
    /// was actually removed.
    pub fn apply_leave(&mut self, user_id: &str) -> bool {
        self.online.remove(user_id).is_some()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.contains_key(user_id)
    }

    pub fn online_users(&self) -> impl Iterator<Item = &OnlineUser> {
        self.online.values()
    }

    pub fn len(&self) -> usize {
        self.online.len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }

    fn upsert(&mut self, mut user: OnlineUser) {
        if user.last_seen_at.is_none() {
            user.last_seen_at = Some(Utc::now());
        }
        self.online.insert(user.user_id.clone(), user);
    }
}
