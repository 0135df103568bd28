//! Per-conversation message feed.
//!
//! Merges inbound message/update events into one ordered, deduplicated local
//! feed. The feed and the joined-conversation id are always replaced together;
//! entries are never deleted.

use tracing::debug;

use crate::models::Message;

/// What an upsert did to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedChange {
    /// New id — entry inserted at its timestamp position.
    Inserted,
    /// Known id — entry replaced in place, position preserved.
    Updated,
}

#[derive(Debug, Default)]
pub struct MessageFeed {
    conversation_id: Option<String>,
    messages: Vec<Message>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently joined conversation, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Feed entries, ascending by timestamp.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the feed wholesale with a history page, sorted ascending by
    /// timestamp, and switch the joined-conversation id. Always supersedes
    /// the previous feed, even for a different conversation.
    pub fn load_bulk(&mut self, conversation_id: String, mut messages: Vec<Message>) {
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        debug!(
            "[FEED] loaded {} messages for conversation {}",
            messages.len(),
            conversation_id
        );
        self.conversation_id = Some(conversation_id);
        self.messages = messages;
    }

    /// Upsert one message event.
    ///
    /// A known id is replaced in place (content/timestamp update) without
    /// re-checking ordering. A new id is appended when not older than the
    /// current last entry; otherwise it lands before the first entry with a
    /// strictly greater timestamp, which puts timestamp ties ahead of the
    /// first strictly-greater entry.
    pub fn apply_event(&mut self, message: Message) -> FeedChange {
        if let Some(pos) = self.messages.iter().position(|m| m.id == message.id) {
            self.messages[pos] = message;
            return FeedChange::Updated;
        }

        let newest_or_tied = self
            .messages
            .last()
            .is_none_or(|last| message.timestamp >= last.timestamp);
        if newest_or_tied {
            self.messages.push(message);
        } else {
            let idx = self
                .messages
                .iter()
                .position(|m| m.timestamp > message.timestamp)
                .unwrap_or(self.messages.len());
            self.messages.insert(idx, message);
        }
        FeedChange::Inserted
    }
}
