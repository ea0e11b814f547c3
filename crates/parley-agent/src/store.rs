//! In-memory conversation history for the agent webhook.

use crate::config::SessionConfig;
use parley_types::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// One message in a conversation's model-facing history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
        }
    }

    /// A user message keyed by the platform's turn id.
    pub fn user(turn_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(turn_id, Role::User, content)
    }

    /// An assistant message with a fresh random id.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), Role::Assistant, content)
    }
}

#[derive(Debug)]
struct Conversation {
    messages: Vec<ChatMessage>,
    last_seen: Instant,
}

/// Bounded, process-local store of conversation histories.
///
/// Conversations idle for longer than the TTL are dropped, lazily on access
/// and in bulk by [`ConversationStore::prune_expired`]. When the store is
/// full, starting a new conversation evicts the least recently used one.
/// Each history keeps at most `max_messages`, dropping the oldest first.
/// Nothing is persisted: a restart forgets every conversation.
///
/// Uses `std::sync::Mutex`: every critical section is a short map operation
/// that never spans an `.await`.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    inner: Arc<Mutex<HashMap<String, Conversation>>>,
    ttl: Duration,
    max_conversations: usize,
    max_messages: usize,
}

impl ConversationStore {
    pub fn new(ttl: Duration, max_conversations: usize, max_messages: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_conversations: max_conversations.max(1),
            max_messages: max_messages.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            Duration::from_secs(config.ttl_seconds),
            config.max_conversations,
            config.max_messages,
        )
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Conversation>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("conversation store lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Appends `message` to a conversation, creating it if needed.
    pub fn push(&self, conversation_id: &str, message: ChatMessage) {
        let now = Instant::now();
        let mut map = self.lock();
        self.expire_one(&mut map, conversation_id, now);

        if !map.contains_key(conversation_id) && map.len() >= self.max_conversations {
            if let Some(oldest) = map
                .iter()
                .min_by_key(|(_, c)| c.last_seen)
                .map(|(id, _)| id.clone())
            {
                tracing::debug!(conversation_id = %oldest, "evicting least recently used conversation");
                map.remove(&oldest);
            }
        }

        let conversation = map
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation {
                messages: Vec::new(),
                last_seen: now,
            });
        conversation.messages.push(message);
        conversation.last_seen = now;

        let excess = conversation.messages.len().saturating_sub(self.max_messages);
        if excess > 0 {
            conversation.messages.drain(..excess);
        }
    }

    /// Returns a copy of a conversation's history, refreshing its TTL.
    ///
    /// Unknown or expired conversations yield an empty history.
    pub fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        let now = Instant::now();
        let mut map = self.lock();
        self.expire_one(&mut map, conversation_id, now);
        match map.get_mut(conversation_id) {
            Some(conversation) => {
                conversation.last_seen = now;
                conversation.messages.clone()
            }
            None => Vec::new(),
        }
    }

    /// Forgets a conversation. Returns `true` if it existed.
    pub fn close(&self, conversation_id: &str) -> bool {
        self.lock().remove(conversation_id).is_some()
    }

    /// Drops every conversation idle for longer than the TTL.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    /// Drops every conversation idle for longer than the TTL as of `now`.
    pub fn prune_expired_at(&self, now: Instant) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, c| !self.is_expired(c, now));
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, conversation: &Conversation, now: Instant) -> bool {
        now.saturating_duration_since(conversation.last_seen) > self.ttl
    }

    fn expire_one(
        &self,
        map: &mut HashMap<String, Conversation>,
        conversation_id: &str,
        now: Instant,
    ) {
        if map
            .get(conversation_id)
            .is_some_and(|c| self.is_expired(c, now))
        {
            tracing::debug!(conversation_id, "conversation expired");
            map.remove(conversation_id);
        }
    }
}
