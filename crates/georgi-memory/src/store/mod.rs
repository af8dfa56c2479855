//! Conversation context store.
//!
//! Maps a conversant to the backend's opaque dialogue state. A record older
//! than the inactivity window is dropped the next time its key is read, so a
//! returning conversant always starts fresh. There is no capacity limit.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use georgi_core::{
    config::ContextKeyPolicy, inference::DialogueState, message::IncomingMessage,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identity whose dialogue state is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversantKey(String);

impl ConversantKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key for a message under the given policy.
    ///
    /// Keys carry the platform and policy so user and channel ids never collide.
    pub fn for_message(policy: ContextKeyPolicy, incoming: &IncomingMessage) -> Self {
        match policy {
            ContextKeyPolicy::User => {
                Self(format!("{}:user:{}", incoming.channel, incoming.sender_id))
            }
            ContextKeyPolicy::Channel => {
                let target = incoming
                    .reply_target
                    .as_deref()
                    .unwrap_or(&incoming.sender_id);
                Self(format!("{}:channel:{target}", incoming.channel))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored dialogue state for one conversant.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRecord {
    pub state: DialogueState,
    pub last_active: DateTime<Utc>,
}

impl ContextRecord {
    /// Whether more than `window` has passed since the last successful turn.
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match now.signed_duration_since(self.last_active).to_std() {
            Ok(idle) => idle > window,
            // last_active in the future (clock skew): treat as fresh.
            Err(_) => false,
        }
    }
}

/// Shared, cloneable context cache guarded by a single reader/writer lock.
///
/// The lock is never held across an await point.
#[derive(Clone)]
pub struct ContextStore {
    records: Arc<RwLock<HashMap<ConversantKey, ContextRecord>>>,
    window: Duration,
}

impl ContextStore {
    /// Create an empty store with the given inactivity window.
    pub fn new(window: Duration) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            window,
        }
    }

    /// The configured inactivity window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Raw record lookup, without a staleness check.
    pub fn get(&self, key: &ConversantKey) -> Option<ContextRecord> {
        self.records.read().get(key).cloned()
    }

    /// Replace the state for `key`, stamped with the current time.
    pub fn put(&self, key: ConversantKey, state: DialogueState) {
        self.put_at(key, state, Utc::now());
    }

    /// Replace the state for `key`, stamped with `at`.
    pub fn put_at(&self, key: ConversantKey, state: DialogueState, at: DateTime<Utc>) {
        debug!("context: stored {} tokens for {key}", state.len());
        self.records.write().insert(
            key,
            ContextRecord {
                state,
                last_active: at,
            },
        );
    }

    /// Delete the record for `key` if it is older than `window`.
    ///
    /// Returns whether a record was evicted. Absent keys are a no-op.
    pub fn evict_if_stale(&self, key: &ConversantKey, now: DateTime<Utc>, window: Duration) -> bool {
        let stale = self
            .records
            .read()
            .get(key)
            .is_some_and(|record| record.is_stale(now, window));
        if !stale {
            return false;
        }

        let mut records = self.records.write();
        // Re-check: a turn may have refreshed the record since the read.
        if !records.get(key).is_some_and(|r| r.is_stale(now, window)) {
            return false;
        }
        records.remove(key);
        debug!("context: evicted {key} (idle longer than {}s)", window.as_secs());
        true
    }

    /// Evict-if-stale, then read, as one step under the store's window.
    ///
    /// Fresh and absent keys only take the shared lock, so concurrent turns
    /// do not queue behind each other. Returns the state to send to the
    /// backend, or `None` to start fresh.
    pub fn load(&self, key: &ConversantKey, now: DateTime<Utc>) -> Option<DialogueState> {
        match self.records.read().get(key) {
            None => return None,
            Some(record) if !record.is_stale(now, self.window) => {
                return Some(record.state.clone());
            }
            Some(_) => {}
        }

        let mut records = self.records.write();
        match records.get(key) {
            Some(record) if record.is_stale(now, self.window) => {
                records.remove(key);
                debug!(
                    "context: evicted {key} (idle longer than {}s)",
                    self.window.as_secs()
                );
                None
            }
            Some(record) => Some(record.state.clone()),
            None => None,
        }
    }

    /// Forget a conversant. Returns whether a record existed.
    pub fn remove(&self, key: &ConversantKey) -> bool {
        self.records.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
