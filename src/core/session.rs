//! # Session Persistence
//!
//! "Continue where you left off" hints, saved per username in [`Storage`].
//!
//! Three records live here:
//!
//! - the saved chat session (`chatbot_session_<user>`), which expires after
//!   [`SESSION_FRESHNESS_HOURS`];
//! - chat preferences (`chatbot_preferences_<user>`), which never expire;
//! - the bearer token (`token`), shared by both API backends.
//!
//! Everything is best effort. A failed write is logged and dropped; a missing,
//! corrupt, or stale record reads back as `None`. Nothing in this module
//! returns an error to its caller, and no conversation content is stored here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::AgentRole;
use crate::core::storage::Storage;

/// Saved sessions older than this are ignored on load.
pub const SESSION_FRESHNESS_HOURS: i64 = 24;

/// Fixed storage key for the bearer token.
pub const TOKEN_KEY: &str = "token";

/// What the chat was doing when it was last saved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub conversation_id: Option<String>,
    pub message_count: usize,
    pub last_activity: DateTime<Utc>,
    pub agent_role: AgentRole,
}

/// A [`SessionState`] plus the moment it was written.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    #[serde(flatten)]
    pub state: SessionState,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreferences {
    #[serde(default)]
    pub default_role: AgentRole,
}

fn session_key(user_id: &str) -> String {
    format!("chatbot_session_{user_id}")
}

fn preferences_key(user_id: &str) -> String {
    format!("chatbot_preferences_{user_id}")
}

/// Per-user session and preference records over a [`Storage`] backend.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Save `state` for `user_id`, stamped with the current time.
    pub fn save(&self, user_id: &str, state: &SessionState) {
        self.save_at(user_id, state, Utc::now());
    }

    pub fn save_at(&self, user_id: &str, state: &SessionState, now: DateTime<Utc>) {
        let record = SavedSession {
            state: state.clone(),
            saved_at: now,
        };
        self.write_json(&session_key(user_id), &record);
    }

    /// Load the saved session for `user_id`, if one exists and is fresh.
    pub fn load(&self, user_id: &str) -> Option<SavedSession> {
        self.load_at(user_id, Utc::now())
    }

    pub fn load_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<SavedSession> {
        let key = session_key(user_id);
        let record: SavedSession = self.read_json(&key)?;
        if now - record.saved_at > Duration::hours(SESSION_FRESHNESS_HOURS) {
            debug!("Saved session for {} is stale (saved {})", user_id, record.saved_at);
            self.remove(&key);
            return None;
        }
        Some(record)
    }

    pub fn clear(&self, user_id: &str) {
        self.remove(&session_key(user_id));
    }

    pub fn save_preferences(&self, user_id: &str, prefs: &ChatPreferences) {
        self.write_json(&preferences_key(user_id), prefs);
    }

    /// `None` when the user has never saved preferences (or they are unreadable).
    pub fn load_preferences(&self, user_id: &str) -> Option<ChatPreferences> {
        self.read_json(&preferences_key(user_id))
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.storage.set_item(key, &json) {
            warn!("Failed to save {}: {}", key, e);
        }
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", key, e);
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            warn!("Failed to clear {}: {}", key, e);
        }
    }
}

/// The bearer token, read fresh from storage on every request.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn get(&self) -> Option<String> {
        match self.storage.get_item(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Failed to read token: {}", e);
                None
            }
        }
    }

    pub fn set(&self, token: &str) {
        if let Err(e) = self.storage.set_item(TOKEN_KEY, token) {
            warn!("Failed to store token: {}", e);
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(TOKEN_KEY) {
            warn!("Failed to clear token: {}", e);
        }
    }
}
