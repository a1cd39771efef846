//! # Chat State
//!
//! Everything one chat session knows. No I/O types here; the controller
//! owns the backend and the tasks.
//!
//! ```text
//! App
//! ├── username: String                 // owner; keys the session store
//! ├── agent_role: AgentRole            // persona sent with each message
//! ├── messages: Vec<Message>           // active conversation, oldest first
//! ├── conversation_id: Option<String>  // None until the backend assigns one
//! ├── conversations: Vec<Summary>      // quick history, newest first
//! ├── is_chat_open: bool               // widget visibility
//! ├── is_loading: bool                 // send or load in flight
//! ├── history_loading: bool            // quick history in flight
//! ├── error: Option<String>            // banner text
//! ├── pending_send: Option<PendingSend>// optimistic message awaiting reply
//! ├── latest_load / latest_history     // newest request seq per slot
//! └── next_seq: u64                    // request sequence counter
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use chrono::Utc;

use crate::AgentRole;
use crate::core::conversation::{ConversationSummary, Message};
use crate::core::session::SessionState;

/// How many conversations the quick-history panel shows.
pub const DEFAULT_QUICK_HISTORY_LIMIT: usize = 5;

/// An optimistic user message whose send has not resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub seq: u64,
    pub message_id: String,
}

pub struct App {
    pub username: String,
    pub agent_role: AgentRole,
    pub messages: Vec<Message>,
    pub conversation_id: Option<String>,
    pub conversations: Vec<ConversationSummary>,
    pub is_chat_open: bool,
    pub is_loading: bool,
    pub history_loading: bool,
    pub error: Option<String>,
    pub pending_send: Option<PendingSend>,
    /// Seq of the newest conversation load; older responses are dropped.
    pub latest_load: Option<u64>,
    /// Seq of the newest quick-history fetch.
    pub latest_history: Option<u64>,
    pub quick_history_limit: usize,
    next_seq: u64,
}

impl App {
    pub fn new(username: impl Into<String>, agent_role: AgentRole) -> Self {
        Self {
            username: username.into(),
            agent_role,
            messages: Vec::new(),
            conversation_id: None,
            conversations: Vec::new(),
            is_chat_open: false,
            is_loading: false,
            history_loading: false,
            error: None,
            pending_send: None,
            latest_load: None,
            latest_history: None,
            quick_history_limit: DEFAULT_QUICK_HISTORY_LIMIT,
            next_seq: 0,
        }
    }

    /// Allocates the next request sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// True when nothing is in flight that a new send would race with.
    pub fn can_send(&self) -> bool {
        !self.is_loading
    }

    /// The resumption hint written to the session store.
    pub fn session_state(&self) -> SessionState {
        SessionState {
            conversation_id: self.conversation_id.clone(),
            message_count: self.messages.len(),
            last_activity: self
                .messages
                .last()
                .map(|m| m.created_at)
                .unwrap_or_else(Utc::now),
            agent_role: self.agent_role,
        }
    }
}
