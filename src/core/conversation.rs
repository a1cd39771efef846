//! # Conversations
//!
//! Client-side copies of chatbot conversations. The backend owns them; these
//! are re-fetchable snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AgentRole;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message. Never edited after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A message created on this client, with a fresh local id.
    pub fn local(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::local(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::local(MessageRole::Assistant, content)
    }
}

/// One row of the conversation list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub role: AgentRole,
    pub title: String,
    pub last_message: String,
    pub message_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

/// A conversation with its full message history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Conversation {
    pub summary: ConversationSummary,
    pub owner: Option<String>,
    pub messages: Vec<Message>,
}

/// What the backend answered to a sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub conversation_id: String,
    pub reply: String,
}
