//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::AgentRole;
use crate::api::{ApiError, ChatBackend};
use crate::core::conversation::{ChatReply, Conversation, ConversationSummary, Message};

/// A scripted chatbot backend. Replies are served in push order; sends can
/// be held at a gate until the test calls [`StubBackend::release`].
#[derive(Default)]
pub struct StubBackend {
    replies: Mutex<VecDeque<Result<ChatReply, ApiError>>>,
    sent: Mutex<Vec<(String, Option<String>, AgentRole)>>,
    conversations: Mutex<HashMap<String, Conversation>>,
    delays: Mutex<HashMap<String, Duration>>,
    history: Mutex<Vec<ConversationSummary>>,
    history_calls: Mutex<usize>,
    deleted: Mutex<Vec<String>>,
    delete_error: Mutex<Option<ApiError>>,
    gate: Option<Semaphore>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends block until [`release`](Self::release) is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn push_reply(&self, reply: Result<(&str, &str), ApiError>) {
        let reply = reply.map(|(id, text)| ChatReply {
            conversation_id: id.to_string(),
            reply: text.to_string(),
        });
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn add_conversation(&self, conversation: Conversation) {
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.summary.id.clone(), conversation);
    }

    pub fn delay_conversation(&self, id: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(id.to_string(), delay);
    }

    pub fn set_history(&self, history: Vec<ConversationSummary>) {
        *self.history.lock().unwrap() = history;
    }

    pub fn fail_deletes(&self, error: ApiError) {
        *self.delete_error.lock().unwrap() = Some(error);
    }

    /// Every `(text, conversation_id, role)` that reached the backend.
    pub fn sent(&self) -> Vec<(String, Option<String>, AgentRole)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn history_calls(&self) -> usize {
        *self.history_calls.lock().unwrap()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
        role: AgentRole,
    ) -> Result<ChatReply, ApiError> {
        self.sent.lock().unwrap().push((
            text.to_string(),
            conversation_id.map(str::to_string),
            role,
        ));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Http { status: 500, message: "no reply queued".into() }))
    }

    async fn list_conversations(&self, limit: Option<usize>) -> Result<Vec<ConversationSummary>, ApiError> {
        *self.history_calls.lock().unwrap() += 1;
        let mut history = self.history.lock().unwrap().clone();
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        Ok(history)
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, ApiError> {
        let delay = self.delays.lock().unwrap().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.conversations
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Http { status: 404, message: "Not Found".into() })
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        if let Some(err) = self.delete_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

pub fn summary(id: &str) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        role: AgentRole::Clerk,
        title: format!("Conversation {id}"),
        last_message: String::new(),
        message_count: 0,
        last_activity: None,
    }
}

/// A conversation whose messages alternate user/assistant, starting with user.
pub fn conversation(id: &str, role: AgentRole, texts: &[&str]) -> Conversation {
    let messages = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            if i % 2 == 0 {
                Message::user(*text)
            } else {
                Message::assistant(*text)
            }
        })
        .collect::<Vec<_>>();
    Conversation {
        summary: ConversationSummary {
            role,
            message_count: messages.len(),
            ..summary(id)
        },
        owner: Some("ann".to_string()),
        messages,
    }
}
