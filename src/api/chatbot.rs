//! # Chatbot backend
//!
//! [`ChatBackend`] is the seam between the chat state container and the
//! network. [`ChatbotApi`] is the HTTP implementation; tests substitute a
//! scripted stub.

use async_trait::async_trait;
use log::{debug, info};

use crate::AgentRole;
use crate::api::client::{ApiClient, path_segment};
use crate::api::error::ApiError;
use crate::api::types::{
    ChatAnalytics, ChatRequest, ChatResponse, ConversationList, SuggestionList, WireConversation,
};
use crate::core::conversation::{ChatReply, Conversation, ConversationSummary};
use crate::core::transform::{conversation_from_wire, id_string, summary_from_wire};

pub const DEFAULT_CHAT_PATH: &str = "/chat";

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `message`, continuing `conversation_id` when given.
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        role: AgentRole,
    ) -> Result<ChatReply, ApiError>;

    /// Most recent conversations first. `limit` of `None` means the backend default.
    async fn list_conversations(&self, limit: Option<usize>) -> Result<Vec<ConversationSummary>, ApiError>;

    async fn get_conversation(&self, id: &str) -> Result<Conversation, ApiError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError>;
}

pub struct ChatbotApi {
    client: ApiClient,
    chat_path: String,
}

impl ChatbotApi {
    pub fn new(client: ApiClient) -> Self {
        Self::with_chat_path(client, DEFAULT_CHAT_PATH)
    }

    pub fn with_chat_path(client: ApiClient, chat_path: impl Into<String>) -> Self {
        Self {
            client,
            chat_path: chat_path.into(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Full-text search over the user's conversations.
    pub async fn search_conversations(&self, query: &str) -> Result<Vec<ConversationSummary>, ApiError> {
        let params = [("q".to_string(), query.to_string())];
        let list: ConversationList = self.client.get("/conversations/search", &params).await?;
        Ok(list.into_vec().iter().map(summary_from_wire).collect())
    }

    /// Canned starter prompts for a role.
    pub async fn suggestions(&self, role: AgentRole) -> Result<Vec<String>, ApiError> {
        let params = [("role".to_string(), role.as_str().to_string())];
        let list: SuggestionList = self.client.get("/suggestions", &params).await?;
        Ok(list.into_vec())
    }

    pub async fn analytics(&self) -> Result<ChatAnalytics, ApiError> {
        self.client.get("/analytics", &[]).await
    }
}

#[async_trait]
impl ChatBackend for ChatbotApi {
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        role: AgentRole,
    ) -> Result<ChatReply, ApiError> {
        let request = ChatRequest {
            message: message.to_string(),
            conversation_id: conversation_id.map(str::to_string),
            role: role.as_str().to_string(),
        };
        info!(
            "Chat request: role={}, conversation={:?}, len={}",
            role.as_str(),
            conversation_id,
            message.len()
        );
        let response: ChatResponse = self.client.post(&self.chat_path, &request).await?;
        let conversation_id = id_string(&response.conversation_id);
        if conversation_id.is_empty() {
            return Err(ApiError::Parse("chat response has no conversation id".to_string()));
        }
        debug!("Chat reply: conversation={}, len={}", conversation_id, response.reply.len());
        Ok(ChatReply {
            conversation_id,
            reply: response.reply,
        })
    }

    async fn list_conversations(&self, limit: Option<usize>) -> Result<Vec<ConversationSummary>, ApiError> {
        let params: Vec<(String, String)> = limit
            .map(|l| vec![("limit".to_string(), l.to_string())])
            .unwrap_or_default();
        let list: ConversationList = self.client.get("/conversations", &params).await?;
        Ok(list.into_vec().iter().map(summary_from_wire).collect())
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, ApiError> {
        let path = format!("/conversations/{}", path_segment(id)?);
        let wire: WireConversation = self.client.get(&path, &[]).await?;
        Ok(conversation_from_wire(&wire))
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/conversations/{}", path_segment(id)?))
            .await
    }
}
