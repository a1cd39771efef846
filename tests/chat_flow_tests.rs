use std::sync::Arc;

use depot::AgentRole;
use depot::api::{ApiClient, AuthEvent, ChatBackend, ChatbotApi, SessionEvents};
use depot::controller::{ChatController, ChatError};
use depot::core::conversation::MessageRole;
use depot::core::session::{SessionState, SessionStore, TokenStore};
use depot::core::storage::{MemoryStorage, Storage};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

// ============================================================================
// Helper Functions
// ============================================================================

struct Harness {
    ctrl: ChatController,
    sessions: SessionStore,
    tokens: TokenStore,
    events: SessionEvents,
}

/// Wires a controller to the mock server's `/api` prefix, signed in as ann.
fn harness(server: &MockServer) -> Harness {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let tokens = TokenStore::new(storage.clone());
    tokens.set("tok");
    let events = SessionEvents::new();
    let client = ApiClient::new(format!("{}/api", server.uri()), tokens.clone(), events.clone());
    let backend: Arc<dyn ChatBackend> = Arc::new(ChatbotApi::new(client));
    let sessions = SessionStore::new(storage);
    let ctrl = ChatController::new(backend, sessions.clone(), "ann", AgentRole::Clerk);
    Harness {
        ctrl,
        sessions,
        tokens,
        events,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_open_chat_with_no_prior_conversations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    h.ctrl.toggle_chat().await;

    let app = h.ctrl.state();
    assert!(app.is_chat_open);
    assert!(app.conversations.is_empty());
    assert!(app.error.is_none());
    assert!(!app.history_loading);
}

#[tokio::test]
async fn test_first_message_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({
            "message": "What is my current inventory status?",
            "role": "clerk"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversationId": "c1",
            "reply": "42 units available"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    h.ctrl.send_message("What is my current inventory status?").await.unwrap();

    let app = h.ctrl.state();
    let transcript: Vec<_> = app.messages.iter().map(|m| (m.role, m.content.as_str())).collect();
    assert_eq!(
        transcript,
        vec![
            (MessageRole::User, "What is my current inventory status?"),
            (MessageRole::Assistant, "42 units available"),
        ]
    );
    assert_eq!(app.conversation_id.as_deref(), Some("c1"));

    let saved = h.sessions.load("ann").unwrap();
    assert_eq!(saved.state.conversation_id.as_deref(), Some("c1"));
    assert_eq!(saved.state.agent_role, AgentRole::Clerk);
}

#[tokio::test]
async fn test_follow_up_carries_conversation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({"message": "first", "role": "clerk"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"conversation_id": 17, "response": "one"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({"message": "second", "conversationId": "17", "role": "clerk"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"conversation_id": 17, "response": "two"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    h.ctrl.send_message("first").await.unwrap();
    h.ctrl.send_message("second").await.unwrap();
    assert_eq!(h.ctrl.state().conversation_id.as_deref(), Some("17"));
    assert_eq!(h.ctrl.state().messages.len(), 4);
}

#[tokio::test]
async fn test_unauthorized_send_rolls_back_and_signs_out_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let mut rx = h.events.subscribe();

    let result = h.ctrl.send_message("hello").await;
    assert_eq!(result, Err(ChatError::Request("Not authenticated".into())));
    assert!(h.ctrl.state().messages.is_empty());
    assert!(!h.ctrl.state().is_loading);
    assert_eq!(h.tokens.get(), None);
    assert_eq!(rx.try_recv(), Ok(AuthEvent::SessionExpired));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    let _ = h.ctrl.send_message("again").await;
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_restore_resumes_saved_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "agentRole": "picker",
            "title": "Pick list",
            "messages": [
                {"id": 1, "role": "user", "content": "Next pick?", "createdAt": "2026-10-18T09:00:00Z"},
                {"id": 2, "role": "system", "content": "hidden"},
                {"id": 3, "role": "assistant", "content": "Aisle 4, bin 12", "createdAt": "2026-10-18T09:00:05Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    h.sessions.save(
        "ann",
        &SessionState {
            conversation_id: Some("c1".into()),
            message_count: 2,
            last_activity: chrono::Utc::now(),
            agent_role: AgentRole::Picker,
        },
    );

    h.ctrl.restore();
    h.ctrl.settle().await;

    let app = h.ctrl.state();
    assert_eq!(app.conversation_id.as_deref(), Some("c1"));
    assert_eq!(app.agent_role, AgentRole::Picker);
    let contents: Vec<_> = app.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Next pick?", "Aisle 4, bin 12"]);
}

#[tokio::test]
async fn test_delete_active_conversation_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"conversationId": "c1", "reply": "ok"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/c1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    h.ctrl.send_message("hi").await.unwrap();
    assert!(h.sessions.load("ann").is_some());

    h.ctrl.delete_conversation("c1").await.unwrap();
    assert!(h.ctrl.state().messages.is_empty());
    assert_eq!(h.ctrl.state().conversation_id, None);
    assert!(h.sessions.load("ann").is_none());
}

// ============================================================================
// Chatbot Extras
// ============================================================================

#[tokio::test]
async fn test_search_suggestions_and_analytics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/search"))
        .and(query_param("q", "pallet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [{"id": 4, "role": "packer", "title": "Pallet wrap", "messageCount": 6}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/suggestions"))
        .and(query_param("role", "driver"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"suggestions": ["Where is my next stop?"]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalConversations": 12,
            "totalMessages": 80,
            "conversationsByRole": {"clerk": 7, "driver": 5}
        })))
        .mount(&server)
        .await;

    let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
    let api = ChatbotApi::new(ApiClient::new(format!("{}/api", server.uri()), tokens, SessionEvents::new()));

    let found = api.search_conversations("pallet").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "4");
    assert_eq!(found[0].role, AgentRole::Packer);
    assert_eq!(found[0].message_count, 6);

    let prompts = api.suggestions(AgentRole::Driver).await.unwrap();
    assert_eq!(prompts, vec!["Where is my next stop?".to_string()]);

    let stats = api.analytics().await.unwrap();
    assert_eq!(stats.total_conversations, 12);
    assert_eq!(stats.conversations_by_role.get("driver"), Some(&5));
}

#[tokio::test]
async fn test_conversation_ids_stay_inside_their_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ann"})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/..%2Fauth%2Fme"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Conversation not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
    let api = ChatbotApi::new(ApiClient::new(format!("{}/api", server.uri()), tokens, SessionEvents::new()));

    let err = api.get_conversation("../auth/me").await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let err = api.delete_conversation("..").await.unwrap_err();
    assert!(matches!(err, depot::api::ApiError::InvalidRequest(_)));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
