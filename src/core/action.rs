//! # Actions
//!
//! Everything that can happen to a chat session becomes an `Action`.
//! User sends a message? That's `Action::Submit(text)`.
//! Backend answers? That's `Action::ReplyReceived { .. }`.
//!
//! The `update()` function takes the current state and an action, mutates
//! the state, and returns the `Effect` the controller should perform.
//! No side effects here. I/O happens elsewhere.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! Every request-issuing action allocates a sequence number. Responses carry
//! it back, and a response whose seq is not the newest for its slot is
//! dropped: the latest request wins, not the latest response.

use chrono::Utc;
use log::{debug, info, warn};

use crate::AgentRole;
use crate::core::conversation::{ChatReply, Conversation, ConversationSummary, Message};
use crate::core::session::SavedSession;
use crate::core::state::{App, PendingSend};
use crate::core::transform::{PREVIEW_MAX_CHARS, TITLE_MAX_CHARS, truncate_line};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Flip chat visibility. Opening it refreshes the quick history.
    ToggleChat,
    Submit(String),
    ReplyReceived { seq: u64, reply: ChatReply },
    SendFailed { seq: u64, message: String },
    LoadConversation(String),
    ConversationLoaded { seq: u64, conversation: Conversation },
    LoadFailed { seq: u64, message: String },
    LoadQuickHistory,
    QuickHistoryLoaded { seq: u64, conversations: Vec<ConversationSummary> },
    QuickHistoryFailed { seq: u64, message: String },
    StartNewConversation,
    DeleteConversation(String),
    ConversationDeleted(String),
    DeleteFailed { id: String, message: String },
    SelectRole(AgentRole),
    DismissError,
    /// Resume from a saved session hint.
    Restore(SavedSession),
    /// Drop everything in flight.
    CancelAll,
}

/// What the message would look like on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub seq: u64,
    pub text: String,
    pub conversation_id: Option<String>,
    pub role: AgentRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    SendMessage(OutgoingMessage),
    FetchConversation { seq: u64, id: String },
    FetchQuickHistory { seq: u64, limit: usize },
    RemoveConversation(String),
    SaveSession,
    /// Local conversation state was reset: forget the saved hint and drop
    /// any send or load still in flight.
    ClearSession,
    SavePreferences,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::ToggleChat => {
            app.is_chat_open = !app.is_chat_open;
            debug!("Chat open: {}", app.is_chat_open);
            if app.is_chat_open {
                request_quick_history(app)
            } else {
                Effect::None
            }
        }

        Action::Submit(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Effect::None;
            }
            if !app.can_send() {
                warn!("Ignoring submit while a request is in flight");
                return Effect::None;
            }
            let message = Message::user(text);
            let seq = app.next_seq();
            app.pending_send = Some(PendingSend {
                seq,
                message_id: message.id.clone(),
            });
            app.messages.push(message);
            app.is_loading = true;
            app.error = None;
            Effect::SendMessage(OutgoingMessage {
                seq,
                text: text.to_string(),
                conversation_id: app.conversation_id.clone(),
                role: app.agent_role,
            })
        }

        Action::ReplyReceived { seq, reply } => {
            if !is_pending_send(app, seq) {
                debug!("Dropping stale reply (seq={})", seq);
                return Effect::None;
            }
            app.pending_send = None;
            app.is_loading = false;
            if app.conversation_id.is_none() {
                info!("Adopting conversation id {}", reply.conversation_id);
                app.conversation_id = Some(reply.conversation_id.clone());
            }
            app.messages.push(Message::assistant(reply.reply));
            touch_summary(app);
            Effect::SaveSession
        }

        Action::SendFailed { seq, message } => {
            if !is_pending_send(app, seq) {
                debug!("Dropping stale send failure (seq={})", seq);
                return Effect::None;
            }
            warn!("Send failed: {}", message);
            rollback_pending_send(app);
            app.is_loading = false;
            app.error = Some(message);
            Effect::None
        }

        Action::LoadConversation(id) => request_conversation(app, id),

        Action::ConversationLoaded { seq, conversation } => {
            if app.latest_load != Some(seq) {
                debug!("Dropping stale conversation (seq={})", seq);
                return Effect::None;
            }
            app.latest_load = None;
            app.is_loading = false;
            app.agent_role = conversation.summary.role;
            app.conversation_id = Some(conversation.summary.id);
            app.messages = conversation.messages;
            Effect::SaveSession
        }

        Action::LoadFailed { seq, message } => {
            if app.latest_load != Some(seq) {
                debug!("Dropping stale load failure (seq={})", seq);
                return Effect::None;
            }
            warn!("Load failed: {}", message);
            app.latest_load = None;
            app.is_loading = false;
            app.error = Some(message);
            Effect::None
        }

        Action::LoadQuickHistory => request_quick_history(app),

        Action::QuickHistoryLoaded { seq, conversations } => {
            if app.latest_history != Some(seq) {
                return Effect::None;
            }
            app.latest_history = None;
            app.history_loading = false;
            app.conversations = conversations;
            Effect::None
        }

        Action::QuickHistoryFailed { seq, message } => {
            if app.latest_history != Some(seq) {
                return Effect::None;
            }
            app.latest_history = None;
            app.history_loading = false;
            app.error = Some(message);
            Effect::None
        }

        Action::StartNewConversation => {
            reset_conversation(app);
            app.error = None;
            Effect::ClearSession
        }

        Action::DeleteConversation(id) => Effect::RemoveConversation(id),

        Action::ConversationDeleted(id) => {
            app.conversations.retain(|c| c.id != id);
            if app.conversation_id.as_deref() == Some(id.as_str()) {
                reset_conversation(app);
                Effect::ClearSession
            } else {
                Effect::None
            }
        }

        Action::DeleteFailed { id, message } => {
            warn!("Delete of {} failed: {}", id, message);
            app.error = Some(message);
            Effect::None
        }

        Action::SelectRole(role) => {
            app.agent_role = role;
            Effect::SavePreferences
        }

        Action::DismissError => {
            app.error = None;
            Effect::None
        }

        Action::Restore(saved) => {
            app.agent_role = saved.state.agent_role;
            match saved.state.conversation_id {
                Some(id) if app.messages.is_empty() && app.conversation_id.is_none() => {
                    info!("Resuming conversation {}", id);
                    request_conversation(app, id)
                }
                _ => Effect::None,
            }
        }

        Action::CancelAll => {
            rollback_pending_send(app);
            app.latest_load = None;
            app.latest_history = None;
            app.is_loading = false;
            app.history_loading = false;
            Effect::None
        }
    }
}

fn is_pending_send(app: &App, seq: u64) -> bool {
    app.pending_send.as_ref().is_some_and(|p| p.seq == seq)
}

/// Removes the optimistic message, leaving the list as it was before submit.
fn rollback_pending_send(app: &mut App) {
    if let Some(pending) = app.pending_send.take() {
        app.messages.retain(|m| m.id != pending.message_id);
    }
}

/// Loads wait behind an unresolved send: the backend already has that
/// message, so the reply must not be orphaned.
fn request_conversation(app: &mut App, id: String) -> Effect {
    if app.pending_send.is_some() {
        warn!("Ignoring load of {} while a send is in flight", id);
        return Effect::None;
    }
    let seq = app.next_seq();
    app.latest_load = Some(seq);
    app.is_loading = true;
    app.error = None;
    Effect::FetchConversation { seq, id }
}

fn request_quick_history(app: &mut App) -> Effect {
    let seq = app.next_seq();
    app.latest_history = Some(seq);
    app.history_loading = true;
    app.error = None;
    Effect::FetchQuickHistory {
        seq,
        limit: app.quick_history_limit,
    }
}

fn reset_conversation(app: &mut App) {
    app.messages.clear();
    app.conversation_id = None;
    app.pending_send = None;
    app.latest_load = None;
    app.is_loading = false;
}

/// Moves the active conversation to the top of the quick history, creating
/// its row if the backend just assigned the id.
fn touch_summary(app: &mut App) {
    let Some(id) = app.conversation_id.clone() else {
        return;
    };
    let preview = app
        .messages
        .last()
        .map(|m| truncate_line(&m.content, PREVIEW_MAX_CHARS))
        .unwrap_or_default();
    let mut summary = match app.conversations.iter().position(|c| c.id == id) {
        Some(pos) => app.conversations.remove(pos),
        None => ConversationSummary {
            id,
            role: app.agent_role,
            title: app
                .messages
                .first()
                .map(|m| truncate_line(&m.content, TITLE_MAX_CHARS))
                .unwrap_or_else(|| "New conversation".to_string()),
            last_message: String::new(),
            message_count: 0,
            last_activity: None,
        },
    };
    summary.last_message = preview;
    summary.message_count = app.messages.len();
    summary.last_activity = Some(Utc::now());
    app.conversations.insert(0, summary);
    app.conversations.truncate(app.quick_history_limit.max(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::MessageRole;
    use crate::core::session::SessionState;

    fn app() -> App {
        App::new("ann", AgentRole::Clerk)
    }

    fn reply(id: &str, text: &str) -> ChatReply {
        ChatReply {
            conversation_id: id.to_string(),
            reply: text.to_string(),
        }
    }

    fn submit(app: &mut App, text: &str) -> OutgoingMessage {
        match update(app, Action::Submit(text.to_string())) {
            Effect::SendMessage(out) => out,
            other => panic!("Expected SendMessage, got {:?}", other),
        }
    }

    fn conversation(id: &str, texts: &[&str]) -> Conversation {
        Conversation {
            summary: ConversationSummary {
                id: id.to_string(),
                role: AgentRole::Manager,
                title: "t".into(),
                last_message: String::new(),
                message_count: texts.len(),
                last_activity: None,
            },
            owner: None,
            messages: texts.iter().map(|t| Message::assistant(*t)).collect(),
        }
    }

    #[test]
    fn test_submit_appends_optimistic_user_message() {
        let mut app = app();
        let out = submit(&mut app, "  How many pallets?  ");
        assert_eq!(out.text, "How many pallets?");
        assert_eq!(out.conversation_id, None);
        assert_eq!(out.role, AgentRole::Clerk);
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].role, MessageRole::User);
        assert_eq!(app.messages[0].content, "How many pallets?");
        assert!(app.is_loading);
    }

    #[test]
    fn test_submit_blank_is_a_no_op() {
        let mut app = app();
        assert_eq!(update(&mut app, Action::Submit(String::new())), Effect::None);
        assert_eq!(update(&mut app, Action::Submit("   ".into())), Effect::None);
        assert!(app.messages.is_empty());
        assert!(!app.is_loading);
    }

    #[test]
    fn test_submit_while_loading_is_rejected() {
        let mut app = app();
        submit(&mut app, "first");
        assert_eq!(update(&mut app, Action::Submit("second".into())), Effect::None);
        assert_eq!(app.messages.len(), 1);
    }

    #[test]
    fn test_reply_adopts_conversation_id_and_appends() {
        let mut app = app();
        let out = submit(&mut app, "hi");
        let effect = update(&mut app, Action::ReplyReceived { seq: out.seq, reply: reply("c1", "hello") });
        assert_eq!(effect, Effect::SaveSession);
        assert_eq!(app.conversation_id.as_deref(), Some("c1"));
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[1].role, MessageRole::Assistant);
        assert_eq!(app.messages[1].content, "hello");
        assert!(!app.is_loading);
        assert_eq!(app.conversations[0].id, "c1");
        assert_eq!(app.conversations[0].title, "hi");
        assert_eq!(app.conversations[0].message_count, 2);
    }

    #[test]
    fn test_reply_keeps_existing_conversation_id() {
        let mut app = app();
        app.conversation_id = Some("c1".into());
        let out = submit(&mut app, "again");
        assert_eq!(out.conversation_id.as_deref(), Some("c1"));
        update(&mut app, Action::ReplyReceived { seq: out.seq, reply: reply("c2", "ok") });
        assert_eq!(app.conversation_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_send_failure_rolls_back() {
        let mut app = app();
        let first = submit(&mut app, "one");
        update(&mut app, Action::ReplyReceived { seq: first.seq, reply: reply("c1", "1") });
        let before = app.messages.clone();

        let out = submit(&mut app, "two");
        let effect = update(&mut app, Action::SendFailed { seq: out.seq, message: "boom".into() });
        assert_eq!(effect, Effect::None);
        assert_eq!(app.messages, before);
        assert_eq!(app.error.as_deref(), Some("boom"));
        assert!(!app.is_loading);
    }

    #[test]
    fn test_stale_reply_is_dropped() {
        let mut app = app();
        let out = submit(&mut app, "hi");
        update(&mut app, Action::StartNewConversation);
        let effect = update(&mut app, Action::ReplyReceived { seq: out.seq, reply: reply("c1", "late") });
        assert_eq!(effect, Effect::None);
        assert!(app.messages.is_empty());
        assert_eq!(app.conversation_id, None);
    }

    #[test]
    fn test_latest_load_wins() {
        let mut app = app();
        let Effect::FetchConversation { seq: first, .. } = update(&mut app, Action::LoadConversation("a".into())) else {
            panic!("expected fetch");
        };
        let Effect::FetchConversation { seq: second, .. } = update(&mut app, Action::LoadConversation("b".into())) else {
            panic!("expected fetch");
        };

        // Newer request resolves first, then the stale one arrives.
        update(&mut app, Action::ConversationLoaded { seq: second, conversation: conversation("b", &["from b"]) });
        let effect = update(&mut app, Action::ConversationLoaded { seq: first, conversation: conversation("a", &["from a"]) });

        assert_eq!(effect, Effect::None);
        assert_eq!(app.conversation_id.as_deref(), Some("b"));
        assert_eq!(app.messages[0].content, "from b");
        assert_eq!(app.agent_role, AgentRole::Manager);
        assert!(!app.is_loading);
    }

    #[test]
    fn test_load_failure_keeps_messages() {
        let mut app = app();
        app.messages.push(Message::user("keep me"));
        let Effect::FetchConversation { seq, .. } = update(&mut app, Action::LoadConversation("x".into())) else {
            panic!("expected fetch");
        };
        update(&mut app, Action::LoadFailed { seq, message: "Not Found".into() });
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.error.as_deref(), Some("Not Found"));
        assert!(!app.is_loading);
    }

    #[test]
    fn test_load_while_send_in_flight_is_rejected() {
        let mut app = app();
        app.conversation_id = Some("c1".into());
        let out = submit(&mut app, "hi");
        assert_eq!(update(&mut app, Action::LoadConversation("c9".into())), Effect::None);
        assert_eq!(app.conversation_id.as_deref(), Some("c1"));
        assert_eq!(app.latest_load, None);

        update(&mut app, Action::ReplyReceived { seq: out.seq, reply: reply("c1", "hello") });
        let contents: Vec<_> = app.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello"]);
        assert!(matches!(
            update(&mut app, Action::LoadConversation("c9".into())),
            Effect::FetchConversation { ref id, .. } if id == "c9"
        ));
    }

    #[test]
    fn test_quick_history_request_clears_stale_error() {
        let mut app = app();
        let out = submit(&mut app, "hi");
        update(&mut app, Action::SendFailed { seq: out.seq, message: "boom".into() });
        assert_eq!(app.error.as_deref(), Some("boom"));

        let Effect::FetchQuickHistory { seq, .. } = update(&mut app, Action::LoadQuickHistory) else {
            panic!("expected history fetch");
        };
        assert!(app.error.is_none());
        update(&mut app, Action::QuickHistoryLoaded { seq, conversations: vec![] });
        assert!(app.error.is_none());
    }

    #[test]
    fn test_toggle_chat_requests_quick_history_on_open_only() {
        let mut app = app();
        let effect = update(&mut app, Action::ToggleChat);
        assert!(app.is_chat_open);
        assert!(matches!(effect, Effect::FetchQuickHistory { limit: 5, .. }));
        assert!(app.history_loading);
        assert_eq!(update(&mut app, Action::ToggleChat), Effect::None);
        assert!(!app.is_chat_open);
    }

    #[test]
    fn test_quick_history_loaded_empty() {
        let mut app = app();
        let Effect::FetchQuickHistory { seq, .. } = update(&mut app, Action::ToggleChat) else {
            panic!("expected history fetch");
        };
        update(&mut app, Action::QuickHistoryLoaded { seq, conversations: vec![] });
        assert!(app.conversations.is_empty());
        assert!(!app.history_loading);
        assert!(app.error.is_none());
    }

    #[test]
    fn test_delete_active_conversation_resets() {
        let mut app = app();
        app.conversation_id = Some("c1".into());
        app.messages.push(Message::user("x"));
        app.conversations = vec![conversation("c1", &[]).summary];
        assert_eq!(
            update(&mut app, Action::DeleteConversation("c1".into())),
            Effect::RemoveConversation("c1".into())
        );
        assert_eq!(update(&mut app, Action::ConversationDeleted("c1".into())), Effect::ClearSession);
        assert!(app.conversations.is_empty());
        assert!(app.messages.is_empty());
        assert_eq!(app.conversation_id, None);
    }

    #[test]
    fn test_delete_other_conversation_keeps_active() {
        let mut app = app();
        app.conversation_id = Some("c1".into());
        app.conversations = vec![conversation("c2", &[]).summary];
        assert_eq!(update(&mut app, Action::ConversationDeleted("c2".into())), Effect::None);
        assert_eq!(app.conversation_id.as_deref(), Some("c1"));
        assert!(app.conversations.is_empty());
    }

    #[test]
    fn test_select_role_and_dismiss_error() {
        let mut app = app();
        assert_eq!(update(&mut app, Action::SelectRole(AgentRole::Packer)), Effect::SavePreferences);
        assert_eq!(app.agent_role, AgentRole::Packer);
        app.error = Some("x".into());
        update(&mut app, Action::DismissError);
        assert!(app.error.is_none());
    }

    #[test]
    fn test_restore_loads_saved_conversation() {
        let mut app = app();
        let saved = SavedSession {
            state: SessionState {
                conversation_id: Some("c7".into()),
                message_count: 3,
                last_activity: Utc::now(),
                agent_role: AgentRole::Driver,
            },
            saved_at: Utc::now(),
        };
        let effect = update(&mut app, Action::Restore(saved));
        assert!(matches!(effect, Effect::FetchConversation { ref id, .. } if id == "c7"));
        assert_eq!(app.agent_role, AgentRole::Driver);
    }

    #[test]
    fn test_cancel_all_rolls_back_and_clears_flags() {
        let mut app = app();
        submit(&mut app, "hi");
        update(&mut app, Action::LoadQuickHistory);
        update(&mut app, Action::CancelAll);
        assert!(app.messages.is_empty());
        assert!(!app.is_loading);
        assert!(!app.history_loading);
        assert!(app.pending_send.is_none());
    }
}
