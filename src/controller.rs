//! # Chat Controller
//!
//! The tokio-specific layer. Feeds [`Action`]s into the reducer, performs the
//! returned [`Effect`]s, and turns finished requests back into actions.
//!
//! ```text
//! dispatch(action) ─▶ update() ─▶ Effect ─┬─▶ SaveSession / ClearSession  (inline, best effort)
//!                                         └─▶ spawn task per slot ─▶ backend
//!                                                    │
//! next() ◀── mpsc ◀── Action (ReplyReceived, ...) ◀──┘
//! ```
//!
//! ## Cancellation
//!
//! Each request runs on its own task, keyed by a [`Slot`]. Issuing a new
//! request for a slot aborts the previous one; resetting the conversation
//! aborts the send and load slots; dropping the controller aborts everything.
//! Responses that still slip through are discarded by the reducer's
//! sequence check.
//!
//! `dispatch` must be called from inside a tokio runtime.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::AgentRole;
use crate::api::ChatBackend;
use crate::core::action::{Action, Effect, update};
use crate::core::session::{ChatPreferences, SessionStore};
use crate::core::state::App;
use crate::core::validate::validate_message;

/// Errors from the headless convenience methods.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Blank message; nothing was sent.
    EmptyMessage,
    /// A send or load is already in flight.
    Busy,
    /// The backend call failed. Carries the banner text.
    Request(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::EmptyMessage => write!(f, "message cannot be empty"),
            ChatError::Busy => write!(f, "a request is already in flight"),
            ChatError::Request(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ChatError {}

/// A logical state slot. At most one task runs per slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Send,
    Load,
    History,
    Delete(String),
}

struct Completion {
    slot: Slot,
    task_id: u64,
    action: Action,
}

pub struct ChatController {
    app: App,
    backend: Arc<dyn ChatBackend>,
    sessions: SessionStore,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    tasks: HashMap<Slot, (u64, AbortHandle)>,
    next_task_id: u64,
}

impl ChatController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        sessions: SessionStore,
        username: impl Into<String>,
        role: AgentRole,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            app: App::new(username, role),
            backend,
            sessions,
            tx,
            rx,
            tasks: HashMap::new(),
            next_task_id: 0,
        }
    }

    pub fn state(&self) -> &App {
        &self.app
    }

    pub fn set_quick_history_limit(&mut self, limit: usize) {
        self.app.quick_history_limit = limit;
    }

    /// Applies saved preferences, then resumes a fresh saved session if
    /// there is one. Missing or unreadable records are simply skipped.
    pub fn restore(&mut self) {
        if let Some(prefs) = self.sessions.load_preferences(&self.app.username) {
            self.app.agent_role = prefs.default_role;
        }
        if let Some(saved) = self.sessions.load(&self.app.username) {
            self.dispatch(Action::Restore(saved));
        }
    }

    /// True when no request is in flight.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn dispatch(&mut self, action: Action) {
        debug!("Dispatch: {:?}", action);
        let effect = update(&mut self.app, action);
        self.perform(effect);
    }

    /// Waits for the next finished request and applies it. Returns `false`
    /// once nothing is in flight.
    pub async fn next(&mut self) -> bool {
        let completion = if self.tasks.is_empty() {
            match self.rx.try_recv() {
                Ok(c) => c,
                Err(_) => return false,
            }
        } else {
            match self.rx.recv().await {
                Some(c) => c,
                None => return false,
            }
        };
        if self
            .tasks
            .get(&completion.slot)
            .is_some_and(|(id, _)| *id == completion.task_id)
        {
            self.tasks.remove(&completion.slot);
        }
        self.dispatch(completion.action);
        true
    }

    /// Runs until every in-flight request has resolved.
    pub async fn settle(&mut self) {
        while self.next().await {}
    }

    /// Aborts every in-flight request and clears loading state.
    pub fn cancel_all(&mut self) {
        for (slot, (_, handle)) in self.tasks.drain() {
            debug!("Aborting {:?}", slot);
            handle.abort();
        }
        self.dispatch(Action::CancelAll);
    }

    // ------------------------------------------------------------------------
    // Headless convenience: dispatch, then settle
    // ------------------------------------------------------------------------

    pub async fn send_message(&mut self, text: &str) -> Result<(), ChatError> {
        let text = validate_message(text).map_err(|_| ChatError::EmptyMessage)?;
        if !self.app.can_send() {
            return Err(ChatError::Busy);
        }
        self.dispatch(Action::Submit(text.to_string()));
        self.settle().await;
        self.result()
    }

    pub async fn load_conversation(&mut self, id: &str) -> Result<(), ChatError> {
        if self.app.pending_send.is_some() {
            return Err(ChatError::Busy);
        }
        self.dispatch(Action::LoadConversation(id.to_string()));
        self.settle().await;
        self.result()
    }

    pub async fn toggle_chat(&mut self) {
        self.dispatch(Action::ToggleChat);
        self.settle().await;
    }

    pub async fn load_quick_history(&mut self) -> Result<(), ChatError> {
        self.dispatch(Action::LoadQuickHistory);
        self.settle().await;
        self.result()
    }

    pub fn start_new_conversation(&mut self) {
        self.dispatch(Action::StartNewConversation);
    }

    pub async fn delete_conversation(&mut self, id: &str) -> Result<(), ChatError> {
        self.dispatch(Action::DismissError);
        self.dispatch(Action::DeleteConversation(id.to_string()));
        self.settle().await;
        self.result()
    }

    pub fn select_role(&mut self, role: AgentRole) {
        self.dispatch(Action::SelectRole(role));
    }

    fn result(&self) -> Result<(), ChatError> {
        match &self.app.error {
            Some(msg) => Err(ChatError::Request(msg.clone())),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------------

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::SendMessage(out) => {
                let backend = self.backend.clone();
                self.spawn(Slot::Send, async move {
                    match backend
                        .send_message(&out.text, out.conversation_id.as_deref(), out.role)
                        .await
                    {
                        Ok(reply) => Action::ReplyReceived { seq: out.seq, reply },
                        Err(e) => Action::SendFailed {
                            seq: out.seq,
                            message: e.user_message(),
                        },
                    }
                });
            }
            Effect::FetchConversation { seq, id } => {
                let backend = self.backend.clone();
                self.spawn(Slot::Load, async move {
                    match backend.get_conversation(&id).await {
                        Ok(conversation) => Action::ConversationLoaded { seq, conversation },
                        Err(e) => Action::LoadFailed {
                            seq,
                            message: e.user_message(),
                        },
                    }
                });
            }
            Effect::FetchQuickHistory { seq, limit } => {
                let backend = self.backend.clone();
                self.spawn(Slot::History, async move {
                    match backend.list_conversations(Some(limit)).await {
                        Ok(conversations) => Action::QuickHistoryLoaded { seq, conversations },
                        Err(e) => Action::QuickHistoryFailed {
                            seq,
                            message: e.user_message(),
                        },
                    }
                });
            }
            Effect::RemoveConversation(id) => {
                let backend = self.backend.clone();
                self.spawn(Slot::Delete(id.clone()), async move {
                    match backend.delete_conversation(&id).await {
                        Ok(()) => Action::ConversationDeleted(id),
                        Err(e) => Action::DeleteFailed {
                            id,
                            message: e.user_message(),
                        },
                    }
                });
            }
            Effect::SaveSession => {
                self.sessions
                    .save(&self.app.username, &self.app.session_state());
            }
            Effect::ClearSession => {
                self.abort(&Slot::Send);
                self.abort(&Slot::Load);
                self.sessions.clear(&self.app.username);
            }
            Effect::SavePreferences => {
                let prefs = ChatPreferences {
                    default_role: self.app.agent_role,
                };
                self.sessions.save_preferences(&self.app.username, &prefs);
            }
        }
    }

    fn spawn<F>(&mut self, slot: Slot, fut: F)
    where
        F: Future<Output = Action> + Send + 'static,
    {
        self.abort(&slot);
        self.next_task_id += 1;
        let task_id = self.next_task_id;
        let tx = self.tx.clone();
        let task_slot = slot.clone();
        info!("Spawning {:?} request (task {})", slot, task_id);
        let handle = tokio::spawn(async move {
            let action = fut.await;
            if tx
                .send(Completion {
                    slot: task_slot,
                    task_id,
                    action,
                })
                .is_err()
            {
                warn!("Failed to deliver result of task {}: controller dropped", task_id);
            }
        });
        self.tasks.insert(slot, (task_id, handle.abort_handle()));
    }

    fn abort(&mut self, slot: &Slot) {
        if let Some((task_id, handle)) = self.tasks.remove(slot) {
            debug!("Superseding {:?} (task {})", slot, task_id);
            handle.abort();
        }
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.tasks.drain() {
            handle.abort();
        }
    }
}
