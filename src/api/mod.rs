pub mod auth;
pub mod chatbot;
pub mod client;
pub mod error;
pub mod types;
pub mod wms;

pub use chatbot::{ChatBackend, ChatbotApi};
pub use client::{ApiClient, AuthEvent, SessionEvents};
pub use error::ApiError;
pub use wms::{FormError, ListQuery, Resource, WmsApi};
