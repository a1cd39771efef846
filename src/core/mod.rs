//! # Core Application Logic
//!
//! Depot's business logic. Knows nothing about HTTP clients, tokio tasks,
//! or any front-end.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (chat data)    │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │  • transforms           │
//!                    │                         │
//!                    │  No network. No UI.     │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │ Controller │      │    CLI     │      │  Storage   │
//!     │  (tokio)   │      │  (clap)    │      │ (files/mem)│
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all chat state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`conversation`]: Messages and conversation snapshots
//! - [`session`]: Best-effort per-user resumption hints and the token
//! - [`storage`]: The key-value store underneath `session`
//! - [`transform`]: Pure backend-record → display-row mapping
//! - [`validate`]: Client-side form checks
//! - [`config`]: Layered configuration

pub mod action;
pub mod config;
pub mod conversation;
pub mod session;
pub mod state;
pub mod storage;
pub mod transform;
pub mod validate;
