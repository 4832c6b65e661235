//! Migrate crate - Support conversation migration between helpdesk systems
//!
//! This crate moves customer-support conversations from a HelpScout
//! account into a Gorgias account through an intermediate document store:
//! - Domain models (Conversation, ConversationThread, Mailbox)
//! - Rate-limited, retrying API client with cursor pagination
//! - Storage trait abstractions (SQLite and in-memory)
//! - Extraction pipeline: mailboxes -> conversations -> merged threads
//! - Submission pipeline: eligible conversations -> tickets, resumable
//!   through the destination id written back onto each document
//!
//! This crate has no CLI dependencies; the hs2gorgias binary wires the
//! pipelines to configuration and logging.

pub mod api;
pub mod config;
pub mod gorgias;
pub mod helpscout;
pub mod models;
pub mod storage;

pub use api::{ApiAuth, ApiClient, DEFAULT_RETRY_LIMIT, PageError, Paginator, RateLimiter};
pub use config::MigrationConfig;
pub use gorgias::{SenderPolicy, SubmitStats, submit_conversations};
pub use helpscout::{ExtractOptions, ExtractStats, extract_conversations};
pub use models::{Actor, Conversation, ConversationId, ConversationThread, CustomerRef, Mailbox};
pub use storage::{
    ConversationStore, DocumentId, InMemoryConversationStore, SqliteConversationStore,
    StoredConversation,
};
