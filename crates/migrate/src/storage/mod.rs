//! Conversation document storage

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryConversationStore;
pub use sqlite::SqliteConversationStore;
pub use traits::{ConversationStore, DocumentId, StoredConversation};
