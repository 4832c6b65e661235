//! Storage trait definitions

use anyhow::Result;

use crate::models::Conversation;

/// Store-assigned identifier for one persisted conversation document
///
/// Extraction is append-only and may store the same source conversation
/// more than once, so documents carry their own identity instead of
/// being keyed by the source conversation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub i64);

impl DocumentId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// A conversation document together with its store identity
#[derive(Debug, Clone)]
pub struct StoredConversation {
    pub document_id: DocumentId,
    pub conversation: Conversation,
}

/// Trait for conversation document storage
///
/// Abstracts over backends (in-memory for tests, SQLite for real runs).
/// Documents are append-only apart from recording the destination id
/// after a successful submission.
pub trait ConversationStore: Send + Sync {
    /// Insert a conversation as a new document, returning its id
    ///
    /// Never deduplicates: inserting the same conversation twice yields
    /// two documents. Re-running extraction over the same pages therefore
    /// grows the store.
    fn insert_conversation(&self, conversation: &Conversation) -> Result<DocumentId>;

    /// List documents still eligible for submission, in insertion order
    ///
    /// Eligible means no positive destination id recorded yet and an
    /// "email" source channel.
    fn list_unsubmitted(&self) -> Result<Vec<StoredConversation>>;

    /// Record the destination ticket id on one document
    ///
    /// This is the submission idempotency guard: once set to a positive
    /// value the document no longer appears in [`ConversationStore::list_unsubmitted`].
    fn set_destination_id(&self, id: DocumentId, destination_id: i64) -> Result<()>;

    /// Fetch a single document by its store id
    fn get_conversation(&self, id: DocumentId) -> Result<Option<StoredConversation>>;

    /// Count all stored documents
    fn count_conversations(&self) -> Result<usize>;

    /// Delete every document (for fresh extraction runs and tests)
    fn clear(&self) -> Result<()>;
}
