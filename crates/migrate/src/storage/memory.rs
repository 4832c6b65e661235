//! In-memory storage implementation
//!
//! Backs tests and dry runs; behaves like the SQLite store including
//! store-assigned document ids and insertion-order listing.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::Result;

use super::traits::{ConversationStore, DocumentId, StoredConversation};
use crate::models::Conversation;

/// In-memory implementation of ConversationStore
pub struct InMemoryConversationStore {
    documents: RwLock<BTreeMap<i64, Conversation>>,
}

impl InMemoryConversationStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn insert_conversation(&self, conversation: &Conversation) -> Result<DocumentId> {
        let mut documents = self.documents.write().unwrap();
        let id = documents.keys().next_back().map_or(1, |last| last + 1);
        documents.insert(id, conversation.clone());
        Ok(DocumentId::new(id))
    }

    fn list_unsubmitted(&self) -> Result<Vec<StoredConversation>> {
        let documents = self.documents.read().unwrap();
        Ok(documents
            .iter()
            .filter(|(_, conversation)| conversation.is_submittable())
            .map(|(id, conversation)| StoredConversation {
                document_id: DocumentId::new(*id),
                conversation: conversation.clone(),
            })
            .collect())
    }

    fn set_destination_id(&self, id: DocumentId, destination_id: i64) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        match documents.get_mut(&id.as_i64()) {
            Some(conversation) => {
                conversation.gorgias_id = Some(destination_id);
                Ok(())
            }
            None => anyhow::bail!("No stored conversation with document id {}", id.as_i64()),
        }
    }

    fn get_conversation(&self, id: DocumentId) -> Result<Option<StoredConversation>> {
        let documents = self.documents.read().unwrap();
        Ok(documents.get(&id.as_i64()).map(|conversation| StoredConversation {
            document_id: id,
            conversation: conversation.clone(),
        }))
    }

    fn count_conversations(&self) -> Result<usize> {
        Ok(self.documents.read().unwrap().len())
    }

    fn clear(&self) -> Result<()> {
        self.documents.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conversation(id: i64, source: &str) -> Conversation {
        serde_json::from_value(json!({
            "id": id,
            "number": id * 10,
            "source": {"type": source}
        }))
        .unwrap()
    }

    #[test]
    fn duplicate_inserts_create_distinct_documents() {
        let store = InMemoryConversationStore::new();
        let conv = conversation(1, "email");
        let first = store.insert_conversation(&conv).unwrap();
        let second = store.insert_conversation(&conv).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.count_conversations().unwrap(), 2);
    }

    #[test]
    fn lists_unsubmitted_email_conversations_in_insertion_order() {
        let store = InMemoryConversationStore::new();
        let a = store.insert_conversation(&conversation(1, "email")).unwrap();
        store.insert_conversation(&conversation(2, "chat")).unwrap();
        let c = store.insert_conversation(&conversation(3, "email")).unwrap();

        let unsubmitted = store.list_unsubmitted().unwrap();
        let ids: Vec<DocumentId> = unsubmitted.iter().map(|doc| doc.document_id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn destination_id_excludes_document_from_listing() {
        let store = InMemoryConversationStore::new();
        let id = store.insert_conversation(&conversation(1, "email")).unwrap();
        assert_eq!(store.list_unsubmitted().unwrap().len(), 1);

        store.set_destination_id(id, 555).unwrap();
        assert!(store.list_unsubmitted().unwrap().is_empty());

        let stored = store.get_conversation(id).unwrap().unwrap();
        assert_eq!(stored.conversation.gorgias_id, Some(555));
    }

    #[test]
    fn non_positive_destination_id_stays_listed() {
        let store = InMemoryConversationStore::new();
        let id = store.insert_conversation(&conversation(1, "email")).unwrap();
        store.set_destination_id(id, 0).unwrap();
        assert_eq!(store.list_unsubmitted().unwrap().len(), 1);
    }

    #[test]
    fn setting_destination_on_unknown_document_fails() {
        let store = InMemoryConversationStore::new();
        assert!(store.set_destination_id(DocumentId::new(99), 1).is_err());
    }

    #[test]
    fn clear_removes_everything() {
        let store = InMemoryConversationStore::new();
        store.insert_conversation(&conversation(1, "email")).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count_conversations().unwrap(), 0);
    }
}
