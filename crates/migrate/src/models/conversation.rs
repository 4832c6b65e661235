//! Conversation document model
//!
//! The persisted shape of a source conversation after extraction. Typed
//! fields cover everything the pipelines read; every other field the API
//! returns is kept in a flattened extras map so documents survive the
//! store round-trip without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source-assigned conversation identifier
///
/// Not unique within the store: extraction is append-only, so the same
/// source conversation can appear in more than one stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl ConversationId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A customer reference on a conversation or thread
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerRef {
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Who created a conversation or thread
///
/// `kind` is the API's `type` field: "customer" for end users, anything
/// else (commonly "user") for agents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Originating channel of a conversation ("email", "chat", ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceChannel {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single message within a conversation
///
/// A thread whose `body` is empty or absent is not a message (the source
/// API also models status changes and notes as threads).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    #[serde(default)]
    pub id: i64,
    /// HTML body; empty for non-message threads
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub created_by: Actor,
    #[serde(default)]
    pub customer: CustomerRef,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A customer support case, with its threads merged in by extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    /// Human-facing conversation number
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user_updated_at: String,
    #[serde(default)]
    pub primary_customer: CustomerRef,
    #[serde(default)]
    pub created_by: Actor,
    #[serde(default)]
    pub source: SourceChannel,
    /// Thread count as reported by the conversation summary endpoint
    #[serde(default)]
    pub thread_count: u32,
    /// Full thread items fetched during extraction. Kept separate from
    /// `thread_count`; the two can disagree when thread pages fail.
    #[serde(default)]
    pub threads: Vec<ConversationThread>,
    /// Destination ticket id, set once submission succeeds
    #[serde(rename = "gorgias_id", default, skip_serializing_if = "Option::is_none")]
    pub gorgias_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conversation {
    /// Whether this document is still a candidate for submission
    ///
    /// True when no destination id has been recorded (absent or
    /// non-positive) and the conversation originated as an email.
    pub fn is_submittable(&self) -> bool {
        self.source.kind == "email" && self.gorgias_id.is_none_or(|id| id <= 0)
    }
}
