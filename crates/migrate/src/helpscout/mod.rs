//! HelpScout API integration
//!
//! This module provides:
//! - Wire types for the v2 REST API
//! - Normalization of listing summaries into the persisted document model
//! - The extraction pipeline walking mailboxes, conversations and threads

mod extract;
mod normalize;

pub use extract::{ExtractOptions, ExtractStats, extract_conversations};
pub use normalize::normalize_conversation;

/// HelpScout API response types
pub mod api {
    use serde::Deserialize;
    use serde_json::{Map, Value};

    use crate::models::{Actor, CustomerRef, SourceChannel};

    /// One conversation as returned by the listing endpoint
    ///
    /// The listing reports `threads` as a count; the full items come from
    /// the separate threads endpoint and are merged during extraction.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ConversationSummary {
        pub id: i64,
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
        /// Thread count, not thread items
        #[serde(default)]
        pub threads: u32,
        #[serde(flatten)]
        pub extra: Map<String, Value>,
    }
}
