//! HelpScout response normalization
//!
//! Converts listing summaries plus separately fetched thread items into
//! the persisted document model.

use super::api::ConversationSummary;
use crate::models::{Conversation, ConversationId, ConversationThread};

/// Build the persisted document from a summary and its fetched threads
///
/// The listing endpoint reports `threads` as a count. The document keeps
/// that count and the fetched items in separate fields so neither ever
/// changes type, and the two can legitimately disagree when thread pages
/// fail during extraction.
pub fn normalize_conversation(
    summary: ConversationSummary,
    threads: Vec<ConversationThread>,
) -> Conversation {
    Conversation {
        id: ConversationId::new(summary.id),
        number: summary.number,
        subject: summary.subject,
        created_at: summary.created_at,
        user_updated_at: summary.user_updated_at,
        primary_customer: summary.primary_customer,
        created_by: summary.created_by,
        source: summary.source,
        thread_count: summary.threads,
        threads,
        gorgias_id: None,
        extra: summary.extra,
    }
}
