//! Conversation to ticket transformation
//!
//! Pure mapping from a stored conversation document to the destination
//! ticket schema. Produces no ticket when the conversation has no
//! eligible messages; the caller must then skip submission entirely.

use std::sync::LazyLock;

use regex::Regex;

use super::api::{Party, Tag, Ticket, TicketMessage};
use crate::models::{Conversation, ConversationThread};

/// Matches markup tags for the plain-text body. Entities and attribute
/// text are left alone; this is tag stripping, not HTML decoding.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]*>").unwrap());

/// Sender identity rules for agent-authored messages
#[derive(Debug, Clone, Default)]
pub struct SenderPolicy {
    /// Emails allowed to appear as agent senders
    pub valid_senders: Vec<String>,
    /// Fallback sender for agents outside the allow-list
    pub default_sender: String,
}

/// Map a conversation to a ticket payload, or None when no thread
/// qualifies as a message
///
/// Tickets always arrive closed, tagged with their origin, and keyed by
/// the human-facing conversation number so destination-side lookups can
/// trace them back.
pub fn transform_conversation(
    conversation: &Conversation,
    policy: &SenderPolicy,
) -> Option<Ticket> {
    let messages: Vec<TicketMessage> = conversation
        .threads
        .iter()
        .filter_map(|thread| build_message(conversation, thread, policy))
        .collect();
    if messages.is_empty() {
        return None;
    }

    Some(Ticket {
        channel: "api".to_string(),
        created_datetime: conversation.created_at.clone(),
        customer: Party {
            email: non_blank(&conversation.primary_customer.email),
        },
        external_id: conversation.number.to_string(),
        status: "closed".to_string(),
        subject: conversation.subject.clone(),
        updated_datetime: conversation.user_updated_at.clone(),
        from_agent: conversation.created_by.kind != "customer",
        messages,
        tags: vec![Tag {
            name: "helpscout".to_string(),
        }],
    })
}

/// Map one thread to a ticket message
///
/// Threads with a blank body are not messages, and threads with a blank
/// creator email are excluded outright whatever their body holds.
fn build_message(
    conversation: &Conversation,
    thread: &ConversationThread,
    policy: &SenderPolicy,
) -> Option<TicketMessage> {
    if thread.body.trim().is_empty() {
        return None;
    }
    let creator_email = non_blank(&thread.created_by.email)?;

    let (sender, receiver, from_agent) = if thread.created_by.kind == "customer" {
        (
            Party {
                email: Some(creator_email),
            },
            None,
            false,
        )
    } else {
        let sender_email = if policy.valid_senders.iter().any(|valid| valid == &creator_email) {
            creator_email
        } else {
            policy.default_sender.clone()
        };
        // The counterparty is only named when the thread knows it
        let receiver = non_blank(&thread.customer.email).map(|email| Party { email: Some(email) });
        (
            Party {
                email: Some(sender_email),
            },
            receiver,
            true,
        )
    };

    Some(TicketMessage {
        body_html: thread.body.clone(),
        body_text: strip_tags(&thread.body),
        subject: conversation.subject.clone(),
        channel: "api".to_string(),
        created_datetime: thread.created_at.clone(),
        sent_datetime: thread.created_at.clone(),
        from_agent,
        message_id: format!("<{}@web>", thread.id),
        via: "api".to_string(),
        sender,
        receiver,
    })
}

/// Strip markup tags from an HTML body
pub fn strip_tags(body: &str) -> String {
    TAG_PATTERN.replace_all(body, "").into_owned()
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
