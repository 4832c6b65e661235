//! Gorgias API integration
//!
//! This module provides:
//! - Wire types for ticket creation
//! - Transformation of stored conversations into ticket payloads
//! - The submission pipeline recording destination ids in the store

mod submit;
mod transform;

pub use submit::{SubmitStats, submit_conversations};
pub use transform::{SenderPolicy, strip_tags, transform_conversation};

/// Gorgias API request types
pub mod api {
    use serde::Serialize;

    /// Ticket creation payload for `POST /tickets`
    #[derive(Debug, Clone, Serialize)]
    pub struct Ticket {
        pub channel: String,
        pub created_datetime: String,
        pub customer: Party,
        pub external_id: String,
        pub status: String,
        pub subject: String,
        pub updated_datetime: String,
        pub from_agent: bool,
        pub messages: Vec<TicketMessage>,
        pub tags: Vec<Tag>,
    }

    /// A customer, sender or receiver reference
    ///
    /// `email` serializes as null when unknown; the destination accepts
    /// that on the ticket customer but not inside messages, which is why
    /// message building never produces a blank party.
    #[derive(Debug, Clone, Serialize)]
    pub struct Party {
        pub email: Option<String>,
    }

    /// One message inside a ticket
    #[derive(Debug, Clone, Serialize)]
    pub struct TicketMessage {
        pub body_html: String,
        pub body_text: String,
        pub subject: String,
        pub channel: String,
        pub created_datetime: String,
        pub sent_datetime: String,
        pub from_agent: bool,
        pub message_id: String,
        pub via: String,
        pub sender: Party,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub receiver: Option<Party>,
    }

    /// Ticket label
    #[derive(Debug, Clone, Serialize)]
    pub struct Tag {
        pub name: String,
    }
}
