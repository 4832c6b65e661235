//! Domain models for migrated support data

mod conversation;
mod mailbox;

pub use conversation::{
    Actor, Conversation, ConversationId, ConversationThread, CustomerRef, SourceChannel,
};
pub use mailbox::{Mailbox, MailboxId};
