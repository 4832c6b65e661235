//! Mailbox model for the source helpdesk

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source-assigned mailbox identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailboxId(pub i64);

impl MailboxId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// A named inbox partition in the source helpdesk
///
/// Only used to scope extraction; conversations reference mailboxes by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mailbox {
    pub id: MailboxId,
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mailbox {
    /// Whether this mailbox passes the configured allow-list
    ///
    /// Entries match either the stringified id or the slug. An empty
    /// allow-list admits every mailbox.
    pub fn matches(&self, allow_list: &[String]) -> bool {
        allow_list.is_empty()
            || allow_list
                .iter()
                .any(|entry| entry == &self.id.as_i64().to_string() || entry == &self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mailbox(id: i64, slug: &str) -> Mailbox {
        serde_json::from_value(json!({"id": id, "slug": slug, "name": "Support"})).unwrap()
    }

    #[test]
    fn empty_allow_list_admits_all() {
        assert!(mailbox(1, "support").matches(&[]));
    }

    #[test]
    fn matches_by_id_or_slug() {
        let support = mailbox(42, "support");
        assert!(support.matches(&["42".to_string()]));
        assert!(support.matches(&["support".to_string()]));
        assert!(support.matches(&["sales".to_string(), "42".to_string()]));
        assert!(!support.matches(&["sales".to_string(), "billing".to_string()]));
    }

    #[test]
    fn keeps_unrecognized_fields() {
        let support = mailbox(42, "support");
        assert_eq!(support.extra["name"], "Support");
    }
}
