//! Ticket submission pipeline
//!
//! Replays unsubmitted conversations into the destination API, one POST
//! per conversation, and records each returned ticket id in the store
//! before moving on. That write is the idempotency guard: re-running
//! submission never re-posts what already went through.

use anyhow::Result;
use log::{info, warn};
use serde_json::Value;

use super::transform::{SenderPolicy, transform_conversation};
use crate::api::ApiClient;
use crate::storage::ConversationStore;

const TICKETS_PATH: &str = "tickets";

/// Statistics from a submission run
#[derive(Debug, Default, Clone)]
pub struct SubmitStats {
    /// Documents matching the submission predicate at the start
    pub candidates: usize,
    /// Tickets accepted by the destination, id recorded
    pub submitted: usize,
    /// Conversations with no eligible messages
    pub ineligible: usize,
    /// Submissions skipped: transport failure, unparseable response or
    /// destination rejection
    pub skipped: usize,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Submit every eligible stored conversation to the destination API
///
/// Per-conversation faults degrade to skips so the run always works
/// through the remaining candidates; skipped documents stay eligible for
/// the next run.
pub fn submit_conversations(
    client: &ApiClient,
    store: &dyn ConversationStore,
    policy: &SenderPolicy,
) -> Result<SubmitStats> {
    let start = std::time::Instant::now();
    let mut stats = SubmitStats::default();

    let candidates = store.list_unsubmitted()?;
    stats.candidates = candidates.len();
    info!("Submitting {} conversations", candidates.len());

    for stored in candidates {
        let conversation = &stored.conversation;
        info!("Starting {}", conversation.number);

        let Some(ticket) = transform_conversation(conversation, policy) else {
            info!(
                "Conversation {} has no eligible messages, skipping",
                conversation.number
            );
            stats.ineligible += 1;
            continue;
        };

        let Some(body) = client.post_json(TICKETS_PATH, &ticket) else {
            warn!(
                "Ticket submission for {} failed after retries",
                conversation.number
            );
            stats.skipped += 1;
            continue;
        };

        let response: Value = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(_) => {
                warn!(
                    "Unparseable submission response for {}: {}",
                    conversation.number, body
                );
                stats.skipped += 1;
                continue;
            }
        };

        if let Some(error) = response.get("error") {
            warn!(
                "Destination rejected conversation {}: {}",
                conversation.number, error
            );
            stats.skipped += 1;
            continue;
        }

        match response.get("id").and_then(Value::as_i64) {
            Some(ticket_id) => {
                store.set_destination_id(stored.document_id, ticket_id)?;
                info!("{} = {}", conversation.number, ticket_id);
                stats.submitted += 1;
            }
            None => {
                warn!(
                    "Submission response for {} carries no ticket id: {}",
                    conversation.number, body
                );
                stats.skipped += 1;
            }
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiAuth, RateLimiter};
    use crate::models::Conversation;
    use crate::storage::InMemoryConversationStore;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use url::Url;

    fn client_for(server: &ServerGuard) -> ApiClient {
        ApiClient::new(
            Url::parse(&server.url()).unwrap(),
            ApiAuth::Basic {
                username: "megan@acme.example".to_string(),
                api_key: "gorgias-key".to_string(),
            },
            RateLimiter::disabled(),
            1,
        )
    }

    fn policy() -> SenderPolicy {
        SenderPolicy {
            valid_senders: vec!["megan@acme.example".to_string()],
            default_sender: "support@acme.example".to_string(),
        }
    }

    fn email_conversation(number: i64) -> Conversation {
        serde_json::from_value(json!({
            "id": number,
            "number": number,
            "subject": "Need help",
            "source": {"type": "email"},
            "threads": [{
                "id": 1,
                "body": "<p>Hi</p>",
                "createdAt": "2024-01-01",
                "createdBy": {"type": "customer", "email": "a@x.com"}
            }]
        }))
        .unwrap()
    }

    #[test]
    fn submits_and_records_the_destination_id() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/tickets")
            .match_header(
                "authorization",
                "Basic bWVnYW5AYWNtZS5leGFtcGxlOmdvcmdpYXMta2V5",
            )
            .match_body(Matcher::PartialJson(json!({
                "external_id": "100",
                "status": "closed",
                "messages": [{
                    "body_text": "Hi",
                    "from_agent": false,
                    "sender": {"email": "a@x.com"}
                }]
            })))
            .with_status(201)
            .with_body(r#"{"id":555}"#)
            .expect(1)
            .create();

        let store = InMemoryConversationStore::new();
        let id = store
            .insert_conversation(&email_conversation(100))
            .unwrap();

        let client = client_for(&server);
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.candidates, 1);
        assert_eq!(stats.submitted, 1);

        let stored = store.get_conversation(id).unwrap().unwrap();
        assert_eq!(stored.conversation.gorgias_id, Some(555));

        // A second run finds nothing left to submit
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.candidates, 0);
        mock.assert();
    }

    #[test]
    fn ineligible_conversations_are_never_posted() {
        let mut server = Server::new();
        let mock = server.mock("POST", "/tickets").expect(0).create();

        let store = InMemoryConversationStore::new();
        let mut conversation = email_conversation(100);
        conversation.threads[0].body = String::new();
        store.insert_conversation(&conversation).unwrap();

        let client = client_for(&server);
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.ineligible, 1);
        assert_eq!(stats.submitted, 0);
        mock.assert();
    }

    #[test]
    fn destination_rejection_skips_without_marking() {
        let mut server = Server::new();
        server
            .mock("POST", "/tickets")
            .with_status(400)
            .with_body(r#"{"error":{"message":"invalid ticket"}}"#)
            .create();

        let store = InMemoryConversationStore::new();
        store.insert_conversation(&email_conversation(100)).unwrap();

        let client = client_for(&server);
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.submitted, 0);
        // Still eligible next run
        assert_eq!(store.list_unsubmitted().unwrap().len(), 1);
    }

    #[test]
    fn unparseable_responses_skip_without_marking() {
        let mut server = Server::new();
        server
            .mock("POST", "/tickets")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create();

        let store = InMemoryConversationStore::new();
        store.insert_conversation(&email_conversation(100)).unwrap();

        let client = client_for(&server);
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(store.list_unsubmitted().unwrap().len(), 1);
    }

    #[test]
    fn responses_without_an_id_skip_without_marking() {
        let mut server = Server::new();
        server
            .mock("POST", "/tickets")
            .with_body(r#"{"status":"queued"}"#)
            .create();

        let store = InMemoryConversationStore::new();
        store.insert_conversation(&email_conversation(100)).unwrap();

        let client = client_for(&server);
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(store.list_unsubmitted().unwrap().len(), 1);
    }

    #[test]
    fn transport_failure_skips_and_leaves_the_record() {
        let client = ApiClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            ApiAuth::Basic {
                username: "megan@acme.example".to_string(),
                api_key: "gorgias-key".to_string(),
            },
            RateLimiter::disabled(),
            1,
        );
        let store = InMemoryConversationStore::new();
        store.insert_conversation(&email_conversation(100)).unwrap();

        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(store.list_unsubmitted().unwrap().len(), 1);
    }

    #[test]
    fn works_through_every_candidate_in_order() {
        let mut server = Server::new();
        server
            .mock("POST", "/tickets")
            .with_body(r#"{"id":1}"#)
            .expect(2)
            .create();

        let store = InMemoryConversationStore::new();
        store.insert_conversation(&email_conversation(100)).unwrap();
        store.insert_conversation(&email_conversation(200)).unwrap();

        let client = client_for(&server);
        let stats = submit_conversations(&client, &store, &policy()).unwrap();
        assert_eq!(stats.candidates, 2);
        assert_eq!(stats.submitted, 2);
        assert!(store.list_unsubmitted().unwrap().is_empty());
    }
}
