//! Conversation extraction pipeline
//!
//! Walks the source API mailbox by mailbox and stores every conversation
//! it sees, with thread items merged in. Inserts are append-only: nothing
//! checks for existing documents, so re-running over the same pages
//! stores duplicates. Callers that need resumability pass an explicit
//! start page or clear the store first.

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde_json::Value;

use super::api::ConversationSummary;
use super::normalize_conversation;
use crate::api::{ApiClient, PageObject, Paginator, embedded_items};
use crate::models::{ConversationThread, Mailbox, MailboxId};
use crate::storage::ConversationStore;

const MAILBOXES_PATH: &str = "mailboxes";
const CONVERSATIONS_PATH: &str = "conversations";

/// Extraction scope and pagination overrides
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Mailbox ids or slugs to extract; empty means every mailbox
    pub mailboxes: Vec<String>,
    /// Conversation status filter ("all", "active", "closed", ...)
    pub status: String,
    /// First conversation page to fetch; None starts from the beginning
    pub start_page: Option<u32>,
    /// Cap on conversation pages per mailbox; 0 means uncapped
    pub max_pages: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            mailboxes: Vec::new(),
            status: "all".to_string(),
            start_page: None,
            max_pages: 0,
        }
    }
}

/// Statistics from an extraction run
#[derive(Debug, Default, Clone)]
pub struct ExtractStats {
    /// Mailboxes that passed the allow-list
    pub mailboxes_matched: usize,
    /// Conversation pages fetched across all mailboxes
    pub pages_fetched: usize,
    /// Conversations stored (one document each, duplicates included)
    pub conversations_stored: usize,
    /// Thread items merged into stored conversations
    pub threads_merged: usize,
    /// Non-fatal faults: failed thread pages, unparseable entries
    pub errors: usize,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Extract conversations from the source API into the store
///
/// Conversation-level page failures abort the run; thread-level page
/// failures are logged and contribute zero items.
pub fn extract_conversations(
    client: &ApiClient,
    store: &dyn ConversationStore,
    options: &ExtractOptions,
) -> Result<ExtractStats> {
    let start = std::time::Instant::now();
    let mut stats = ExtractStats::default();

    // 1. Resolve target mailboxes against the allow-list
    let mailbox_ids = list_mailbox_ids(client, &options.mailboxes)?;
    stats.mailboxes_matched = mailbox_ids.len();
    info!("Extracting {} mailboxes", mailbox_ids.len());

    // 2. Walk conversation pages per mailbox, merging threads as we go
    for mailbox_id in mailbox_ids {
        extract_mailbox(client, store, options, mailbox_id, &mut stats)?;
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    Ok(stats)
}

/// Fetch all mailboxes and keep those passing the allow-list
fn list_mailbox_ids(client: &ApiClient, allow_list: &[String]) -> Result<Vec<MailboxId>> {
    let body = client
        .get(MAILBOXES_PATH, &[])
        .ok_or_else(|| anyhow!("Mailbox listing request failed after retries"))?;
    let page: Value = serde_json::from_str(&body)
        .with_context(|| format!("Invalid mailbox listing response: {}", body))?;

    let mut ids = Vec::new();
    if let Some(items) = page.as_object().and_then(|p| embedded_items(p, "mailboxes")) {
        for item in items {
            match serde_json::from_value::<Mailbox>(item.clone()) {
                Ok(mailbox) if mailbox.matches(allow_list) => ids.push(mailbox.id),
                Ok(_) => {}
                Err(e) => warn!("Skipping unparseable mailbox entry: {}", e),
            }
        }
    }
    Ok(ids)
}

fn extract_mailbox(
    client: &ApiClient,
    store: &dyn ConversationStore,
    options: &ExtractOptions,
    mailbox_id: MailboxId,
    stats: &mut ExtractStats,
) -> Result<()> {
    info!(
        "Extracting mailbox {} (status {})",
        mailbox_id.as_i64(),
        options.status
    );
    let params = [
        ("mailbox".to_string(), mailbox_id.as_i64().to_string()),
        ("status".to_string(), options.status.clone()),
    ];
    let pages = Paginator::new(client, CONVERSATIONS_PATH, &params)
        .start_page(options.start_page)
        .max_pages(options.max_pages);

    for page in pages {
        // Conversation pages are load-bearing; a bad one aborts the run
        let page = page.context("Conversation listing failed")?;
        stats.pages_fetched += 1;

        let Some(items) = embedded_items(&page, "conversations") else {
            continue;
        };
        for item in items {
            let summary: ConversationSummary = match serde_json::from_value(item.clone()) {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Skipping unparseable conversation entry: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };

            // Zero reported threads means no thread fetch at all
            let threads = if summary.threads > 0 {
                fetch_threads(client, summary.id, stats)
            } else {
                Vec::new()
            };
            stats.threads_merged += threads.len();

            let conversation = normalize_conversation(summary, threads);
            store.insert_conversation(&conversation)?;
            stats.conversations_stored += 1;
        }
    }
    Ok(())
}

/// Walk the thread pages of one conversation
///
/// Failed and malformed pages are logged and contribute zero items; the
/// walk itself keeps going so one bad page does not drop the rest.
fn fetch_threads(
    client: &ApiClient,
    conversation_id: i64,
    stats: &mut ExtractStats,
) -> Vec<ConversationThread> {
    let endpoint = format!("{}/{}/threads", CONVERSATIONS_PATH, conversation_id);
    let mut threads = Vec::new();
    for page in Paginator::new(client, endpoint.as_str(), &[]) {
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                warn!("{}", e);
                stats.errors += 1;
                continue;
            }
        };
        match collect_thread_items(&page) {
            Ok(items) => threads.extend(items),
            Err(raw) => {
                warn!(
                    "Thread page for conversation {} contributed no items: {}",
                    conversation_id, raw
                );
                stats.errors += 1;
            }
        }
    }
    threads
}

/// Pull the embedded thread items out of one page
///
/// The raw page JSON comes back as the error when the page is unusable:
/// no embedded thread array, a stray `conversation` field pointing at
/// some other record, or items that do not parse.
fn collect_thread_items(page: &PageObject) -> Result<Vec<ConversationThread>, String> {
    let raw = || serde_json::to_string(page).unwrap_or_default();

    let Some(embedded) = page.get("_embedded").and_then(Value::as_object) else {
        return Err(raw());
    };
    if embedded.get("conversation").is_some_and(|v| !is_blank(v)) {
        return Err(raw());
    }
    let Some(items) = embedded.get("threads").and_then(Value::as_array) else {
        return Err(raw());
    };
    serde_json::from_value(Value::Array(items.clone())).map_err(|_| raw())
}

/// Whether a JSON value reads as blank: null or a string that trims empty
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
