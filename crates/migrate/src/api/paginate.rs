//! Paged fetch loops for the extraction API
//!
//! Conversation listings and per-conversation thread listings page the
//! same way: a `page` query parameter, and a `page.totalPages` count in
//! each response. `Paginator` captures that walk once as a lazy iterator
//! over JSON page objects so both loops share the cursor rules.

use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

use super::ApiClient;

/// One JSON page body (the response's top-level object)
pub type PageObject = Map<String, Value>;

/// Failure fetching or decoding a single page
#[derive(Debug, Error)]
pub enum PageError {
    /// Transport failure after the client's retries were exhausted
    #[error("request to {url} failed after retries")]
    RequestFailed { url: String },
    /// The response body was not a JSON object
    #[error("invalid page response received from {url}: {body}")]
    InvalidPage { url: String, body: String },
}

/// Lazy cursor over the pages of one endpoint
///
/// The first request omits the `page` parameter unless a start page is
/// configured. Each response's `page.totalPages` extends the walk; a page
/// without page info leaves the total at its last known value (initially
/// 0), so a single response missing it ends the walk instead of looping.
pub struct Paginator<'a> {
    client: &'a ApiClient,
    endpoint: String,
    params: Vec<(String, String)>,
    start_page: Option<u32>,
    max_pages: u32,
    /// Page number of the last fetch, None before the first
    page: Option<u32>,
    total_pages: u32,
    fetched: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a ApiClient, endpoint: impl Into<String>, params: &[(String, String)]) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            params: params.to_vec(),
            start_page: None,
            max_pages: 0,
            page: None,
            total_pages: 0,
            fetched: 0,
        }
    }

    /// Page number for the first request; None lets the API default to 1
    pub fn start_page(mut self, page: Option<u32>) -> Self {
        self.start_page = page;
        self
    }

    /// Cap on fetched pages; 0 means uncapped
    pub fn max_pages(mut self, max: u32) -> Self {
        self.max_pages = max;
        self
    }

    fn fetch_page(&self, request_page: Option<u32>) -> Result<PageObject, PageError> {
        let mut params = self.params.clone();
        if let Some(page) = request_page {
            params.push(("page".to_string(), page.to_string()));
        }
        let url = self
            .client
            .resolve_url(&self.endpoint, &params)
            .map_err(|_| PageError::RequestFailed {
                url: self.endpoint.clone(),
            })?;
        debug!("Fetching {}", url);
        let body = self
            .client
            .get(url.as_str(), &[])
            .ok_or_else(|| PageError::RequestFailed {
                url: url.to_string(),
            })?;
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(page)) => Ok(page),
            _ => Err(PageError::InvalidPage {
                url: url.to_string(),
                body,
            }),
        }
    }
}

impl Iterator for Paginator<'_> {
    type Item = Result<PageObject, PageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.max_pages > 0 && self.fetched >= self.max_pages {
            return None;
        }
        let request_page = match self.page {
            None => self.start_page,
            Some(current) => {
                let next = current + 1;
                if next > self.total_pages {
                    return None;
                }
                Some(next)
            }
        };

        let result = self.fetch_page(request_page);

        // The cursor advances past failed pages too, so callers that log
        // and continue cannot refetch the same page forever.
        self.fetched += 1;
        self.page = Some(request_page.unwrap_or(1));
        if let Ok(page) = &result
            && let Some(total) = page
                .get("page")
                .and_then(|info| info.get("totalPages"))
                .and_then(Value::as_u64)
        {
            self.total_pages = total as u32;
        }

        Some(result)
    }
}

/// The `_embedded.<key>` array of a page, if present
pub fn embedded_items<'a>(page: &'a PageObject, key: &str) -> Option<&'a Vec<Value>> {
    page.get("_embedded")?.get(key)?.as_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiAuth, RateLimiter};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use url::Url;

    fn client_for(base: &str) -> ApiClient {
        ApiClient::new(
            Url::parse(base).unwrap(),
            ApiAuth::Bearer("token".to_string()),
            RateLimiter::disabled(),
            1,
        )
    }

    #[test]
    fn walks_every_page_then_halts() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/items")
            .match_query(Matcher::Any)
            .with_body(r#"{"_embedded":{"items":[]},"page":{"totalPages":3}}"#)
            .expect(3)
            .create();

        let client = client_for(&server.url());
        let pages: Vec<_> = Paginator::new(&client, "items", &[]).collect();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|page| page.is_ok()));
        mock.assert();
    }

    #[test]
    fn start_page_at_last_page_fetches_once() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/items")
            .match_query(Matcher::UrlEncoded("page".to_string(), "3".to_string()))
            .with_body(r#"{"_embedded":{"items":[]},"page":{"totalPages":3}}"#)
            .expect(1)
            .create();

        let client = client_for(&server.url());
        let pages: Vec<_> = Paginator::new(&client, "items", &[])
            .start_page(Some(3))
            .collect();
        assert_eq!(pages.len(), 1);
        mock.assert();
    }

    #[test]
    fn max_pages_caps_the_walk() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/items")
            .match_query(Matcher::Any)
            .with_body(r#"{"_embedded":{"items":[]},"page":{"totalPages":5}}"#)
            .expect(2)
            .create();

        let client = client_for(&server.url());
        let pages: Vec<_> = Paginator::new(&client, "items", &[]).max_pages(2).collect();
        assert_eq!(pages.len(), 2);
        mock.assert();
    }

    #[test]
    fn missing_page_info_ends_after_one_page() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/items")
            .with_body(r#"{"_embedded":{"items":[]}}"#)
            .expect(1)
            .create();

        let client = client_for(&server.url());
        let pages: Vec<_> = Paginator::new(&client, "items", &[]).collect();
        assert_eq!(pages.len(), 1);
        mock.assert();
    }

    #[test]
    fn non_object_body_is_an_invalid_page() {
        let mut server = Server::new();
        server.mock("GET", "/items").with_body("[]").create();

        let client = client_for(&server.url());
        let mut paginator = Paginator::new(&client, "items", &[]);
        match paginator.next() {
            Some(Err(PageError::InvalidPage { url, body })) => {
                assert!(url.ends_with("/items"));
                assert_eq!(body, "[]");
            }
            other => panic!("expected invalid page, got {:?}", other),
        }
        // The failed page consumed the cursor; nothing follows
        assert!(paginator.next().is_none());
    }

    #[test]
    fn transport_failure_is_a_request_failure() {
        let client = client_for("http://127.0.0.1:9");
        let mut paginator = Paginator::new(&client, "items", &[]);
        assert!(matches!(
            paginator.next(),
            Some(Err(PageError::RequestFailed { .. }))
        ));
        assert!(paginator.next().is_none());
    }

    #[test]
    fn pages_arrive_in_page_order() {
        let mut server = Server::new();
        server
            .mock("GET", "/items")
            .match_query(Matcher::UrlEncoded("page".to_string(), "1".to_string()))
            .with_body(r#"{"_embedded":{"items":[1,2]},"page":{"totalPages":2}}"#)
            .create();
        server
            .mock("GET", "/items")
            .match_query(Matcher::UrlEncoded("page".to_string(), "2".to_string()))
            .with_body(r#"{"_embedded":{"items":[3]},"page":{"totalPages":2}}"#)
            .create();

        let client = client_for(&server.url());
        let mut seen = Vec::new();
        for page in Paginator::new(&client, "items", &[]).start_page(Some(1)) {
            let page = page.unwrap();
            if let Some(items) = embedded_items(&page, "items") {
                seen.extend(items.iter().filter_map(Value::as_i64));
            }
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn embedded_items_requires_the_nested_array() {
        let page = json!({"_embedded": {"threads": [{"id": 1}]}});
        let page = page.as_object().unwrap();
        assert_eq!(embedded_items(page, "threads").map(Vec::len), Some(1));
        assert_eq!(embedded_items(page, "conversations"), None);

        let no_embedded = json!({"page": {"totalPages": 1}});
        assert_eq!(embedded_items(no_embedded.as_object().unwrap(), "threads"), None);
    }
}
