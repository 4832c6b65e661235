//! Authenticated HTTP client shared by both pipelines
//!
//! Wraps a synchronous ureq agent with per-API auth, rate-limiter
//! admission and a bounded retry loop. HTTP error statuses are not
//! failures here: the submission API returns diagnostic JSON in 4xx
//! bodies and callers need to read it. Only transport-level faults are
//! retried, and exhausting the retries yields `None`.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::prelude::*;
use log::{debug, warn};
use serde::Serialize;
use url::Url;

use super::RateLimiter;

/// Timeout applied to every request, covering connect and body read
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of attempts per request before giving up
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

type RawResult = Result<ureq::http::Response<ureq::Body>, ureq::Error>;

/// Credentials for one external API
pub enum ApiAuth {
    /// `Authorization: Bearer <token>` (source extraction API)
    Bearer(String),
    /// HTTP basic auth (destination submission API)
    Basic { username: String, api_key: String },
}

impl ApiAuth {
    fn header_value(&self) -> String {
        match self {
            ApiAuth::Bearer(token) => format!("Bearer {}", token),
            ApiAuth::Basic { username, api_key } => {
                let credentials = BASE64_STANDARD.encode(format!("{}:{}", username, api_key));
                format!("Basic {}", credentials)
            }
        }
    }
}

/// Synchronous client for one external API
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: Url,
    auth: ApiAuth,
    limiter: RateLimiter,
    retry_limit: u32,
}

impl ApiClient {
    /// Create a client rooted at `base_url`
    ///
    /// `retry_limit` is the total attempt count per request; values below
    /// 1 are treated as 1. The limiter is consulted before every attempt.
    pub fn new(base_url: Url, auth: ApiAuth, limiter: RateLimiter, retry_limit: u32) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            base_url,
            auth,
            limiter,
            retry_limit: retry_limit.max(1),
        }
    }

    /// GET `path_or_url` with `params` merged into its query string
    ///
    /// Returns the response body for any HTTP status, or `None` once
    /// transport-level retries are exhausted.
    pub fn get(&self, path_or_url: &str, params: &[(String, String)]) -> Option<String> {
        let url = match self.resolve_url(path_or_url, params) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping unusable request URL {}: {:#}", path_or_url, e);
                return None;
            }
        };
        let authorization = self.auth.header_value();
        self.with_retries(&url, || {
            self.agent
                .get(url.as_str())
                .header("Authorization", &authorization)
                .header("Accept", "application/json")
                .call()
        })
    }

    /// POST `payload` as JSON to `path_or_url`
    ///
    /// Same return contract as [`ApiClient::get`]. The JSON content-type
    /// header is set by the agent.
    pub fn post_json<T: Serialize>(&self, path_or_url: &str, payload: &T) -> Option<String> {
        let url = match self.resolve_url(path_or_url, &[]) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping unusable request URL {}: {:#}", path_or_url, e);
                return None;
            }
        };
        let authorization = self.auth.header_value();
        self.with_retries(&url, || {
            self.agent
                .post(url.as_str())
                .header("Authorization", &authorization)
                .header("Accept", "application/json")
                .send_json(payload)
        })
    }

    /// Build the full request URL
    ///
    /// Absolute URLs (anything with a scheme separator) pass through
    /// untouched; relative paths join the configured base. `params` merge
    /// into any query already present, new values overriding same-named
    /// ones without reordering the existing pairs.
    pub(crate) fn resolve_url(&self, path_or_url: &str, params: &[(String, String)]) -> Result<Url> {
        let mut url = if path_or_url.contains(':') {
            Url::parse(path_or_url)
                .with_context(|| format!("Invalid absolute URL: {}", path_or_url))?
        } else {
            let joined = format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                path_or_url.trim_start_matches('/')
            );
            Url::parse(&joined).with_context(|| format!("Invalid request path: {}", path_or_url))?
        };

        if !params.is_empty() {
            let mut merged: Vec<(String, String)> = url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            for (key, value) in params {
                if let Some(existing) = merged.iter_mut().find(|(k, _)| k == key) {
                    existing.1 = value.clone();
                } else {
                    merged.push((key.clone(), value.clone()));
                }
            }
            url.query_pairs_mut()
                .clear()
                .extend_pairs(merged.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    fn with_retries<F>(&self, url: &Url, send: F) -> Option<String>
    where
        F: Fn() -> RawResult,
    {
        for attempt in 1..=self.retry_limit {
            self.limiter.admit();
            match send() {
                Ok(mut response) => {
                    let status = response.status();
                    match response.body_mut().read_to_string() {
                        Ok(body) => {
                            debug!("{} -> {}", url, status);
                            return Some(body);
                        }
                        Err(e) => warn!(
                            "Reading response from {} failed (attempt {}/{}): {}",
                            url, attempt, self.retry_limit, e
                        ),
                    }
                }
                Err(e) => warn!(
                    "Request to {} failed (attempt {}/{}): {}",
                    url, attempt, self.retry_limit, e
                ),
            }
        }
        warn!("Giving up on {} after {} attempts", url, self.retry_limit);
        None
    }
}
