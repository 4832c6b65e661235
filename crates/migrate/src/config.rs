//! Migration configuration
//!
//! All settings live in one JSON file with a section per collaborator:
//! the document store, each external API, and the shared rate limit.
//! Every field deserializes as optional; pipelines declare which
//! settings they cannot run without and validation reports the full
//! list of missing paths at once instead of failing on the first.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::api::{DEFAULT_RETRY_LIMIT, RateLimiter};
use crate::gorgias::SenderPolicy;

/// Document store settings
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: Option<String>,
}

/// Source API settings
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HelpScoutConfig {
    pub url: Option<String>,
    pub api_token: Option<String>,
    /// Comma-separated mailbox ids or slugs; absent or empty selects all
    pub mailboxes: Option<String>,
}

/// Destination API settings
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GorgiasConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    /// Comma-separated agent emails allowed to appear as ticket senders
    pub valid_users: Option<String>,
    /// Sender substituted for agents missing from `valid_users`
    pub default_user: Option<String>,
}

/// Request budget shared by both pipelines
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per interval; 0 disables limiting
    pub requests: Option<u64>,
    /// Window length in seconds
    pub interval: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub database: DatabaseConfig,
    pub helpscout_api: HelpScoutConfig,
    pub gorgias_api: GorgiasConfig,
    pub rate_limit: RateLimitConfig,
    /// Total attempts per request; absent falls back to the client default
    pub retry_limit: Option<u32>,
}

impl MigrationConfig {
    /// Load and parse a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Settings extraction cannot run without, as `section > key` paths
    pub fn missing_for_extract(&self) -> Vec<String> {
        let mut missing = Vec::new();
        require(&mut missing, "database > path", self.database.path.as_deref());
        require(
            &mut missing,
            "helpscout_api > url",
            self.helpscout_api.url.as_deref(),
        );
        require(
            &mut missing,
            "helpscout_api > api_token",
            self.helpscout_api.api_token.as_deref(),
        );
        require_count(&mut missing, "rate_limit > requests", self.rate_limit.requests);
        require_count(&mut missing, "rate_limit > interval", self.rate_limit.interval);
        missing
    }

    /// Settings submission cannot run without, as `section > key` paths
    pub fn missing_for_submit(&self) -> Vec<String> {
        let mut missing = Vec::new();
        require(&mut missing, "database > path", self.database.path.as_deref());
        require(&mut missing, "gorgias_api > url", self.gorgias_api.url.as_deref());
        require(
            &mut missing,
            "gorgias_api > username",
            self.gorgias_api.username.as_deref(),
        );
        require(
            &mut missing,
            "gorgias_api > api_key",
            self.gorgias_api.api_key.as_deref(),
        );
        require(
            &mut missing,
            "gorgias_api > valid_users",
            self.gorgias_api.valid_users.as_deref(),
        );
        require(
            &mut missing,
            "gorgias_api > default_user",
            self.gorgias_api.default_user.as_deref(),
        );
        require_count(&mut missing, "rate_limit > requests", self.rate_limit.requests);
        require_count(&mut missing, "rate_limit > interval", self.rate_limit.interval);
        missing
    }

    /// Mailbox ids or slugs extraction is restricted to
    pub fn mailbox_allow_list(&self) -> Vec<String> {
        split_list(self.helpscout_api.mailboxes.as_deref().unwrap_or_default())
    }

    pub fn sender_policy(&self) -> SenderPolicy {
        SenderPolicy {
            valid_senders: split_list(self.gorgias_api.valid_users.as_deref().unwrap_or_default()),
            default_sender: self.gorgias_api.default_user.clone().unwrap_or_default(),
        }
    }

    /// Limiter sized from the rate_limit section; absent settings disable it
    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit.requests.unwrap_or(0) as usize,
            Duration::from_secs(self.rate_limit.interval.unwrap_or(0)),
        )
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT)
    }
}

fn require(missing: &mut Vec<String>, path: &str, value: Option<&str>) {
    if value.is_none_or(|v| v.trim().is_empty()) {
        missing.push(path.to_string());
    }
}

fn require_count(missing: &mut Vec<String>, path: &str, value: Option<u64>) {
    if value.is_none() {
        missing.push(path.to_string());
    }
}

/// Split a comma-separated config list, trimming entries and dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
