//! Shared HTTP plumbing: rate limiting, authenticated requests, pagination

mod client;
mod limiter;
mod paginate;

pub use client::{ApiAuth, ApiClient, DEFAULT_RETRY_LIMIT};
pub use limiter::RateLimiter;
pub use paginate::{embedded_items, PageError, PageObject, Paginator};
