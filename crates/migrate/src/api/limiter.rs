//! Sliding-window rate limiting for outbound API calls
//!
//! Both external APIs meter requests per trailing interval. The limiter
//! keeps a window of recent request timestamps and blocks the caller
//! until one more request fits. The wait computation is a pure function
//! over the window so it can be tested without sleeping.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;

/// Added to every computed wait so the oldest window entry has aged out
/// by the time the next request is issued.
const SAFETY_MARGIN: Duration = Duration::from_secs(1);

/// Bounds outbound requests to `limit` per trailing `interval`
///
/// One limiter per external API, owned by that API's client. State is
/// process-local; there is no cross-process coordination.
pub struct RateLimiter {
    limit: usize,
    interval: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize, interval: Duration) -> Self {
        Self {
            limit,
            interval,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// A limiter that always admits immediately
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Block until one more request stays within the window, then record it
    ///
    /// With a full window this sleeps until the oldest retained entry has
    /// aged out, plus a one-second margin. A limit of 0 disables admission
    /// control entirely.
    pub fn admit(&self) {
        if self.limit == 0 {
            return;
        }
        let delay = {
            let mut window = self.window.lock().unwrap();
            let now = Instant::now();
            prune(&mut window, now, self.interval);
            required_delay(&window, now, self.limit, self.interval)
        };
        if let Some(delay) = delay {
            debug!("Rate limit window full, sleeping {:?}", delay);
            std::thread::sleep(delay);
        }
        self.window.lock().unwrap().push_back(Instant::now());
    }
}

/// Drop window entries that have fallen out of the trailing interval
fn prune(window: &mut VecDeque<Instant>, now: Instant, interval: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= interval {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// How long the next request must wait, given an already-pruned window
///
/// None when the window still has room. Otherwise the remaining lifetime
/// of the oldest entry plus the safety margin.
fn required_delay(
    window: &VecDeque<Instant>,
    now: Instant,
    limit: usize,
    interval: Duration,
) -> Option<Duration> {
    if window.len() < limit {
        return None;
    }
    let oldest = *window.front()?;
    Some(interval.saturating_sub(now.duration_since(oldest)) + SAFETY_MARGIN)
}
