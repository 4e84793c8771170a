use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Submissions allowed per client inside one window.
pub const SUBMISSION_MAX_ATTEMPTS: usize = 5;
/// Length of the sliding submission window.
pub const SUBMISSION_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Past this many tracked clients, entries whose history has fully aged out
/// are dropped on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: usize },
    Limited { retry_after: Duration },
}

/// Per-client sliding-window limiter. Each check-and-record happens under a
/// single lock, so concurrent requests from one client cannot both take the
/// last slot.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_attempts: usize,
    window: Duration,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        SlidingWindowLimiter {
            max_attempts,
            window,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// 5 submissions per client per 15 minutes.
    pub fn for_submissions() -> Self {
        Self::new(SUBMISSION_MAX_ATTEMPTS, SUBMISSION_WINDOW)
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    /// Records an attempt at `now` if the client still has room in its window.
    /// Rejected attempts are not recorded.
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut history = self.history.lock().unwrap_or_else(|poisoned| {
            log::error!("Rate limiter mutex was poisoned! Recovering lock.");
            poisoned.into_inner()
        });

        let window = self.window;
        if history.len() > PRUNE_THRESHOLD {
            history.retain(|_, attempts| {
                attempts
                    .back()
                    .map_or(false, |last| now.saturating_duration_since(*last) < window)
            });
        }

        let attempts = history.entry(client.to_string()).or_default();
        while let Some(oldest) = attempts.front() {
            if now.saturating_duration_since(*oldest) >= window {
                attempts.pop_front();
            } else {
                break;
            }
        }

        if attempts.len() >= self.max_attempts {
            let retry_after = attempts
                .front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window);
            return RateDecision::Limited { retry_after };
        }

        attempts.push_back(now);
        RateDecision::Allowed { remaining: self.max_attempts - attempts.len() }
    }
}
