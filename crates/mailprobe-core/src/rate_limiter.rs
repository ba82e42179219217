//! Rate Limiter - Sliding-window caps on SMTP probes per domain

use mailprobe_common::config::RateLimitConfig;
use mailprobe_common::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// First retry delay for a rate-limited job
const BACKOFF_BASE_SECS: u64 = 60;

/// Total delay a job may accumulate across retries
const BACKOFF_TOTAL_CAP_SECS: u64 = 3600;

#[derive(Default)]
struct Windows {
    domains: HashMap<String, VecDeque<Instant>>,
    global: VecDeque<Instant>,
    last_sweep: Option<Instant>,
}

impl Windows {
    /// Drop domains with no hits left, at most once per window
    fn sweep_idle(&mut self, now: Instant, window: Duration) {
        if self
            .last_sweep
            .is_some_and(|last| now.duration_since(last) < window)
        {
            return;
        }
        self.domains.retain(|_, hits| {
            evict(hits, now, window);
            !hits.is_empty()
        });
        self.last_sweep = Some(now);
    }
}

/// Per-domain sliding window limiter with an optional global window.
///
/// Checks and records happen under one lock so concurrent probes to the same
/// domain never overshoot the cap.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(Windows::default()),
        }
    }

    fn domain_window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    fn global_window(&self) -> Duration {
        Duration::from_secs(self.config.global_window_secs)
    }

    /// Record one probe against `domain`, or fail with `RateLimitExceeded`
    /// carrying the seconds until a slot frees up
    pub async fn try_acquire(&self, domain: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let domain = domain.to_lowercase();
        let mut windows = self.windows.lock().await;

        let domain_window = self.domain_window();
        windows.sweep_idle(now, domain_window);
        if let Some(hits) = windows.domains.get_mut(&domain) {
            evict(hits, now, domain_window);
        }
        let used = windows.domains.get(&domain).map_or(0, VecDeque::len);
        if used >= self.config.per_domain_limit as usize {
            let retry_after = windows
                .domains
                .get(&domain)
                .map_or(1, |hits| retry_after(hits, now, domain_window));
            debug!(
                domain = %domain,
                limit = self.config.per_domain_limit,
                "Rate limit hit for domain"
            );
            return Err(Error::RateLimitExceeded {
                domain,
                retry_after_secs: retry_after,
            });
        }

        if let Some(limit) = self.config.global_limit {
            let global_window = self.global_window();
            evict(&mut windows.global, now, global_window);
            if windows.global.len() >= limit as usize {
                let retry_after = retry_after(&windows.global, now, global_window);
                debug!(domain = %domain, limit, "Global rate limit hit");
                return Err(Error::RateLimitExceeded {
                    domain,
                    retry_after_secs: retry_after,
                });
            }
            windows.global.push_back(now);
        }

        windows.domains.entry(domain).or_default().push_back(now);
        Ok(())
    }
}

fn evict(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

fn retry_after(hits: &VecDeque<Instant>, now: Instant, window: Duration) -> u64 {
    hits.front()
        .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
        .map(|wait| wait.as_secs() + u64::from(wait.subsec_nanos() > 0))
        .unwrap_or(0)
        .max(1)
}

/// Retry delays for a rate-limited job: doubling from one minute, stopping
/// before the total would pass one hour
pub fn backoff_schedule() -> Vec<Duration> {
    let mut schedule = Vec::new();
    let mut total = 0;
    let mut delay = BACKOFF_BASE_SECS;
    while total + delay <= BACKOFF_TOTAL_CAP_SECS {
        schedule.push(Duration::from_secs(delay));
        total += delay;
        delay *= 2;
    }
    schedule
}

/// Delay before retry number `attempt` (zero-based), `None` once the
/// schedule is exhausted
pub fn backoff_delay(attempt: usize) -> Option<Duration> {
    backoff_schedule().get(attempt).copied()
}
