//! Rate limiter for outbound Telegram sends.
//!
//! Enforces a minimum interval between sends and honours server-side
//! flood waits by pushing the next allowed send further into the future.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rate limiter that tracks the next instant a send is allowed.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between sends.
    min_interval: Duration,

    /// Earliest instant the next send may happen.
    next_allowed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// Creates a rate limiter from seconds.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Waits until a send is allowed, then reserves the next slot.
    ///
    /// Returns the duration waited (zero if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut next = self.next_allowed.lock().await;

        let now = Instant::now();
        let wait_duration = match *next {
            Some(deadline) if deadline > now => deadline - now,
            _ => Duration::ZERO,
        };

        if !wait_duration.is_zero() {
            debug!("Rate limiter: waiting {:?} before next send", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *next = Some(Instant::now() + self.min_interval);
        wait_duration
    }

    /// Checks if a send is currently allowed without blocking.
    pub async fn is_allowed(&self) -> bool {
        let next = self.next_allowed.lock().await;
        match *next {
            Some(deadline) => Instant::now() >= deadline,
            None => true,
        }
    }

    /// Returns the time remaining until the next send is allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        let next = self.next_allowed.lock().await;
        match *next {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Pushes the next allowed send at least `penalty` into the future.
    ///
    /// Used when Telegram answers with a flood wait.
    pub async fn penalize(&self, penalty: Duration) {
        warn!("Rate limiter penalty applied: {:?}", penalty);
        let mut next = self.next_allowed.lock().await;
        let candidate = Instant::now() + penalty;
        *next = Some(match *next {
            Some(deadline) if deadline > candidate => deadline,
            _ => candidate,
        });
    }

    /// Resets the rate limiter, allowing an immediate send.
    pub async fn reset(&self) {
        let mut next = self.next_allowed.lock().await;
        *next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_send_is_free() {
        let limiter = RateLimiter::from_secs(1);
        assert!(limiter.is_allowed().await);

        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_subsequent_send_is_throttled() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        limiter.wait_and_acquire().await;

        assert!(!limiter.is_allowed().await);
        assert!(limiter.time_until_allowed().await > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_penalty_extends_deadline() {
        let limiter = RateLimiter::new(Duration::from_millis(10));

        limiter.wait_and_acquire().await;
        limiter.penalize(Duration::from_secs(60)).await;

        assert!(limiter.time_until_allowed().await > Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_penalty_never_shortens_deadline() {
        let limiter = RateLimiter::new(Duration::from_secs(120));

        limiter.wait_and_acquire().await;
        limiter.penalize(Duration::from_secs(1)).await;

        assert!(limiter.time_until_allowed().await > Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_reset() {
        let limiter = RateLimiter::new(Duration::from_secs(60));

        limiter.wait_and_acquire().await;
        assert!(!limiter.is_allowed().await);

        limiter.reset().await;
        assert!(limiter.is_allowed().await);
    }
}
