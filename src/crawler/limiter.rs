//! Per-worker token-bucket rate limiter
//!
//! Each worker owns an independent bucket so a slow endpoint gates only the
//! worker talking to it. Capacity `burst` tokens, one token refilled per
//! `refill_interval`, never exceeding capacity.

use std::time::Duration;
use tokio::time::Instant;

/// Token bucket gating outbound request frequency
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a bucket with `capacity` tokens, all initially available
    ///
    /// A zero capacity is clamped to 1; config validation rejects it
    /// earlier, this is the last line of defense for direct construction.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        if self.refill_interval.is_zero() {
            self.tokens = self.capacity;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = (elapsed.as_nanos() / self.refill_interval.as_nanos()) as u32;
        if earned == 0 {
            return;
        }

        self.tokens = self.tokens.saturating_add(earned).min(self.capacity);
        if self.tokens == self.capacity {
            // A full bucket accrues no credit
            self.last_refill = now;
        } else {
            self.last_refill += self.refill_interval * earned;
        }
    }

    /// Takes a token if one is available
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks until a token is available
    ///
    /// Sleeps in `refill_interval` increments rather than spinning.
    pub async fn wait(&mut self) {
        loop {
            if self.allow() {
                return;
            }
            tokio::time::sleep(self.refill_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn initial_window_never_exceeds_capacity() {
        let mut bucket = TokenBucket::new(3, INTERVAL);
        let now = Instant::now();

        assert!(bucket.allow_at(now));
        assert!(bucket.allow_at(now));
        assert!(bucket.allow_at(now));
        // Fourth approval inside the same window must be denied
        assert!(!bucket.allow_at(now));
        assert!(!bucket.allow_at(now + INTERVAL / 2));
    }

    #[test]
    fn one_token_per_interval() {
        let mut bucket = TokenBucket::new(2, INTERVAL);
        let now = Instant::now();

        assert!(bucket.allow_at(now));
        assert!(bucket.allow_at(now));
        assert!(!bucket.allow_at(now));

        assert!(bucket.allow_at(now + INTERVAL));
        assert!(!bucket.allow_at(now + INTERVAL));
    }

    #[test]
    fn tokens_never_exceed_capacity() {
        let mut bucket = TokenBucket::new(2, INTERVAL);
        let now = Instant::now();

        // Long idle period must not bank more than `capacity` tokens
        let later = now + INTERVAL * 100;
        assert!(bucket.allow_at(later));
        assert!(bucket.allow_at(later));
        assert!(!bucket.allow_at(later));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut bucket = TokenBucket::new(0, INTERVAL);
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_after_refill() {
        let mut bucket = TokenBucket::new(1, INTERVAL);

        bucket.wait().await;
        // Bucket is now empty; the next wait must sleep at least one interval
        let before = tokio::time::Instant::now();
        bucket.wait().await;
        assert!(before.elapsed() >= INTERVAL);
    }
}
