use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded for key: {0}")]
    LimitExceeded(String),
    #[error("Invalid rate limit configuration")]
    InvalidConfig,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

struct BucketState {
    tokens: u32,
    last_refill_ms: u64,
}

/// Token bucket with millisecond refill.
///
/// Every operation has an `_at` variant taking the current time in
/// milliseconds so callers with their own clock can drive it.
pub struct TokenBucket {
    capacity: u32,
    refill_rate: u32, // tokens per second
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self::new_at(capacity, refill_rate, now_millis())
    }

    pub fn new_at(capacity: u32, refill_rate: u32, now_ms: u64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill_ms: now_ms,
            }),
        }
    }

    fn refill(&self, state: &mut BucketState, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(state.last_refill_ms);
        if elapsed == 0 || self.refill_rate == 0 {
            return;
        }

        let tokens_to_add = elapsed.saturating_mul(u64::from(self.refill_rate)) / 1000;
        if tokens_to_add == 0 {
            return;
        }

        // only advance by the time actually converted into tokens
        let consumed_ms = tokens_to_add * 1000 / u64::from(self.refill_rate);
        state.last_refill_ms += consumed_ms;
        let tokens = u64::from(state.tokens).saturating_add(tokens_to_add);
        state.tokens = tokens.min(u64::from(self.capacity)) as u32;
        if state.tokens == self.capacity {
            state.last_refill_ms = now_ms;
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(now_millis())
    }

    pub fn try_acquire_at(&self, now_ms: u64) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.refill(&mut state, now_ms);
        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_at(now_millis())
    }

    pub fn remaining_at(&self, now_ms: u64) -> u32 {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.refill(&mut state, now_ms);
        state.tokens
    }

    /// How long until the next token is available; zero if one is available now
    pub fn wait_time_at(&self, now_ms: u64) -> Duration {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.refill(&mut state, now_ms);
        if state.tokens > 0 {
            return Duration::ZERO;
        }
        if self.refill_rate == 0 {
            return Duration::MAX;
        }
        let per_token_ms = 1000u64.div_ceil(u64::from(self.refill_rate));
        let since_refill = now_ms.saturating_sub(state.last_refill_ms);
        Duration::from_millis(per_token_ms.saturating_sub(since_refill).max(1))
    }
}

/// Named token buckets, one per request class
pub struct RateLimiter {
    limits: HashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            limits: HashMap::new(),
        }
    }

    /// Add a bucket refilling at `requests_per_second` with `burst` capacity
    pub fn with_limit(self, key: &str, requests_per_second: u32, burst: u32) -> Self {
        self.with_limit_at(key, requests_per_second, burst, now_millis())
    }

    pub fn with_limit_at(mut self, key: &str, requests_per_second: u32, burst: u32, now_ms: u64) -> Self {
        self.limits.insert(
            key.to_string(),
            TokenBucket::new_at(burst.max(1), requests_per_second, now_ms),
        );
        self
    }

    pub fn acquire(&self, key: &str) -> Result<(), RateLimitError> {
        if self.try_acquire(key) {
            Ok(())
        } else {
            Err(RateLimitError::LimitExceeded(key.to_string()))
        }
    }

    pub fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_at(key, now_millis())
    }

    pub fn try_acquire_at(&self, key: &str, now_ms: u64) -> bool {
        match self.limits.get(key) {
            Some(bucket) => bucket.try_acquire_at(now_ms),
            // No limit configured, allow
            None => true,
        }
    }

    pub fn wait_time_at(&self, key: &str, now_ms: u64) -> Duration {
        self.limits
            .get(key)
            .map_or(Duration::ZERO, |bucket| bucket.wait_time_at(now_ms))
    }

    pub fn remaining_at(&self, key: &str, now_ms: u64) -> u32 {
        self.limits
            .get(key)
            .map_or(u32::MAX, |bucket| bucket.remaining_at(now_ms))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
