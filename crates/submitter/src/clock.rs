use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time source for expiry checks and retry delays
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds
    fn now_unix(&self) -> u64;

    /// Current Unix time in milliseconds
    fn now_millis(&self) -> u64 {
        self.now_unix().saturating_mul(1000)
    }

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        self.now_millis() / 1000
    }

    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: `sleep` returns at once after advancing time by the
/// requested amount. Every requested delay is recorded.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(now_unix: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_unix.saturating_mul(1000)),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_unix(&self, now_unix: u64) {
        self.now_ms
            .store(now_unix.saturating_mul(1000), Ordering::SeqCst);
    }

    /// Delays requested through `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        match self.sleeps.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now_millis() / 1000
    }

    fn now_millis(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        match self.sleeps.lock() {
            Ok(mut guard) => guard.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new(1_000);
        clock.sleep(Duration::from_millis(1_500)).await;
        clock.sleep(Duration::from_millis(600)).await;

        assert_eq!(clock.now_millis(), 1_002_100);
        assert_eq!(clock.now_unix(), 1_002);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(1_500), Duration::from_millis(600)]
        );
        assert_eq!(clock.total_slept(), Duration::from_millis(2_100));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new(0);
        clock.set_unix(42);
        assert_eq!(clock.now_unix(), 42);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01
        assert!(SystemClock.now_unix() > 1_577_836_800);
    }
}
