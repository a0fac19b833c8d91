use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay schedule between retries. Delays never decrease until `reset`.
pub trait Backoff: Send {
    fn next_delay(&mut self) -> Duration;

    fn reset(&mut self);

    fn current_attempt(&self) -> u32;
}

pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            current_attempt: 0,
        }
    }

    /// Multipliers below 1.0 are clamped to 1.0 to keep delays non-decreasing
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = if self.current_attempt == 0 {
            self.initial.min(self.max)
        } else {
            let multiplier = self.multiplier.powi(self.current_attempt as i32);
            let delay_ms = self.initial.as_millis() as f64 * multiplier;
            let delay_ms = delay_ms.min(self.max.as_millis() as f64);
            Duration::from_millis(delay_ms as u64)
        };

        self.current_attempt = self.current_attempt.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }

    fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30))
    }
}

/// `initial + step * attempt`, capped at `max`
pub struct LinearBackoff {
    initial: Duration,
    step: Duration,
    max: Duration,
    current_attempt: u32,
}

impl LinearBackoff {
    pub fn new(initial: Duration, step: Duration, max: Duration) -> Self {
        Self {
            initial,
            step,
            max,
            current_attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self
            .initial
            .saturating_add(self.step.saturating_mul(self.current_attempt))
            .min(self.max);
        self.current_attempt = self.current_attempt.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }

    fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

/// Serializable backoff choice; `build` produces a fresh schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum BackoffPolicy {
    Linear {
        initial_ms: u64,
        step_ms: u64,
        max_ms: u64,
    },
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl BackoffPolicy {
    pub fn build(&self) -> Box<dyn Backoff> {
        match *self {
            BackoffPolicy::Linear {
                initial_ms,
                step_ms,
                max_ms,
            } => Box::new(LinearBackoff::new(
                Duration::from_millis(initial_ms),
                Duration::from_millis(step_ms),
                Duration::from_millis(max_ms),
            )),
            BackoffPolicy::Exponential {
                initial_ms,
                max_ms,
                multiplier,
            } => Box::new(
                ExponentialBackoff::new(
                    Duration::from_millis(initial_ms),
                    Duration::from_millis(max_ms),
                )
                .with_multiplier(multiplier),
            ),
        }
    }

    pub fn max_delay(&self) -> Duration {
        match self {
            BackoffPolicy::Linear { max_ms, .. } | BackoffPolicy::Exponential { max_ms, .. } => {
                Duration::from_millis(*max_ms)
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            initial_ms: 500,
            max_ms: 10_000,
            multiplier: default_multiplier(),
        }
    }
}
