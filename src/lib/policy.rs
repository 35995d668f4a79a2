use std::time::Duration;

use derive_builder::Builder;

use super::backoff::*;
use super::errors::*;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Free-tier quotas typically reset within a minute, so start at a quarter of that.
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(15);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);

/// RetryPolicy bounds how often and how patiently a rate limited call is retried.
///
/// A policy allows `max_retries + 1` attempts in total. The wait before retry
/// `n` (zero based) is `min(initial_wait * backoff_multiplier^n, max_wait)`.
/// Policies only come out of the builder or `Default`, so they are always valid.
#[derive(Debug, Builder, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct RetryPolicy {
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    max_retries: u32,

    #[builder(default = "DEFAULT_INITIAL_WAIT")]
    initial_wait: Duration,

    #[builder(default = "DEFAULT_BACKOFF_MULTIPLIER")]
    backoff_multiplier: f64,

    #[builder(default = "DEFAULT_MAX_WAIT")]
    max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_wait: DEFAULT_INITIAL_WAIT,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl RetryPolicyBuilder {
    // The backoff builder owns the rules for the timing parameters.
    fn validate(&self) -> std::result::Result<(), String> {
        ExponentialBackoffBuilder::default()
            .factor(self.backoff_multiplier.unwrap_or(DEFAULT_BACKOFF_MULTIPLIER))
            .initial(self.initial_wait.unwrap_or(DEFAULT_INITIAL_WAIT))
            .max(self.max_wait.unwrap_or(DEFAULT_MAX_WAIT))
            .build()
            .map(|_| ())
    }

    /// finish builds the policy, reporting bad parameters as a PolicyError.
    pub fn finish(&self) -> std::result::Result<RetryPolicy, PolicyError> {
        self.build().map_err(PolicyError::from)
    }
}

impl RetryPolicy {
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial_wait(&self) -> Duration {
        self.initial_wait
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// backoff returns a fresh schedule positioned at `initial_wait`.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.backoff_multiplier, self.initial_wait, self.max_wait)
    }

    /// waits lists every delay an invocation that keeps hitting the rate
    /// limit would sleep for, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.backoff().take(self.max_retries as usize).collect()
    }
}
