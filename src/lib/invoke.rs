use std::fmt::Display;
use std::time::Duration;

use log::{debug, warn};

use super::backoff::*;
use super::classify::*;
use super::policy::*;

/// Longest error text, in characters, carried into a retry log record.
pub const LOG_ERROR_CHARS: usize = 200;

/// Invoke is a single blocking request to a remote model. Payload, options
/// and output pass through the invoker untouched.
pub trait Invoke<P: ?Sized, O: ?Sized = ()> {
    type Output;
    type Error;

    fn invoke(&mut self, payload: &P, options: &O) -> Result<Self::Output, Self::Error>;
}

impl<P: ?Sized, O: ?Sized, R, E, F> Invoke<P, O> for F
where
    F: FnMut(&P, &O) -> Result<R, E>,
{
    type Output = R;
    type Error = E;

    fn invoke(&mut self, payload: &P, options: &O) -> Result<R, E> {
        self(payload, options)
    }
}

/// Sleep blocks the calling thread between attempts.
pub trait Sleep {
    fn sleep(&mut self, wait: Duration);
}

/// ThreadSleep parks the current thread for the full wait. It cannot be
/// interrupted once started.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, wait: Duration) {
        std::thread::sleep(wait)
    }
}

impl<F: FnMut(Duration)> Sleep for F {
    fn sleep(&mut self, wait: Duration) {
        self(wait)
    }
}

/// RetryingInvoker calls a client until it succeeds, fails with an error the
/// classifier does not consider a rate limit, or runs out of retries.
///
/// Errors are always handed back exactly as the client produced them.
#[derive(Debug, Clone)]
pub struct RetryingInvoker<K = IndicatorClassifier, S = ThreadSleep> {
    policy: RetryPolicy,
    classifier: K,
    sleeper: S,
}

impl Default for RetryingInvoker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryingInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryingInvoker {
            policy,
            classifier: IndicatorClassifier::default(),
            sleeper: ThreadSleep,
        }
    }
}

impl<K, S> RetryingInvoker<K, S> {
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn with_classifier<K2>(self, classifier: K2) -> RetryingInvoker<K2, S> {
        RetryingInvoker {
            policy: self.policy,
            classifier,
            sleeper: self.sleeper,
        }
    }

    pub fn with_sleeper<S2: Sleep>(self, sleeper: S2) -> RetryingInvoker<K, S2> {
        RetryingInvoker {
            policy: self.policy,
            classifier: self.classifier,
            sleeper,
        }
    }

    pub fn invoke<C, P, O>(
        &mut self,
        client: &mut C,
        payload: &P,
        options: &O,
    ) -> Result<C::Output, C::Error>
    where
        C: Invoke<P, O>,
        C::Error: Display,
        P: ?Sized,
        O: ?Sized,
        K: Classify<C::Error>,
        S: Sleep,
    {
        let max_retries = self.policy.max_retries();
        let mut backoff = self.policy.backoff();
        let mut attempt = 0;

        loop {
            let err = match client.invoke(payload, options) {
                Ok(output) => {
                    if attempt > 0 {
                        debug!("call succeeded after {} retries", attempt);
                    }
                    return Ok(output);
                }
                Err(err) => err,
            };

            if !self.classifier.is_rate_limited(&err) || attempt >= max_retries {
                return Err(err);
            }

            let wait = backoff.wait();
            let error = err.to_string();
            warn!(
                attempt = attempt + 1,
                max_retries = max_retries,
                wait_seconds = wait.as_secs_f64(),
                error = truncate(&error, LOG_ERROR_CHARS);
                "Rate limit hit, retrying after backoff"
            );
            self.sleeper.sleep(wait);
            attempt += 1;
        }
    }
}

/// invoke_with_retry calls `client` under `policy`, retrying errors whose
/// text matches the default rate limit indicators and sleeping the calling
/// thread between attempts.
pub fn invoke_with_retry<C, P, O>(
    client: &mut C,
    payload: &P,
    options: &O,
    policy: &RetryPolicy,
) -> Result<C::Output, C::Error>
where
    C: Invoke<P, O>,
    C::Error: Display,
    P: ?Sized,
    O: ?Sized,
{
    RetryingInvoker::new(policy.clone()).invoke(client, payload, options)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
