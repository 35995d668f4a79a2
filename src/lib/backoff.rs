use std::time::Duration;

use derive_builder::Builder;
use log::trace;

use super::errors::*;

/// The Backoff trait provides a method to return
/// how long to back off when called.
pub trait Backoff {
    fn wait(&mut self) -> Duration;
    fn reset(&mut self);
}

/// ExponentialBackoff hands out `initial`, then multiplies the delay by
/// `factor` on every call to wait, never exceeding `max`.
#[derive(Debug, Builder, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ExponentialBackoff {
    #[builder(default = "2.0")]
    factor: f64,
    initial: Duration,
    max: Duration,

    #[builder(setter(skip))]
    #[builder(default = "self.initial.unwrap_or_default()")]
    current: Duration,
}

impl ExponentialBackoffBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(factor) = self.factor {
            if !factor.is_finite() || factor <= 1.0 {
                return Err(format!(
                    "backoff factor must be a finite number greater than 1, got {}",
                    factor
                ));
            }
        }
        if let Some(initial) = self.initial {
            if initial == Duration::from_secs(0) {
                return Err("initial backoff must be greater than zero".to_string());
            }
            if let Some(max) = self.max {
                if max < initial {
                    return Err(format!(
                        "max backoff {:?} is shorter than initial backoff {:?}",
                        max, initial
                    ));
                }
            }
        }
        Ok(())
    }

    /// finish builds the backoff, reporting bad parameters as a PolicyError.
    pub fn finish(&self) -> std::result::Result<ExponentialBackoff, PolicyError> {
        self.build().map_err(PolicyError::from)
    }
}

impl ExponentialBackoff {
    /// new skips the builder's checks; callers hand in already validated values.
    pub(crate) fn new(factor: f64, initial: Duration, max: Duration) -> Self {
        ExponentialBackoff {
            factor,
            initial,
            max,
            current: initial,
        }
    }

    /// peek returns the delay the next call to wait will hand out.
    pub fn peek(&self) -> Duration {
        self.current
    }
}

impl Backoff for ExponentialBackoff {
    fn wait(&mut self) -> Duration {
        let wait = self.current;
        // Stay in f64 until capped; Duration::mul_f64 panics on overflow.
        let next = self.current.as_secs_f64() * self.factor;
        self.current = if next < self.max.as_secs_f64() {
            Duration::from_secs_f64(next)
        } else {
            self.max
        };
        trace!("backoff handing out {:?}, next {:?}", wait, self.current);
        wait
    }

    fn reset(&mut self) {
        self.current = self.initial
    }
}

/// Iterating an ExponentialBackoff yields its delays forever.
impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut ExponentialBackoff, n: usize) -> Vec<u64> {
        backoff.take(n).map(|d| d.as_secs()).collect()
    }

    #[test]
    fn doubles_until_capped() {
        let mut backoff = ExponentialBackoffBuilder::default()
            .initial(Duration::from_secs(15))
            .max(Duration::from_secs(120))
            .finish()
            .unwrap();

        assert_eq!(secs(&mut backoff, 6), vec![15, 30, 60, 120, 120, 120]);
    }

    #[test]
    fn reset_restarts_from_initial() {
        let mut backoff = ExponentialBackoffBuilder::default()
            .factor(3.0)
            .initial(Duration::from_millis(100))
            .max(Duration::from_secs(10))
            .finish()
            .unwrap();

        assert_eq!(backoff.wait(), Duration::from_millis(100));
        assert_eq!(backoff.wait(), Duration::from_millis(300));
        backoff.reset();
        assert_eq!(backoff.peek(), Duration::from_millis(100));
    }

    #[test]
    fn huge_factor_jumps_straight_to_cap() {
        let mut backoff = ExponentialBackoffBuilder::default()
            .factor(1e19)
            .initial(Duration::from_secs(15))
            .max(Duration::from_secs(120))
            .finish()
            .unwrap();

        assert_eq!(secs(&mut backoff, 3), vec![15, 120, 120]);
    }

    #[test]
    fn caps_near_the_largest_duration() {
        let max = Duration::new(u64::MAX, 0);
        let mut backoff = ExponentialBackoffBuilder::default()
            .factor(1000.0)
            .initial(Duration::from_secs(u64::MAX / 10))
            .max(max)
            .finish()
            .unwrap();

        backoff.wait();
        assert_eq!(backoff.wait(), max);
        assert_eq!(backoff.wait(), max);
    }

    #[test]
    fn rejects_bad_parameters() {
        let flat = ExponentialBackoffBuilder::default()
            .factor(1.0)
            .initial(Duration::from_secs(1))
            .max(Duration::from_secs(2))
            .finish();
        assert!(matches!(flat, Err(PolicyError::InvalidPolicy { .. })));

        let inverted = ExponentialBackoffBuilder::default()
            .initial(Duration::from_secs(10))
            .max(Duration::from_secs(2))
            .finish();
        assert!(inverted.is_err());

        let zero = ExponentialBackoffBuilder::default()
            .initial(Duration::from_secs(0))
            .max(Duration::from_secs(2))
            .finish();
        assert!(zero.is_err());

        for factor in &[f64::INFINITY, f64::NAN] {
            let non_finite = ExponentialBackoffBuilder::default()
                .factor(*factor)
                .initial(Duration::from_secs(1))
                .max(Duration::from_secs(2))
                .finish();
            assert!(non_finite.is_err(), "factor {} accepted", factor);
        }

        let missing = ExponentialBackoffBuilder::default()
            .initial(Duration::from_secs(1))
            .finish();
        assert!(missing.is_err());
    }
}
