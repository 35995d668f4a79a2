//! Helpers for calling rate limited language model APIs.
//!
//! [`wrapped::WrappedError`] normalizes a failure into a message, the
//! location it came from and a rendered trace. [`invoke::RetryingInvoker`]
//! retries a blocking client call with exponential backoff while the client
//! keeps reporting rate limit or quota errors.

pub mod backoff;
pub mod classify;
pub mod errors;
pub mod invoke;
pub mod policy;
pub mod wrapped;

pub mod prelude {
    pub use super::backoff::{Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
    pub use super::classify::{is_rate_limit_error, Classify, IndicatorClassifier};
    pub use super::errors::PolicyError;
    pub use super::invoke::{invoke_with_retry, Invoke, RetryingInvoker, Sleep, ThreadSleep};
    pub use super::policy::{RetryPolicy, RetryPolicyBuilder};
    pub use super::wrapped::{SourceLocation, WrapErr, WrappedError};
}
