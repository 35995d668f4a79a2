use std::fmt::Display;

/// Substrings that mark an error as a rate limit or quota rejection.
/// Matched case-insensitively against the error's display text.
pub const DEFAULT_RATE_LIMIT_INDICATORS: &[&str] = &[
    "ResourceExhausted",
    "429",
    "quota",
    "rate_limit",
    "RESOURCE_EXHAUSTED",
    "Too Many Requests",
];

/// Classify decides whether a failed attempt was rejected by a rate limit
/// and is therefore worth retrying after a backoff.
pub trait Classify<E: ?Sized> {
    fn is_rate_limited(&self, error: &E) -> bool;
}

/// Any predicate over the error works as a classifier, which lets callers
/// whose client exposes structured error codes skip text matching entirely.
impl<E: ?Sized, F> Classify<E> for F
where
    F: Fn(&E) -> bool,
{
    fn is_rate_limited(&self, error: &E) -> bool {
        self(error)
    }
}

/// IndicatorClassifier matches an error's display text against a list of
/// indicator substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorClassifier {
    // stored lowercased
    indicators: Vec<String>,
}

impl Default for IndicatorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_INDICATORS.iter().copied())
    }
}

impl IndicatorClassifier {
    pub fn new<I, S>(indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        IndicatorClassifier {
            indicators: indicators
                .into_iter()
                .map(|i| i.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn with_indicator<S: AsRef<str>>(mut self, indicator: S) -> Self {
        self.indicators.push(indicator.as_ref().to_lowercase());
        self
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.indicators.iter().any(|i| text.contains(i.as_str()))
    }
}

impl<E: Display + ?Sized> Classify<E> for IndicatorClassifier {
    fn is_rate_limited(&self, error: &E) -> bool {
        self.matches(&error.to_string())
    }
}

/// is_rate_limit_error checks an error against the default indicators.
pub fn is_rate_limit_error<E: Display + ?Sized>(error: &E) -> bool {
    IndicatorClassifier::default().is_rate_limited(error)
}
