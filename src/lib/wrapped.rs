use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

/// SourceLocation names the file and line a failure was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: i64,
}

impl SourceLocation {
    pub const UNKNOWN: SourceLocation = SourceLocation {
        file: "<unknown>",
        line: -1,
    };

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        SourceLocation {
            file: location.file(),
            line: i64::from(location.line()),
        }
    }
}

/// WrappedError normalizes a failure into a message, the location it came
/// from, and the rendered trace of the failure chain.
///
/// The location and trace are captured when the error is built and never
/// change afterwards. The wrapped failure stays reachable through
/// [`std::error::Error::source`].
pub struct WrappedError {
    message: String,
    location: SourceLocation,
    trace: String,
    source: Option<anyhow::Error>,
}

impl WrappedError {
    /// new builds an error from a message alone. There is no failure to
    /// inspect, so the location is unknown and the trace is empty.
    pub fn new<M: fmt::Display>(message: M) -> Self {
        WrappedError {
            message: message.to_string(),
            location: SourceLocation::UNKNOWN,
            trace: String::new(),
            source: None,
        }
    }

    /// wrap builds an error around `failure`, which becomes its source.
    ///
    /// The location is taken from the deepest `WrappedError` in the
    /// failure's source chain. Failures that never passed through a
    /// `WrappedError` are located at the caller of `wrap`.
    ///
    /// The trace opens with the failure's type name. An `anyhow::Error` has
    /// already erased its concrete type, so its trace starts with the
    /// failure chain instead.
    #[track_caller]
    pub fn wrap<M, E>(message: M, failure: E) -> Self
    where
        M: fmt::Display,
        E: Into<anyhow::Error>,
    {
        // closures do not inherit track_caller
        let caller = Location::caller();
        let kind = std::any::type_name::<E>();
        let failure = failure.into();

        let location = deepest_location(&failure).unwrap_or_else(|| SourceLocation::from(caller));
        let trace = if kind == std::any::type_name::<anyhow::Error>() {
            format!("{:?}", failure)
        } else {
            format!("{}: {:?}", kind, failure)
        };

        WrappedError {
            message: message.to_string(),
            location,
            trace,
            source: Some(failure),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn file(&self) -> &'static str {
        self.location.file
    }

    pub fn line(&self) -> i64 {
        self.location.line
    }

    /// trace is empty when the error was built without a failure.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// into_source hands back the wrapped failure, if there was one.
    pub fn into_source(self) -> Option<anyhow::Error> {
        self.source
    }
}

fn deepest_location(failure: &anyhow::Error) -> Option<SourceLocation> {
    failure
        .chain()
        .filter_map(|cause| cause.downcast_ref::<WrappedError>())
        .map(WrappedError::location)
        .filter(SourceLocation::is_known)
        .last()
}

impl fmt::Display for WrappedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Error in [{}] at line [{}] | Message: {}",
            self.location.file, self.location.line, self.message
        )?;
        if !self.trace.is_empty() {
            write!(f, "\nTraceback:\n{}", self.trace)?;
        }
        Ok(())
    }
}

impl fmt::Debug for WrappedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WrappedError")
            .field("file", &self.location.file)
            .field("line", &self.location.line)
            .field("message", &self.message)
            .finish()
    }
}

impl StdError for WrappedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| -> &(dyn StdError + 'static) { source.as_ref() })
    }
}

/// WrapErr converts the error side of a result into a [`WrappedError`]
/// located at the caller.
pub trait WrapErr<T> {
    fn wrap_err<M: fmt::Display>(self, message: M) -> Result<T, WrappedError>;

    fn wrap_err_with<M, F>(self, message: F) -> Result<T, WrappedError>
    where
        M: fmt::Display,
        F: FnOnce() -> M;
}

impl<T, E> WrapErr<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    #[track_caller]
    fn wrap_err<M: fmt::Display>(self, message: M) -> Result<T, WrappedError> {
        match self {
            Ok(value) => Ok(value),
            Err(failure) => Err(WrappedError::wrap(message, failure)),
        }
    }

    #[track_caller]
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, WrappedError>
    where
        M: fmt::Display,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(failure) => Err(WrappedError::wrap(message(), failure)),
        }
    }
}
