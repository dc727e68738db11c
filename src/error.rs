use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

/// HTTP method type, re-exported for use with error inspection.
pub use reqwest::Method;
/// HTTP status code type, re-exported for use with error inspection.
pub use reqwest::StatusCode;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Invalid endpoint descriptor or unserializable payload; never retried
    Construction,
    /// Missing or empty credentials; never retried
    Credentials,
    /// Network-level failure before an HTTP status was received
    Transport,
    /// Non-success HTTP status with a populated API diagnostic
    Status,
    /// Malformed JSON where a well-formed body was required; never retried
    Decode,
    /// Fault while reading a streaming response body
    Stream,
}

impl Kind {
    /// Whether an error of this kind is a candidate for another attempt.
    /// The retry policy and attempt budget still have the final say.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transport | Self::Status | Self::Stream)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    status_code: Option<StatusCode>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            status_code: None,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The HTTP status of the response that produced this error, when one
    /// was received at all. Transport failures carry no status.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status_code
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn construction<S: Into<String>>(reason: S) -> Self {
        Construction {
            reason: reason.into(),
        }
        .into()
    }

    #[must_use]
    pub fn credentials() -> Self {
        EmptyCredentials.into()
    }

    pub fn transport<S: StdError + Send + Sync + 'static>(source: S) -> Self {
        Self::with_source(Kind::Transport, source)
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        let mut error: Self = Status {
            status_code,
            method,
            path,
            message: message.into(),
        }
        .into();
        error.status_code = Some(status_code);
        error
    }

    pub fn decode(status_code: Option<StatusCode>, source: serde_json::Error) -> Self {
        let mut error = Self::with_source(Kind::Decode, source);
        error.status_code = status_code;
        error
    }

    pub fn stream<S: Into<String>>(reason: S) -> Self {
        StreamFault {
            reason: reason.into(),
        }
        .into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Bad endpoint descriptor or payload that could not be serialized.
#[non_exhaustive]
#[derive(Debug)]
pub struct Construction {
    pub reason: String,
}

impl fmt::Display for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Construction {}

/// Credentials were configured with an empty bearer token, or not at all.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct EmptyCredentials;

impl fmt::Display for EmptyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmptyCredentials: credentials value is empty")
    }
}

impl StdError for EmptyCredentials {}

/// Non-success HTTP response carrying a populated API diagnostic.
#[non_exhaustive]
#[derive(Debug)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error({}) making {} call to {} with {}",
            self.status_code, self.method, self.path, self.message
        )
    }
}

impl StdError for Status {}

/// Fault encountered while reading records off a streaming response body.
#[non_exhaustive]
#[derive(Debug)]
pub struct StreamFault {
    pub reason: String,
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream fault: {}", self.reason)
    }
}

impl StdError for StreamFault {}

impl From<Construction> for Error {
    fn from(err: Construction) -> Self {
        Error::with_source(Kind::Construction, err)
    }
}

impl From<EmptyCredentials> for Error {
    fn from(err: EmptyCredentials) -> Self {
        Error::with_source(Kind::Credentials, err)
    }
}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

impl From<StreamFault> for Error {
    fn from(err: StreamFault) -> Self {
        Error::with_source(Kind::Stream, err)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Construction, e)
    }
}
