use std::error::Error;
use std::fmt;

/// Message the desktop app sends when its own write deadline expired. The
/// write may still have landed.
pub const RESPONSE_TIMEOUT_MESSAGE: &str = "Response timeout";

#[derive(Debug)]
pub enum ApiError {
    Authentication(String),
    RateLimit(String),
    Validation(String),
    NotFound(String),
    LocalApi(String),
    DesktopNotRunning(String),
    Server(String),
    Status {
        status: u16,
        body: String,
    },
    Transport {
        context: String,
        source: Box<ureq::Error>,
    },
    Decode {
        context: &'static str,
        source: serde_json::Error,
    },
    Redirect(String),
    /// Well-formed exchange with an unusable outcome.
    Protocol(String),
    BatchRecord {
        index: usize,
        message: String,
    },
    BatchAction {
        index: usize,
        source: Box<ApiError>,
    },
    Cancelled,
    Io(std::io::Error),
    InvalidArgument(String),
}

impl ApiError {
    pub fn is_response_timeout(&self) -> bool {
        match self {
            ApiError::LocalApi(message) => message == RESPONSE_TIMEOUT_MESSAGE,
            _ => false,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimit(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub(crate) fn transport(context: impl Into<String>, source: ureq::Error) -> Self {
        ApiError::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn decode(context: &'static str, source: serde_json::Error) -> Self {
        ApiError::Decode { context, source }
    }

    pub(crate) fn batch_record(index: usize, message: impl Into<String>) -> Self {
        ApiError::BatchRecord {
            index,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Authentication(message) => write!(f, "{}", message),
            ApiError::RateLimit(message) => write!(f, "{}", message),
            ApiError::Validation(message) => write!(f, "{}", message),
            ApiError::NotFound(message) => write!(f, "{}", message),
            ApiError::LocalApi(message) => write!(f, "{}", message),
            ApiError::DesktopNotRunning(message) => write!(f, "{}", message),
            ApiError::Server(body) => write!(f, "server error: {}", body),
            ApiError::Status { status, body } => {
                write!(f, "API error (status {}): {}", status, body)
            }
            ApiError::Transport { context, source } => write!(f, "{}: {}", context, source),
            ApiError::Decode { context, source } => {
                write!(f, "failed to parse {}: {}", context, source)
            }
            ApiError::Redirect(message) => write!(f, "{}", message),
            ApiError::Protocol(message) => write!(f, "{}", message),
            ApiError::BatchRecord { index, message } => {
                write!(f, "batch action {}: {}", index, message)
            }
            ApiError::BatchAction { index, source } => {
                write!(f, "batch action {} failed: {}", index, source)
            }
            ApiError::Cancelled => write!(f, "request cancelled"),
            ApiError::Io(err) => write!(f, "I/O error: {}", err),
            ApiError::InvalidArgument(message) => write!(f, "{}", message),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Transport { source, .. } => Some(source.as_ref()),
            ApiError::Decode { source, .. } => Some(source),
            ApiError::BatchAction { source, .. } => Some(source.as_ref()),
            ApiError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        ApiError::Io(value)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
