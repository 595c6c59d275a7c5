//! Error types for the Composer client.
//!
//! Every network call, every decoded frame and every send resolves to a
//! [`Result`] so that failures reach the conversation instead of vanishing.

use std::error;
use std::fmt;
use std::sync::Arc;

/// The main error type for the Composer client.
#[derive(Clone, Debug)]
pub enum Error {
    /// The server refused to create a chat session.
    SessionCreationFailed {
        /// Human-readable error message.
        message: String,
        /// HTTP status code, when the server answered at all.
        status_code: Option<u16>,
    },

    /// The server refused a submitted message, or the submit never reached it.
    MessageSubmitFailed {
        /// Human-readable error message.
        message: String,
        /// HTTP status code, when the server answered at all.
        status_code: Option<u16>,
    },

    /// A non-blank stream segment could not be parsed as a frame.
    MalformedFrame {
        /// Human-readable error message.
        message: String,
        /// The offending segment, lossily decoded.
        segment: String,
        /// The underlying parse error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A generic API error occurred.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// Request timed out.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The send was cancelled by the caller.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Invalid configuration or argument.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// The response body failed while it was being read.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new session creation error.
    pub fn session_creation_failed(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Error::SessionCreationFailed {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new message submit error.
    pub fn message_submit_failed(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Error::MessageSubmitFailed {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new malformed frame error.
    pub fn malformed_frame(
        message: impl Into<String>,
        segment: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::MalformedFrame {
            message: message.into(),
            segment: segment.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new API error.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if session creation failed.
    pub fn is_session_creation_failed(&self) -> bool {
        matches!(self, Error::SessionCreationFailed { .. })
    }

    /// Returns true if a message submit failed.
    pub fn is_message_submit_failed(&self) -> bool {
        matches!(self, Error::MessageSubmitFailed { .. })
    }

    /// Returns true if this error came from a single unparseable frame.
    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, Error::MalformedFrame { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is an abort.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::SessionCreationFailed { status_code, .. } => *status_code,
            Error::MessageSubmitFailed { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SessionCreationFailed {
                message,
                status_code,
            } => {
                if let Some(status_code) = status_code {
                    write!(f, "Session creation failed: {message} (HTTP {status_code})")
                } else {
                    write!(f, "Session creation failed: {message}")
                }
            }
            Error::MessageSubmitFailed {
                message,
                status_code,
            } => {
                if let Some(status_code) = status_code {
                    write!(f, "Message submit failed: {message} (HTTP {status_code})")
                } else {
                    write!(f, "Message submit failed: {message}")
                }
            }
            Error::MalformedFrame {
                message, segment, ..
            } => {
                write!(f, "Malformed frame: {message} in '{segment}'")
            }
            Error::Api {
                status_code,
                message,
            } => {
                write!(f, "API error: {message} (HTTP {status_code})")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Abort { message } => {
                write!(f, "Request aborted: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::MalformedFrame { source, .. }
            | Error::Connection { source, .. }
            | Error::Serialization { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for Composer operations.
pub type Result<T> = std::result::Result<T, Error>;
