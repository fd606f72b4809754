//! Error types for the backend client

use compact_str::{CompactString, ToCompactString};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors produced by the backend API client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not complete within the configured timeout
    #[error("Request timeout - please check your connection")]
    Timeout,

    /// The backend could not be reached at the transport level
    #[error("Unable to connect to server - please check if the backend is running")]
    Network {
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The backend answered with a non-success status
    ///
    /// `message` is the text mined from the response body, or the
    /// `HTTP <status>: <reason>` fallback when the body had nothing usable.
    #[error("{message}")]
    Http { status: u16, message: CompactString },

    /// A success response carried a body that could not be decoded
    #[error("Invalid response from {endpoint}: {message}")]
    Parse {
        endpoint: CompactString,
        message: CompactString,
    },

    /// Client configuration failed validation
    #[error("Invalid configuration: {field}: {message}")]
    ConfigValidation {
        field: CompactString,
        message: CompactString,
    },

    /// Anything that does not fit the categories above
    #[error("{message}")]
    Unknown { message: CompactString },
}

impl ClientError {
    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<CompactString>) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// Create a response parse error
    pub fn parse(endpoint: impl Into<CompactString>, message: impl Into<CompactString>) -> Self {
        Self::Parse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a configuration validation error
    pub fn config_validation(
        field: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an uncategorized error
    pub fn unknown(message: impl Into<CompactString>) -> Self {
        Self::Unknown { message: message.into() }
    }

    /// Coarse classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Timeout => ErrorKind::Timeout,
            ClientError::Network { .. } => ErrorKind::Network,
            ClientError::Http { status, .. } => ErrorKind::HttpStatus(*status),
            ClientError::Parse { .. } => ErrorKind::Parse,
            ClientError::ConfigValidation { .. } => ErrorKind::Config,
            ClientError::Unknown { .. } => ErrorKind::Unknown,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_builder() {
            ClientError::Unknown { message: e.to_compact_string() }
        } else {
            ClientError::Network { source: Some(e) }
        }
    }
}

/// Classification label attached to surfaced errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Network,
    HttpStatus(u16),
    Parse,
    Config,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::HttpStatus(status) => write!(f, "http_status:{status}"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Cloneable error surface published through watch state
///
/// `ClientError` carries non-cloneable reqwest sources, so watchers and
/// mutations publish this flattened form instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: CompactString,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<CompactString>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<&ClientError> for ErrorInfo {
    fn from(err: &ClientError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_compact_string(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
        assert_eq!(ErrorKind::Network.to_string(), "network");
        assert_eq!(ErrorKind::HttpStatus(404).to_string(), "http_status:404");
        assert_eq!(ErrorKind::Parse.to_string(), "parse");
        assert_eq!(ErrorKind::Unknown.to_string(), "unknown");
    }

    #[test]
    fn error_info_keeps_http_message_verbatim() {
        let err = ClientError::http(404, "Not found");
        let info = ErrorInfo::from(&err);
        assert_eq!(info.kind, ErrorKind::HttpStatus(404));
        assert_eq!(info.message, "Not found");
    }

    #[test]
    fn timeout_message_matches_contract() {
        assert_eq!(
            ClientError::Timeout.to_string(),
            "Request timeout - please check your connection"
        );
        assert_eq!(
            ClientError::Network { source: None }.to_string(),
            "Unable to connect to server - please check if the backend is running"
        );
    }
}
