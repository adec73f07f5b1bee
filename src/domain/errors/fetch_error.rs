//! Image resolution error types.

use thiserror::Error;

/// Transport-level failure reported by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Human-readable description.
    pub message: String,
    /// HTTP status code, when the server answered with a non-success status.
    pub status: Option<u16>,
}

impl TransportError {
    /// Creates a transport error without a status code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a transport error for an unsuccessful HTTP status.
    #[must_use]
    pub fn http_status(status: u16, reason: Option<&str>) -> Self {
        Self {
            message: format!("HTTP {status}: {}", reason.unwrap_or("Unknown")),
            status: Some(status),
        }
    }
}

/// Failure to turn a payload into an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// Terminal failures of a resolve call.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("invalid locator: {input:?}")]
    InvalidLocator { input: String },

    #[error("download failed: {cause}")]
    DownloadFailed {
        #[source]
        cause: TransportError,
    },

    #[error("failed to decode image: {reason}")]
    DecodeFailed { reason: String },

    #[error("resolve finished without producing an image or an error")]
    NoImageProduced,
}

impl FetchError {
    /// Creates invalid locator error.
    #[must_use]
    pub fn invalid_locator(input: impl Into<String>) -> Self {
        Self::InvalidLocator {
            input: input.into(),
        }
    }

    /// Creates decode failure.
    #[must_use]
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }

    /// Returns the transport cause, if this is a download failure.
    #[must_use]
    pub const fn transport_cause(&self) -> Option<&TransportError> {
        match self {
            Self::DownloadFailed { cause } => Some(cause),
            _ => None,
        }
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::DownloadFailed { .. })
    }
}

impl From<TransportError> for FetchError {
    fn from(cause: TransportError) -> Self {
        Self::DownloadFailed { cause }
    }
}

impl From<DecodeError> for FetchError {
    fn from(err: DecodeError) -> Self {
        Self::DecodeFailed { reason: err.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_download_failed_preserves_cause() {
        let err = FetchError::from(TransportError::http_status(404, Some("Not Found")));

        assert!(err.is_network_error());
        assert_eq!(err.transport_cause().and_then(|c| c.status), Some(404));
        assert_eq!(err.to_string(), "download failed: HTTP 404: Not Found");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_decode_error_conversion() {
        let err = FetchError::from(DecodeError("unsupported format".to_string()));
        assert!(matches!(err, FetchError::DecodeFailed { ref reason } if reason == "unsupported format"));
        assert!(!err.is_network_error());
    }
}
