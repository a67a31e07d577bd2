/*!
 * Error types for the po-translate application.
 *
 * Each failure class has its own type so the pipeline can decide, per class,
 * whether to retry, isolate the failure to a unit or batch, or abort a file.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a translation backend for a whole batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The backend asked us to slow down (HTTP 429 or equivalent)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Missing, invalid or revoked credentials
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Connection failure, timeout or server-side error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The backend refused the request (unsupported language pair, quota, bad request)
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// The backend answered but the body could not be mapped back onto the request
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Discriminant of a [`ServiceError`], used in reports and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    RateLimited,
    AuthFailed,
    NetworkError,
    Unsupported,
    Malformed,
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RateLimited => "rate-limited",
            Self::AuthFailed => "auth-failed",
            Self::NetworkError => "network-error",
            Self::Unsupported => "unsupported",
            Self::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

impl ServiceError {
    /// Build an error of the given class
    pub fn of_kind(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ServiceErrorKind::RateLimited => Self::RateLimited(message),
            ServiceErrorKind::AuthFailed => Self::AuthFailed(message),
            ServiceErrorKind::NetworkError => Self::NetworkError(message),
            ServiceErrorKind::Unsupported => Self::Unsupported(message),
            ServiceErrorKind::Malformed => Self::Malformed(message),
        }
    }

    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::RateLimited(_) => ServiceErrorKind::RateLimited,
            Self::AuthFailed(_) => ServiceErrorKind::AuthFailed,
            Self::NetworkError(_) => ServiceErrorKind::NetworkError,
            Self::Unsupported(_) => ServiceErrorKind::Unsupported,
            Self::Malformed(_) => ServiceErrorKind::Malformed,
        }
    }

    /// Whether another attempt may succeed without any change to the request
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::NetworkError(_))
    }

    /// Map a non-success HTTP status to the matching error class
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = format!("HTTP {}: {}", status, body.into());
        match status {
            429 => Self::RateLimited(message),
            401 | 403 => Self::AuthFailed(message),
            500..=599 => Self::NetworkError(message),
            _ => Self::Unsupported(message),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Malformed(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else {
            Self::NetworkError(error.to_string())
        }
    }
}

/// A catalog could not be parsed or serialized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{format} parse error{}: {message}", .line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
pub struct ParseError {
    /// Format name (PO, TS, XLIFF)
    pub format: &'static str,
    /// 1-based line number, when known
    pub line: Option<usize>,
    pub message: String,
}

impl ParseError {
    pub fn new(format: &'static str, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            format,
            line,
            message: message.into(),
        }
    }
}

/// A translated text did not carry back exactly the placeholders that were sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Placeholder mismatch: expected {expected} marker(s), found {found}")]
pub struct PlaceholderMismatch {
    pub expected: usize,
    pub found: usize,
}

/// The translated catalog could not be written back
#[derive(Error, Debug)]
#[error("Failed to write {}: {message}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    pub message: String,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Configuration or glossary problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
