//! Error type definitions for epg-unifier

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type
///
/// None of these are retried. The single exception to "fatal" lives in the
/// merger, which downgrades a failed playlist fetch to an empty alias set
/// before the error ever reaches the caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (missing credentials, bad config file)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Remote retrieval errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Malformed XML, undecodable gzip or non UTF-8 payloads
    #[error("Parse error: {context} - {message}")]
    Parse { context: String, message: String },

    /// The gap finder was started before the merger produced its output
    #[error("Unified guide not found at {}. Run the `merge` command first.", path.display())]
    GuideNotFound { path: PathBuf },

    /// Local file system errors
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while retrieving a remote document
#[derive(Error, Debug)]
pub enum FetchError {
    /// The per-request timeout elapsed
    #[error("Request timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-2xx status
    #[error("HTTP error: {status} {reason} - URL: {url}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    /// Connection, TLS or body transfer failures
    #[error("Network error: {message} - URL: {url}")]
    Network { url: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a parse error for the given input
    pub fn parse<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error category
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io { .. } => 1,
            Self::Configuration { .. } => 2,
            Self::Fetch(_) => 3,
            Self::Parse { .. } => 4,
            Self::GuideNotFound { .. } => 5,
        }
    }
}

impl FetchError {
    /// The (already obfuscated) URL the failure relates to
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Status { url, .. } | Self::Network { url, .. } => url,
        }
    }
}
