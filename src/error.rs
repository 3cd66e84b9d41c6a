//! Error types for the flaresolverr-fetch library.

use thiserror::Error;

/// Main error type for the flaresolverr-fetch library.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request to the solver failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] rquest::Error),

    /// Only GET and POST can be expressed as solver commands
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Parameters could not be represented as key/value pairs
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Non-200 result, either from the target site or from the solver itself.
    ///
    /// Solver-level failures always carry status 428 so they never collide with
    /// a genuine 404/410 from the wrapped site.
    #[error("HTTP error {status} for {url}: {}", String::from_utf8_lossy(.body))]
    HttpStatus {
        url: String,
        status: u16,
        body: Vec<u8>,
    },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Solver returned a body that is not valid base64
    #[error("Base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cookie jar lock was poisoned
    #[error("Cookie jar error: {0}")]
    CookieJar(String),

    /// Blocking facade could not start its runtime
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl FetchError {
    /// Status code carried by an HTTP error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body carried by an HTTP error, if this is one.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            FetchError::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// True for the statuses callers treat as "resource does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404) | Some(410))
    }

    /// True when the solver, not the target site, reported the failure.
    pub fn is_proxy_failure(&self) -> bool {
        self.status() == Some(crate::config::PROXY_FAILURE_STATUS)
    }
}

/// Result type alias for flaresolverr-fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
