use reqwest::StatusCode;

/// Reasons no forwarded port could be obtained
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Gluetun answered 401 or 403
    #[error("Gluetun authentication failed with status {0}")]
    Unauthorized(StatusCode),
    /// Any other non-2xx answer
    #[error("Gluetun returned status {0}")]
    Status(StatusCode),
    /// Timeout, refused connection, broken body
    #[error("failed to reach Gluetun: {0}")]
    Transport(#[from] reqwest::Error),
    /// Body is not JSON
    #[error("unexpected Gluetun response: {0}")]
    Malformed(String),
    /// JSON without a usable `port` field
    #[error("Gluetun reported no forwarded port")]
    NoPort,
}

/// Result type alias for port fetches
pub type Result<T> = std::result::Result<T, FetchError>;
