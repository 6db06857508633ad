use reqwest::StatusCode;

/// Errors raised while talking to qBittorrent
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    /// Connection refused, timeout or any other transport failure
    #[error("qBittorrent request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Login answered with something other than `Ok.`
    #[error("qBittorrent login rejected: {0}")]
    LoginRejected(String),
    /// The session expired and logging in again did not succeed
    #[error("failed to re-authenticate with qBittorrent")]
    ReauthFailed,
    /// Non-2xx answer
    #[error("{context}: HTTP {status}")]
    Status {
        context: &'static str,
        status: StatusCode,
    },
    /// Body could not be understood
    #[error("unexpected qBittorrent response: {0}")]
    Malformed(String),
}

/// Result type alias for qBittorrent operations
pub type Result<T> = std::result::Result<T, TorrentError>;
