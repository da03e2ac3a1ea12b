/// Why a page fetch produced no items.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Upstream explicitly asked us to back off (HTTP 429).
    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The request itself could not complete (connect error, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not write {primary} ({primary_error}) or backup {backup} ({backup_error})")]
    Unwritable {
        primary: String,
        primary_error: String,
        backup: String,
        backup_error: String,
    },
}
