use thiserror::Error;

/// Why a single upstream attempt produced no answer
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("lookup cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Transport errors that are really timeouts get their own variant
pub(crate) fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err)
    }
}
