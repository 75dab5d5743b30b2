use thiserror::Error;

/// Terminal outcome of a page fetch that did not produce a usable body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("page not found (404)")]
    NotFound,

    #[error("rate limited (HTTP {0})")]
    RateLimited(u16),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("response too small ({0} bytes)")]
    TooSmall(usize),

    #[error("max retries exceeded")]
    RetriesExhausted,
}

impl FetchError {
    /// Short label for summaries and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "network",
            FetchError::NotFound => "not_found",
            FetchError::RateLimited(_) => "rate_limited",
            FetchError::Status(_) => "http_status",
            FetchError::TooSmall(_) => "too_small",
            FetchError::RetriesExhausted => "retries_exhausted",
        }
    }
}
