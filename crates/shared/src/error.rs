use thiserror::Error;

/// Failure of a single request, as seen by whoever issued it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("invalid request url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("request-interception worker is unavailable")]
    WorkerUnavailable,
}

impl FetchError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }
}
