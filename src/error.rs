use thiserror::Error;

/// Failures surfaced by the feed components. Every variant renders to the
/// message the presentation layer shows inline next to the affected section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("{0}")]
    Network(String),
    #[error("sign in to continue")]
    Unauthenticated,
    #[error("moderation requires an admin or moderator role")]
    Forbidden,
    #[error("nothing to work with")]
    EmptyResult,
    #[error("response arrived for a previous session")]
    StaleResponse,
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl FeedError {
    pub fn network(message: impl Into<String>) -> Self {
        FeedError::Network(message.into())
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Decode(err.to_string())
        } else {
            FeedError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
