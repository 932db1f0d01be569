use thiserror::Error;

/// Errors surfaced by the feed core's public APIs.
///
/// Ingestion never fails: malformed, duplicated and out-of-order events all
/// degrade to a well-defined partial state instead.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to open related-data subscription: {0}")]
    SubscriptionOpen(String),

    #[error("Invalid feed configuration: {0}")]
    Config(String),

    #[error("Relay client not connected")]
    NotConnected,
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
