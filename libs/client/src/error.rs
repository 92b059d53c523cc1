//! Error types for the client library.

use thiserror::Error;

/// Errors surfaced by the client library.
///
/// Business failures of remote operations are not errors; the tracker
/// reports those as [`crate::tracker::Outcome::Failed`] so the caller can
/// decide how to display them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad or missing credentials, or an unreachable server during token
    /// validation. Fatal; never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never reached the server.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A resource that must exist does not. Fatal for polling and name
    /// resolution.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// A name lookup matched more than one resource under the abort policy.
    #[error("ambiguous resolution: {0}")]
    Ambiguous(String),

    /// A filter expression failed structural validation. The query engine
    /// downgrades this to a warning and an empty result set.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// The server answered with a body we could not decode.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
