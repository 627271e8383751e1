//! Error types for the alarm connector

/// Result type alias for connector operations
pub type AlarmsResult<T> = Result<T, AlarmsError>;

/// Errors produced while building or running the alarm connector
#[derive(Debug, thiserror::Error)]
pub enum AlarmsError {
    /// Invalid include/exclude tag pattern. Fatal for the connector.
    #[error("invalid tag filter: {0}")]
    Filter(#[from] FilterError),

    /// Fetching alarms from CloudWatch failed. The cycle emits nothing.
    #[error("failed to get Alarm data: {0}")]
    Fetch(#[from] CloudWatchError),

    /// The CloudWatch client could not be built from the configuration.
    #[error("failed to create CloudWatch client: {0}")]
    Client(#[source] CloudWatchError),

    /// A returned alarm is missing a required field and was skipped.
    #[error("malformed alarm record {alarm}: missing {field}")]
    MalformedRecord { alarm: String, field: &'static str },

    /// No usable credentials could be resolved.
    #[error("credential resolution failed: {0}")]
    Credentials(String),

    /// Connector configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A glob in `tags_include` or `tags_exclude` could not be compiled
#[derive(Debug, thiserror::Error)]
#[error("pattern {pattern:?} is not a valid glob: {source}")]
pub struct FilterError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Errors raised at the CloudWatch API boundary
#[derive(Debug, thiserror::Error)]
pub enum CloudWatchError {
    /// Non-2xx status without a decodable API error body.
    #[error("CloudWatch HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// The API answered with a typed error (`__type` / `message`).
    #[error("CloudWatch API error: code={code}, message={message}")]
    Api { code: String, message: String },

    /// Request signing failed.
    #[error("request signing error: {0}")]
    Signing(String),

    /// Invalid endpoint configuration.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// Underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
