use thiserror::Error;

/// Errors raised while loading or validating a `PublisherConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("config parse failed: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Errors from broker administration calls (topic lookup and creation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("topic {topic} lookup failed: {reason}")]
    TopicLookup { topic: String, reason: String },
    #[error("topic {0} already exists")]
    TopicExists(String),
    #[error("topic {topic} creation failed: {reason}")]
    TopicCreate { topic: String, reason: String },
}

/// Error for a single message publish, reported through its outcome handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("message rejected: {0}")]
    Rejected(String),
    #[error("publish timeout")]
    Timeout,
    #[error("outcome dropped before the broker responded")]
    OutcomeDropped,
    #[error("publish error: {0}")]
    Other(String),
}

/// Error raised when an event cannot be turned into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event serialization failed: {0}")]
pub struct SerializeError(pub String);

impl From<serde_json::Error> for SerializeError {
    fn from(err: serde_json::Error) -> Self {
        SerializeError(err.to_string())
    }
}

impl From<bitcode::Error> for SerializeError {
    fn from(err: bitcode::Error) -> Self {
        SerializeError(err.to_string())
    }
}

/// A rejected track request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// One event of the request is invalid.
    #[error("item {index}: {detail}")]
    Item { index: u64, detail: String },
    /// The request as a whole is malformed.
    #[error("{0}")]
    Request(String),
}

impl TrackError {
    pub fn item(index: usize, detail: impl Into<String>) -> Self {
        TrackError::Item {
            index: index as u64,
            detail: detail.into(),
        }
    }

    /// Position of the offending event, if the error concerns one.
    pub fn index(&self) -> Option<u64> {
        match self {
            TrackError::Item { index, .. } => Some(*index),
            TrackError::Request(_) => None,
        }
    }
}

/// Errors that prevent a dispatcher from starting.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("topic provisioning failed: {0}")]
    Provision(#[from] BrokerError),
}
