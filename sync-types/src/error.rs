//! Error types for boardsync wire decoding.

use thiserror::Error;

/// Errors that can occur while decoding or encoding protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON decoding failed
    #[error("malformed {topic} payload: {source}")]
    Payload {
        /// Topic whose payload failed to decode
        topic: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Frame could not be parsed at all
    #[error("malformed frame: {0}")]
    Frame(#[source] serde_json::Error),

    /// Invalid side name
    #[error("invalid side: {0}")]
    InvalidSide(String),

    /// Invalid UCI move notation
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// Invalid square name
    #[error("invalid square: {0}")]
    InvalidSquare(String),

    /// A required field is absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Snapshot is internally inconsistent
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl ProtocolError {
    pub(crate) fn payload(topic: &str, source: serde_json::Error) -> Self {
        Self::Payload {
            topic: topic.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::InvalidMove("z9z9".into());
        assert_eq!(err.to_string(), "invalid move: z9z9");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProtocolError>();
    }
}
