//! Error types for the event dedup gate

use std::time::Duration;
use thiserror::Error;

/// Result type for dedup operations
pub type DedupResult<T> = Result<T, DedupError>;

/// Result type for seen-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by [`crate::EventDedup`] and its registry.
///
/// Business outcomes (stale event, missing id, already seen) are never errors;
/// they come back as `Ok(false)` from `inspect_event`.
#[derive(Error, Debug)]
pub enum DedupError {
    /// Engine was built without a store handle
    #[error("Must provide a seen store (Redis connection)")]
    MissingStore,

    /// Handler registered without a key prefix
    #[error("Handler must specify a prefix to namespace events.")]
    MissingPrefix,

    /// Handler registered without a timestamp extractor
    #[error("Handler must specify a timestampFn.")]
    MissingTimestampFn,

    /// Handler registered without an id extractor
    #[error("Handler must specify an idFn.")]
    MissingIdFn,

    /// Handler registered without a value extractor
    #[error("Handler must specify a valFn.")]
    MissingValFn,

    /// Handler registered without a (non-zero) recency window
    #[error("Handler must specify a window.")]
    MissingWindow,

    /// Effective TTL would be zero seconds, which the store rejects
    #[error("Handler TTL for event type '{event_type}' resolves to 0 seconds (window {window_ms}ms)")]
    ZeroTtl { event_type: String, window_ms: u64 },

    /// A handler already exists for this event type
    #[error("Cannot overwrite existing handler for event type '{0}'")]
    DuplicateHandler(String),

    /// No handler was registered for this event type
    #[error("No such handler for event type '{0}'")]
    UnknownEventType(String),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Existence check or mark failed against the store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DedupError {
    /// Wiring/programming mistakes that retrying will never fix.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, DedupError::Store(_))
    }

    /// Check if error is transient (caller may retry the inspection)
    pub fn is_transient(&self) -> bool {
        match self {
            DedupError::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Errors from a [`crate::SeenStore`] backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Command did not complete within the configured timeout
    #[error("Store command '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Backend specific failure
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Check if error is transient (connection drop, timeout, busy server)
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Redis(err) => {
                err.is_timeout()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
                    || matches!(
                        err.kind(),
                        redis::ErrorKind::IoError
                            | redis::ErrorKind::BusyLoadingError
                            | redis::ErrorKind::TryAgain
                            | redis::ErrorKind::ClusterDown
                            | redis::ErrorKind::MasterDown
                    )
            }
            StoreError::Timeout { .. } => true,
            StoreError::Other(_) => false,
        }
    }

    /// Short label used for metrics and logs
    pub fn kind_label(&self) -> &'static str {
        match self {
            StoreError::Redis(_) => "redis",
            StoreError::Timeout { .. } => "timeout",
            StoreError::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_messages_name_the_field() {
        assert!(DedupError::MissingPrefix.to_string().contains("prefix"));
        assert!(DedupError::MissingTimestampFn
            .to_string()
            .contains("timestampFn"));
        assert!(DedupError::MissingIdFn.to_string().contains("idFn"));
        assert!(DedupError::MissingValFn.to_string().contains("valFn"));
        assert!(DedupError::MissingWindow.to_string().contains("window"));
    }

    #[test]
    fn test_error_display() {
        let err = DedupError::DuplicateHandler("login".to_string());
        assert_eq!(
            err.to_string(),
            "Cannot overwrite existing handler for event type 'login'"
        );

        let err = DedupError::UnknownEventType("signup".to_string());
        assert_eq!(err.to_string(), "No such handler for event type 'signup'");
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = StoreError::Timeout {
            operation: "EXISTS",
            timeout: Duration::from_millis(50),
        };
        assert!(err.is_transient());
        assert_eq!(err.kind_label(), "timeout");

        let wrapped: DedupError = err.into();
        assert!(wrapped.is_transient());
        assert!(!wrapped.is_configuration());
    }

    #[test]
    fn test_redis_io_error_is_transient() {
        let err: StoreError =
            redis::RedisError::from((redis::ErrorKind::IoError, "connection reset")).into();
        assert!(err.is_transient());
        assert_eq!(err.kind_label(), "redis");
    }

    #[test]
    fn test_configuration_errors_are_not_transient() {
        let err = DedupError::UnknownEventType("x".to_string());
        assert!(err.is_configuration());
        assert!(!err.is_transient());

        let err = StoreError::Other("bad reply".to_string());
        assert!(!err.is_transient());
    }
}
