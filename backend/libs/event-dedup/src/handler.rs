//! Per-event-type handler configuration
//!
//! A handler bundles the key namespace, the recency window, the record TTL
//! and three extraction closures. [`HandlerConfig`] is the loose,
//! caller-facing form (every field optional so that a missing piece can be
//! reported by name); [`EventTypeHandler`] is the validated, immutable form
//! held by the registry.

use crate::error::{DedupError, DedupResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Extracts when an event occurred, in epoch milliseconds
pub type TimestampFn<E> = Arc<dyn Fn(&E) -> Option<i64> + Send + Sync>;

/// Extracts an event's unique identifier
pub type IdFn<E> = Arc<dyn Fn(&E) -> Option<String> + Send + Sync>;

/// Extracts the value stored alongside the seen marker
pub type ValFn<E> = Arc<dyn Fn(&E) -> String + Send + Sync>;

/// Unvalidated handler configuration passed to `register_handler`.
///
/// # Example
///
/// ```
/// use event_dedup::HandlerConfig;
/// use std::time::Duration;
///
/// struct Login {
///     session_id: String,
///     occurred_at_ms: i64,
/// }
///
/// let config = HandlerConfig::<Login>::new()
///     .prefix("login")
///     .window(Duration::from_secs(3600))
///     .timestamp_fn(|e| Some(e.occurred_at_ms))
///     .id_fn(|e| Some(e.session_id.clone()))
///     .val_fn(|e| e.occurred_at_ms.to_string());
/// ```
pub struct HandlerConfig<E> {
    pub prefix: Option<String>,
    pub timestamp_fn: Option<TimestampFn<E>>,
    pub id_fn: Option<IdFn<E>>,
    pub val_fn: Option<ValFn<E>>,
    pub window: Option<Duration>,
    pub ttl: Option<Duration>,
}

impl<E> Default for HandlerConfig<E> {
    fn default() -> Self {
        Self {
            prefix: None,
            timestamp_fn: None,
            id_fn: None,
            val_fn: None,
            window: None,
            ttl: None,
        }
    }
}

impl<E> HandlerConfig<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn timestamp_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> Option<i64> + Send + Sync + 'static,
    {
        self.timestamp_fn = Some(Arc::new(f));
        self
    }

    pub fn id_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> Option<String> + Send + Sync + 'static,
    {
        self.id_fn = Some(Arc::new(f));
        self
    }

    pub fn val_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> String + Send + Sync + 'static,
    {
        self.val_fn = Some(Arc::new(f));
        self
    }

    /// Maximum event age (millisecond precision) eligible for "new"
    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Expiry of the seen marker (second precision).
    ///
    /// Defaults to `floor(window / 1s)` when omitted or zero. If that default
    /// resolves to 0 (window under one second), registration fails with
    /// [`DedupError::ZeroTtl`] since the store rejects a zero expiry.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Validate required fields in declaration order and resolve the TTL.
    ///
    /// The first missing field determines the error.
    pub(crate) fn validate(self, event_type: &str) -> DedupResult<EventTypeHandler<E>> {
        let prefix = match self.prefix {
            Some(p) if !p.is_empty() => p,
            _ => return Err(DedupError::MissingPrefix),
        };
        let timestamp_fn = self.timestamp_fn.ok_or(DedupError::MissingTimestampFn)?;
        let id_fn = self.id_fn.ok_or(DedupError::MissingIdFn)?;
        let val_fn = self.val_fn.ok_or(DedupError::MissingValFn)?;

        let window_ms = match self.window {
            Some(w) if w.as_millis() > 0 => u64::try_from(w.as_millis()).unwrap_or(u64::MAX),
            _ => return Err(DedupError::MissingWindow),
        };

        let ttl_secs = match self.ttl {
            Some(ttl) if ttl.as_secs() > 0 => ttl.as_secs(),
            _ => window_ms / 1000,
        };
        if ttl_secs == 0 {
            return Err(DedupError::ZeroTtl {
                event_type: event_type.to_string(),
                window_ms,
            });
        }

        Ok(EventTypeHandler {
            prefix,
            window_ms,
            ttl_secs,
            timestamp_fn,
            id_fn,
            val_fn,
        })
    }
}

/// Validated handler for one event type. Immutable once registered.
pub struct EventTypeHandler<E> {
    prefix: String,
    window_ms: u64,
    ttl_secs: u64,
    timestamp_fn: TimestampFn<E>,
    id_fn: IdFn<E>,
    val_fn: ValFn<E>,
}

impl<E> EventTypeHandler<E> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// `<prefix>:<id>`, no escaping
    pub fn store_key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Occurrence time; `0` counts as undated. Pre-epoch (negative) values
    /// are kept and go through the window check.
    pub fn occurred_at(&self, event: &E) -> Option<i64> {
        (self.timestamp_fn)(event).filter(|ts| *ts != 0)
    }

    /// Event id; empty ids count as missing.
    pub fn event_id(&self, event: &E) -> Option<String> {
        (self.id_fn)(event).filter(|id| !id.is_empty())
    }

    pub fn value(&self, event: &E) -> String {
        (self.val_fn)(event)
    }

    /// True when the event is older than the window at `now_ms`.
    ///
    /// An age of exactly `window` is still inside.
    pub fn is_outside_window(&self, occurred_at_ms: i64, now_ms: i64) -> bool {
        let age = i128::from(now_ms) - i128::from(occurred_at_ms);
        age > i128::from(self.window_ms)
    }
}

impl<E> fmt::Debug for EventTypeHandler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTypeHandler")
            .field("prefix", &self.prefix)
            .field("window_ms", &self.window_ms)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
