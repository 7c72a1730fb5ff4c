//! # Event Dedup Gate
//!
//! Decides whether an incoming event is "new" (not seen within a recency
//! window) and, if so, records it in a shared key-value store so that later
//! deliveries of the same event are suppressed. Sits in front of consumers
//! that see at-least-once delivery, retries, or several producers emitting the
//! same logical event.
//!
//! ## Architecture
//!
//! ```text
//! Kafka/Queue → Consumer → EventDedup::inspect_event → side effects (if new)
//!                               ↓
//!                   HandlerRegistry (per event type)
//!                               ↓
//!                   EXISTS prefix:id / SETEX prefix:id ttl val
//!                               ↓
//!                             Redis
//! ```
//!
//! ## Decision protocol
//!
//! For a registered event type:
//!
//! 1. No timestamp → not new
//! 2. `now - occurred_at > window` → not new
//! 3. No id → not new
//! 4. `EXISTS prefix:id` → present: not new
//! 5. `SETEX prefix:id ttl val` → new
//!
//! Steps 1–3 never touch the store. Store failures in steps 4–5 come back as
//! [`DedupError::Store`], never as `false`: a caller must not confuse "store
//! down" with "duplicate".
//!
//! ## Usage Example
//!
//! ```
//! use event_dedup::{EventDedup, HandlerConfig, InMemorySeenStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Login {
//!     session_id: String,
//!     occurred_at_ms: i64,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), event_dedup::DedupError> {
//! let dedup = EventDedup::new(Arc::new(InMemorySeenStore::new()));
//!
//! dedup.register_handler(
//!     "login",
//!     HandlerConfig::new()
//!         .prefix("login")
//!         .window(Duration::from_secs(3600))
//!         .timestamp_fn(|e: &Login| Some(e.occurred_at_ms))
//!         .id_fn(|e: &Login| Some(e.session_id.clone()))
//!         .val_fn(|e: &Login| e.occurred_at_ms.to_string()),
//! )?;
//!
//! let event = Login {
//!     session_id: "abc".to_string(),
//!     occurred_at_ms: chrono::Utc::now().timestamp_millis(),
//! };
//!
//! assert!(dedup.inspect_event("login", &event).await?);
//! assert!(!dedup.inspect_event("login", &event).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The default [`MarkStrategy::CheckThenMark`] issues two independent
//! commands. Two callers racing on the same event can both observe the key
//! as absent and both get `true`. Use [`MarkStrategy::Atomic`] (`SET NX EX`)
//! when duplicate "new" results are not acceptable; exactly one caller then
//! wins per key until the marker expires.
//!
//! ## Trade-offs
//!
//! - Dedup only holds for the marker TTL; an event redelivered after expiry is
//!   new again.
//! - No retries inside the engine. Wrap `inspect_event` if you want them and
//!   use [`DedupError::is_transient`] to decide.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

mod clock;
mod config;
mod error;
mod handler;
mod memory_store;
mod metrics;
mod redis_store;
mod registry;
mod store;

pub use clock::{Clock, SystemClock};
pub use config::{DedupConfig, MarkStrategy};
pub use error::{DedupError, DedupResult, StoreError, StoreResult};
pub use handler::{EventTypeHandler, HandlerConfig, IdFn, TimestampFn, ValFn};
pub use memory_store::InMemorySeenStore;
pub use metrics::DedupMetrics;
pub use redis_store::{RedisSeenStore, DEFAULT_COMMAND_TIMEOUT};
pub use registry::HandlerRegistry;
pub use store::SeenStore;

/// Outcome of inspecting one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First sighting inside the window; the marker has been written
    New,

    /// Marker already present in the store
    Duplicate,

    /// Older than the handler's window
    OutsideWindow,

    /// Timestamp extractor returned nothing
    MissingTimestamp,

    /// Id extractor returned nothing
    MissingId,
}

impl Decision {
    pub fn is_new(&self) -> bool {
        matches!(self, Decision::New)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::New => "new",
            Decision::Duplicate => "duplicate",
            Decision::OutsideWindow => "outside_window",
            Decision::MissingTimestamp => "missing_timestamp",
            Decision::MissingId => "missing_id",
        }
    }
}

/// Dedup engine: handler registry plus a shared seen store.
///
/// Share across tasks with `Arc<EventDedup<E>>`. Engines are independent of
/// each other; each owns its registry.
pub struct EventDedup<E> {
    store: Arc<dyn SeenStore>,
    registry: HandlerRegistry<E>,
    clock: Arc<dyn Clock>,
    strategy: MarkStrategy,
    metrics: DedupMetrics,
}

impl<E> EventDedup<E> {
    /// Create an engine over `store` with the system clock and the default
    /// check-then-mark strategy.
    pub fn new(store: Arc<dyn SeenStore>) -> Self {
        Self {
            store,
            registry: HandlerRegistry::new(),
            clock: Arc::new(SystemClock),
            strategy: MarkStrategy::default(),
            metrics: DedupMetrics::new(),
        }
    }

    pub fn builder() -> EventDedupBuilder<E> {
        EventDedupBuilder::default()
    }

    pub fn strategy(&self) -> MarkStrategy {
        self.strategy
    }

    /// Register the handler for `event_type`. See [`HandlerRegistry::register`].
    pub fn register_handler(&self, event_type: &str, config: HandlerConfig<E>) -> DedupResult<()> {
        self.registry.register(event_type, config)
    }

    pub fn has_handler(&self, event_type: &str) -> bool {
        self.registry.contains(event_type)
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    pub fn handler(&self, event_type: &str) -> DedupResult<Arc<EventTypeHandler<E>>> {
        self.registry.get(event_type)
    }

    /// Returns `Ok(true)` only if the event is new and its marker was written.
    ///
    /// # Errors
    ///
    /// - [`DedupError::UnknownEventType`] if no handler is registered
    /// - [`DedupError::Store`] if the existence check or the mark failed; the
    ///   outcome is then unknown and the event may be reported new next time
    pub async fn inspect_event(&self, event_type: &str, event: &E) -> DedupResult<bool> {
        Ok(self.inspect(event_type, event).await?.is_new())
    }

    /// Like [`inspect_event`](Self::inspect_event) but reports why an event
    /// was not new.
    pub async fn inspect(&self, event_type: &str, event: &E) -> DedupResult<Decision> {
        let handler = self.registry.get(event_type)?;

        let decision = match self.strategy {
            MarkStrategy::CheckThenMark => {
                let decision = self.is_new(&handler, event).await?;
                if decision.is_new() {
                    self.mark_as_seen(&handler, event).await?;
                }
                decision
            }
            MarkStrategy::Atomic => self.claim(&handler, event).await?,
        };

        debug!(
            event_type = %event_type,
            decision = decision.as_str(),
            "Inspected event"
        );
        self.metrics.record_decision(event_type, decision.as_str());

        Ok(decision)
    }

    /// Window and id filters shared by both strategies. Returns the event id
    /// when the event is still a candidate.
    fn screen(&self, handler: &EventTypeHandler<E>, event: &E) -> Result<String, Decision> {
        let now = self.clock.now_millis();

        let occurred_at = handler
            .occurred_at(event)
            .ok_or(Decision::MissingTimestamp)?;

        if handler.is_outside_window(occurred_at, now) {
            return Err(Decision::OutsideWindow);
        }

        handler.event_id(event).ok_or(Decision::MissingId)
    }

    /// Phase 1: recency filter plus existence check
    async fn is_new(&self, handler: &EventTypeHandler<E>, event: &E) -> DedupResult<Decision> {
        let id = match self.screen(handler, event) {
            Ok(id) => id,
            Err(decision) => return Ok(decision),
        };

        let key = handler.store_key(&id);
        let exists = self.timed("EXISTS", &key, self.store.exists(&key)).await?;

        Ok(if exists {
            Decision::Duplicate
        } else {
            Decision::New
        })
    }

    /// Phase 2: write the seen marker with the handler's TTL
    async fn mark_as_seen(&self, handler: &EventTypeHandler<E>, event: &E) -> DedupResult<()> {
        let Some(id) = handler.event_id(event) else {
            return Ok(());
        };

        let key = handler.store_key(&id);
        let value = handler.value(event);
        let ttl_secs = handler.ttl_secs();

        self.timed("SETEX", &key, self.store.set_ex(&key, &value, ttl_secs))
            .await
    }

    /// Single-command variant: new iff `SET NX EX` created the key
    async fn claim(&self, handler: &EventTypeHandler<E>, event: &E) -> DedupResult<Decision> {
        let id = match self.screen(handler, event) {
            Ok(id) => id,
            Err(decision) => return Ok(decision),
        };

        let key = handler.store_key(&id);
        let value = handler.value(event);
        let created = self
            .timed(
                "SET NX EX",
                &key,
                self.store.set_nx_ex(&key, &value, handler.ttl_secs()),
            )
            .await?;

        Ok(if created {
            Decision::New
        } else {
            Decision::Duplicate
        })
    }

    async fn timed<T, F>(&self, operation: &'static str, key: &str, fut: F) -> DedupResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.metrics
            .observe_store_latency(operation, started.elapsed().as_secs_f64());

        result.map_err(|err| {
            self.metrics.record_store_error(operation, err.kind_label());
            warn!(
                key = %key,
                operation,
                transient = err.is_transient(),
                error = %err,
                "Seen store command failed"
            );
            DedupError::Store(err)
        })
    }
}

/// Builder for [`EventDedup`]. A store is required.
pub struct EventDedupBuilder<E> {
    store: Option<Arc<dyn SeenStore>>,
    clock: Option<Arc<dyn Clock>>,
    strategy: MarkStrategy,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E> Default for EventDedupBuilder<E> {
    fn default() -> Self {
        Self {
            store: None,
            clock: None,
            strategy: MarkStrategy::default(),
            _event: std::marker::PhantomData,
        }
    }
}

impl<E> EventDedupBuilder<E> {
    pub fn store(mut self, store: Arc<dyn SeenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn strategy(mut self, strategy: MarkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn build(self) -> DedupResult<EventDedup<E>> {
        let store = self.store.ok_or(DedupError::MissingStore)?;

        Ok(EventDedup {
            store,
            registry: HandlerRegistry::new(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            strategy: self.strategy,
            metrics: DedupMetrics::new(),
        })
    }
}
