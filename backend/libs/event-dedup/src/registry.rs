//! Event type → handler mapping
//!
//! Registration is append-only: a type can be registered once and is never
//! replaced or removed for the lifetime of the registry.

use crate::error::{DedupError, DedupResult};
use crate::handler::{EventTypeHandler, HandlerConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct HandlerRegistry<E> {
    handlers: RwLock<HashMap<String, Arc<EventTypeHandler<E>>>>,
}

impl<E> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> HandlerRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `event_type`.
    ///
    /// Fails with [`DedupError::DuplicateHandler`] if the type is taken, or
    /// with the missing-field error of the first absent required field.
    pub fn register(&self, event_type: &str, config: HandlerConfig<E>) -> DedupResult<()> {
        let mut handlers = self.handlers.write();

        if handlers.contains_key(event_type) {
            return Err(DedupError::DuplicateHandler(event_type.to_string()));
        }

        let handler = config.validate(event_type)?;

        info!(
            event_type = %event_type,
            prefix = %handler.prefix(),
            window_ms = handler.window_ms(),
            ttl_secs = handler.ttl_secs(),
            "Registered dedup handler"
        );

        handlers.insert(event_type.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Look up the handler for `event_type`
    pub fn get(&self, event_type: &str) -> DedupResult<Arc<EventTypeHandler<E>>> {
        self.handlers
            .read()
            .get(event_type)
            .cloned()
            .ok_or_else(|| DedupError::UnknownEventType(event_type.to_string()))
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.read().contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(prefix: &str, window_ms: u64) -> HandlerConfig<String> {
        HandlerConfig::new()
            .prefix(prefix)
            .timestamp_fn(|_e: &String| Some(1))
            .id_fn(|e: &String| Some(e.clone()))
            .val_fn(|e: &String| e.clone())
            .window(Duration::from_millis(window_ms))
    }

    #[test]
    fn test_register_and_get() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        registry.register("login", config("login", 60_000)).unwrap();

        let handler = registry.get("login").unwrap();
        assert_eq!(handler.prefix(), "login");
        assert_eq!(handler.ttl_secs(), 60);
        assert!(registry.contains("login"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_keeps_first_handler() {
        let registry = HandlerRegistry::new();
        registry.register("login", config("login", 60_000)).unwrap();

        let err = registry
            .register("login", config("other", 120_000))
            .unwrap_err();
        assert!(matches!(err, DedupError::DuplicateHandler(ref t) if t == "login"));

        let handler = registry.get("login").unwrap();
        assert_eq!(handler.prefix(), "login");
        assert_eq!(handler.window_ms(), 60_000);
    }

    #[test]
    fn test_duplicate_check_precedes_validation() {
        let registry = HandlerRegistry::new();
        registry.register("login", config("login", 60_000)).unwrap();

        let err = registry
            .register("login", HandlerConfig::new())
            .unwrap_err();
        assert!(matches!(err, DedupError::DuplicateHandler(_)));
    }

    #[test]
    fn test_invalid_registration_leaves_type_free() {
        let registry = HandlerRegistry::new();

        let err = registry
            .register("login", HandlerConfig::new().prefix("login"))
            .unwrap_err();
        assert!(matches!(err, DedupError::MissingTimestampFn));
        assert!(!registry.contains("login"));

        registry.register("login", config("login", 60_000)).unwrap();
    }

    #[test]
    fn test_unknown_type() {
        let registry: HandlerRegistry<String> = HandlerRegistry::new();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, DedupError::UnknownEventType(ref t) if t == "nope"));
    }
}
