//! Example: gate duplicate login events through Redis
//!
//! Run with:
//! ```bash
//! DEDUP_REDIS_URL=redis://127.0.0.1:6379 RUST_LOG=event_dedup=debug \
//!     cargo run --package event-dedup --example login_gate
//! ```

use anyhow::Context;
use event_dedup::{DedupConfig, DedupMetrics, EventDedup, HandlerConfig, RedisSeenStore};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DedupConfig::from_env().context("failed to load dedup configuration")?;

    let registry = Registry::new();
    DedupMetrics::register(&registry).context("failed to register dedup metrics")?;

    let store = RedisSeenStore::from_config(&config)
        .await
        .context("failed to connect to Redis")?;

    let dedup = EventDedup::builder()
        .store(Arc::new(store))
        .strategy(config.strategy)
        .build()?;

    dedup.register_handler(
        "login",
        HandlerConfig::new()
            .prefix("login")
            .window(Duration::from_secs(3600))
            .timestamp_fn(|e: &Value| e["occurredAtMs"].as_i64())
            .id_fn(|e: &Value| e["sessionId"].as_str().map(str::to_string))
            .val_fn(|e: &Value| e["userId"].to_string()),
    )?;

    let now = chrono::Utc::now().timestamp_millis();
    let session_id = format!("demo-{}", now);
    let events = vec![
        json!({ "sessionId": session_id, "userId": 42, "occurredAtMs": now }),
        json!({ "sessionId": session_id, "userId": 42, "occurredAtMs": now }),
        json!({ "sessionId": "stale", "userId": 7, "occurredAtMs": now - 7_200_000 }),
        json!({ "userId": 9, "occurredAtMs": now }),
    ];

    for event in &events {
        let decision = dedup.inspect("login", event).await?;
        info!(event = %event, decision = decision.as_str(), "login event");
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    println!("{}", String::from_utf8(buffer)?);

    Ok(())
}
