//! Seen-marker store abstraction
//!
//! The engine only needs three key-value primitives with per-key expiry:
//!
//! | Operation   | Redis command              |
//! |-------------|----------------------------|
//! | `exists`    | `EXISTS key`               |
//! | `set_ex`    | `SETEX key ttl value`      |
//! | `set_nx_ex` | `SET key value NX EX ttl`  |
//!
//! Implementations must report timeouts and connection failures as
//! [`StoreError`], never as "absent" or "present".

use crate::error::StoreResult;
use async_trait::async_trait;

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Whether `key` currently exists
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Set `key` to `value`, expiring after `ttl_secs`
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()>;

    /// Set `key` only if absent. Returns `true` when this call created it.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<bool>;
}
