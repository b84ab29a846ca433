//! Key-value store trait definition

use super::errors::StoreResult;
use async_trait::async_trait;

/// Remaining-TTL sentinel for a key that exists without an expiry
pub const TTL_NO_EXPIRY: i64 = -1;

/// Remaining-TTL sentinel for a key that does not exist
pub const TTL_MISSING: i64 = -2;

/// Operations the cache needs from its backing store
///
/// Semantics follow the Redis commands of the same name. Implementations
/// must be cheap to share behind an `Arc`; every method takes `&self`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// `GET key`
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// `SET key value EX ttl_seconds`
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// `DEL key [key ...]`, returns the number of keys removed
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// `SADD set member [member ...]`, returns the number of new members
    async fn sadd(&self, set_key: &str, members: &[String]) -> StoreResult<u64>;

    /// `SMEMBERS set`
    async fn smembers(&self, set_key: &str) -> StoreResult<Vec<String>>;

    /// `EXPIRE key ttl_seconds`, returns whether the key existed
    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool>;

    /// `KEYS pattern` with Redis glob syntax
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// `TTL key`: seconds remaining, [`TTL_NO_EXPIRY`] or [`TTL_MISSING`]
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    /// `PING`
    async fn ping(&self) -> StoreResult<String>;

    /// `INFO [section]`; the text contains `used_memory:<bytes>` lines
    async fn info(&self, section: Option<&str>) -> StoreResult<String>;

    /// Short backend name for logs and health details
    fn name(&self) -> &'static str;
}
