//! # Key-Value Store Adapters
//!
//! The cache services talk to their backing store only through the
//! [`KeyValueStore`] trait, which mirrors the small Redis command subset the
//! cache needs (strings with TTL, sets, glob key listing, introspection).
//!
//! ## Architecture
//!
//! ```text
//! Arc<dyn KeyValueStore>
//!   ├── RedisStore   <- ConnectionManager-based async Redis (feature `cache-redis`)
//!   └── MemoryStore  <- in-process map with per-key deadlines
//! ```
//!
//! ## Design Decisions
//!
//! - **Trait objects**: the store is injected into `CacheService`, so tests
//!   can wrap or replace it (recording and failing doubles).
//! - **Graceful connect**: [`connect_graceful`] never fails startup; a store
//!   that cannot be reached yields `None` and the cache runs disabled.

pub mod errors;
pub mod glob;
pub mod provider;
pub mod providers;
pub mod traits;

pub use errors::{StoreError, StoreResult};
pub use provider::connect_graceful;
pub use providers::MemoryStore;
pub use traits::KeyValueStore;

#[cfg(feature = "cache-redis")]
pub use providers::RedisStore;
