//! Store adapter implementations

pub mod memory;

#[cfg(feature = "cache-redis")]
pub mod redis;

pub use memory::MemoryStore;

#[cfg(feature = "cache-redis")]
pub use self::redis::RedisStore;
