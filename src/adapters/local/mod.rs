//! Local adapters: filesystem storage, in-memory stores and Redis.

pub mod fs;
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use fs::FsStorage;
pub use memory::{InMemoryProgress, InMemoryQueue, InMemoryVideoRepository};

#[cfg(feature = "redis")]
pub use redis::RedisPool;
