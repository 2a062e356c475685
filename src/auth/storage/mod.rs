//! Storage abstraction layer
//!
//! Capability traits for OTP records, rate limit counters and the user directory,
//! with in-process, Redis and SQLite backends selected at startup.

pub mod r#trait;
pub mod memory;
pub mod redis;
pub mod sqlite;

pub use r#trait::{CounterStore, OtpStore, UserDirectory};
pub use memory::{MemoryCounterStore, MemoryOtpStore, MemoryUserDirectory};
pub use redis::{RedisCounterStore, RedisOtpStore};
pub use sqlite::SqliteUserDirectory;
