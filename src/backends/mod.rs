//! Session backends for redsess.
//!
//! A backend is the expiring key-value store session records live in.
//!
//! Available backends:
//! - **Redis**: production backend over a single synchronous connection
//! - **Memory**: in-process backend with an injectable clock, for tests

pub mod memory;
pub mod redis;
pub mod traits;

pub use self::redis::RedisBackend;
pub use memory::{Clock, ManualClock, MemoryBackend, SystemClock};
pub use traits::{ServerInfo, SessionBackend};
