//! Persisted option storage for redsess.
//!
//! The host keeps a small key-value option store (the persisted half of the
//! Enablement State). This module provides the trait plus file-based and
//! in-memory implementations.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileOptionStore;
pub use memory::MemoryOptionStore;
pub use traits::OptionStore;
