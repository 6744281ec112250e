//! redsess - Redis-backed session store
//!
//! redsess routes a host's session handling through an expiring key-value
//! backend (Redis in production, in-memory for tests) while a persisted
//! enablement flag says so. An administrative surface tests the connection,
//! turns session handling on and off, and reports status.

pub mod admin;
pub mod backends;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod util;

pub use admin::{
    dispatch, AdminAction, AdminRequest, BootstrapOutcome, ConnectionOutcome, NonceVerifier,
    Redirect, SessionService, StatusReport,
};
pub use backends::{MemoryBackend, RedisBackend, ServerInfo, SessionBackend};
pub use config::Config;
pub use core::{CookieParams, Enablement, SessionData, SessionHandler, SessionManager};
pub use error::{ConnectFailure, Result, SessionError};
pub use storage::{FileOptionStore, MemoryOptionStore, OptionStore};

// CLI commands
pub use cli::{
    DisableCommand, EnableCommand, InspectCommand, StatusCommand, TestConnectionCommand,
};
