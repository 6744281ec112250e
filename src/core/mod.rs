//! Core types and logic for redsess.
//!
//! This module contains the session handler lifecycle, the decoded session
//! and enablement state types, and session cookie parameters.

pub mod cookie;
pub mod lifecycle;
pub mod state;

pub use cookie::{CookieParams, SameSite};
pub use lifecycle::{SessionHandler, SessionManager};
pub use state::{Enablement, SessionData, SessionPhase, ENABLED_OPTION, OWNERSHIP_SENTINEL};
