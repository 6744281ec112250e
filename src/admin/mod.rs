//! Administrative control surface for redsess.
//!
//! [`SessionService`] exposes connection testing, enable/disable, and status;
//! [`dispatch`] runs nonce-checked admin requests against it.

pub mod dispatch;
pub mod service;

pub use dispatch::{dispatch, AdminAction, AdminRequest, NonceVerifier, Redirect, ADMIN_PAGE};
pub use service::{
    generate_session_key, BootstrapOutcome, ConfigSummary, ConnectionOutcome, SessionService,
    StatusReport,
};
