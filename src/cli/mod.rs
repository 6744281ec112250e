//! CLI commands for redsess.
//!
//! This module provides CLI commands for redsess, organized into:
//! - **Admin commands**: status, test-connection, enable, disable
//! - **Diagnostic commands**: get, put, destroy, keys

// Admin commands
pub mod connection;
pub mod status;
pub mod toggle;

// Diagnostic commands
pub mod inspect;

pub use connection::TestConnectionCommand;
pub use inspect::{InspectCommand, InspectOp};
pub use status::StatusCommand;
pub use toggle::{DisableCommand, EnableCommand};
