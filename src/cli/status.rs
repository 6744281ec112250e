//! Status command for redsess.
//!
//! Shows connection state, enablement, stored session count, and server
//! details.

use serde::Serialize;

use crate::admin::{SessionService, StatusReport};
use crate::backends::SessionBackend;

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// The status snapshot.
    #[serde(flatten)]
    pub report: StatusReport,
}

/// The status command implementation.
pub struct StatusCommand<B: SessionBackend> {
    service: SessionService<B>,
}

impl<B: SessionBackend> StatusCommand<B> {
    /// Create a new status command.
    pub fn new(service: SessionService<B>) -> Self {
        Self { service }
    }

    /// Run the status command.
    ///
    /// Reporting never fails; an unreachable backend shows up in the report.
    pub fn run(&self, _options: &StatusOptions) -> StatusOutput {
        StatusOutput {
            success: true,
            report: self.service.status(),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.report.format_text()
        }
    }
}
