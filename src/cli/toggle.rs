//! Enable and disable commands for redsess.
//!
//! Both persist the enablement flag so later processes pick it up at
//! bootstrap. Each invocation is its own process, so `disable` resumes the
//! session `enable` started when given its key.

use serde::Serialize;

use crate::admin::SessionService;
use crate::backends::SessionBackend;
use crate::error::FailOpen;

/// Options for the enable and disable commands.
#[derive(Debug, Clone, Default)]
pub struct ToggleOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Session key to start when enabling (generated when absent), or to
    /// resume and destroy when disabling.
    pub session_key: Option<String>,
}

/// Output format for the enable and disable commands.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutput {
    /// Whether the action succeeded.
    pub success: bool,
    /// `enable` or `disable`.
    pub action: String,
    /// Persisted enablement after the action.
    pub enabled: bool,
    /// Key of the session started by `enable` or resumed by `disable`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Error message if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Format a toggle output based on options.
pub fn format_toggle_output(output: &ToggleOutput, options: &ToggleOptions) -> String {
    if options.quiet {
        return String::new();
    }

    if options.json {
        return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
    }

    match (output.action.as_str(), output.success) {
        ("enable", true) => format!(
            "Redis sessions enabled (session {}).",
            output.session_key.as_deref().unwrap_or("-")
        ),
        ("disable", true) => match &output.session_key {
            Some(key) => format!("Redis sessions disabled (session {} destroyed).", key),
            None => "Redis sessions disabled.".to_string(),
        },
        (action, false) => format!(
            "Could not {} Redis sessions: {}",
            action,
            output.error.as_deref().unwrap_or("unknown error")
        ),
        (action, true) => format!("{} succeeded.", action),
    }
}

/// The enable command implementation.
pub struct EnableCommand<B: SessionBackend> {
    service: SessionService<B>,
}

impl<B: SessionBackend> EnableCommand<B> {
    /// Create a new enable command.
    pub fn new(service: SessionService<B>) -> Self {
        Self { service }
    }

    /// Run the enable command.
    pub fn run(&mut self, options: &ToggleOptions) -> ToggleOutput {
        let success = self.service.enable_sessions(options.session_key.clone());
        let manager = self.service.manager();

        let error = if success {
            None
        } else if !self.service.backend().is_connected() {
            Some(
                self.service
                    .backend()
                    .last_error()
                    .unwrap_or_else(|| "backend not connected".to_string()),
            )
        } else if manager.active().is_some() {
            Some("a session is already active".to_string())
        } else {
            Some("enablement could not be saved".to_string())
        };

        ToggleOutput {
            success,
            action: "enable".to_string(),
            enabled: manager.is_enabled(),
            session_key: manager.active_key().map(str::to_string),
            error,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ToggleOutput, options: &ToggleOptions) -> String {
        format_toggle_output(output, options)
    }
}

/// The disable command implementation.
pub struct DisableCommand<B: SessionBackend> {
    service: SessionService<B>,
}

impl<B: SessionBackend> DisableCommand<B> {
    /// Create a new disable command.
    pub fn new(service: SessionService<B>) -> Self {
        Self { service }
    }

    /// Run the disable command.
    pub fn run(&mut self, options: &ToggleOptions) -> ToggleOutput {
        let resumed = match &options.session_key {
            Some(key) => {
                let resumed = self
                    .service
                    .resume_session(key)
                    .map(|_| true)
                    .fail_open_with("resuming session to disable", false);
                resumed.then(|| key.clone())
            }
            None => None,
        };

        let success = self.service.disable_sessions();

        ToggleOutput {
            success,
            action: "disable".to_string(),
            enabled: self.service.manager().is_enabled(),
            session_key: resumed,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ToggleOutput, options: &ToggleOptions) -> String {
        format_toggle_output(output, options)
    }
}
