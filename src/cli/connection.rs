//! Test-connection command for redsess.

use serde::Serialize;

use crate::admin::SessionService;
use crate::backends::SessionBackend;
use crate::error::ConnectFailure;

/// Options for the test-connection command.
#[derive(Debug, Clone, Default)]
pub struct TestConnectionOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the test-connection command.
#[derive(Debug, Clone, Serialize)]
pub struct TestConnectionOutput {
    /// Whether the connection succeeded.
    pub success: bool,
    pub host: String,
    pub port: u16,
    /// Failure classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ConnectFailure>,
    /// Error message if the connection failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The test-connection command implementation.
pub struct TestConnectionCommand<B: SessionBackend> {
    service: SessionService<B>,
}

impl<B: SessionBackend> TestConnectionCommand<B> {
    /// Create a new test-connection command.
    pub fn new(service: SessionService<B>) -> Self {
        Self { service }
    }

    /// Run the connection test.
    pub fn run(&mut self, _options: &TestConnectionOptions) -> TestConnectionOutput {
        let outcome = self.service.test_connection();
        let redis = &self.service.config().redis;

        TestConnectionOutput {
            success: outcome.success,
            host: redis.host.clone(),
            port: redis.port,
            failure: outcome.failure,
            error: outcome.error,
        }
    }

    /// Format output based on options.
    pub fn format_output(
        &self,
        output: &TestConnectionOutput,
        options: &TestConnectionOptions,
    ) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &TestConnectionOutput) -> String {
        if output.success {
            format!("Connected to Redis at {}:{}", output.host, output.port)
        } else {
            format!(
                "Connection to Redis at {}:{} failed ({}): {}",
                output.host,
                output.port,
                output.failure.unwrap_or(ConnectFailure::Other),
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
