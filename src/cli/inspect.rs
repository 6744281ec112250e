//! Diagnostic commands for redsess: get, put, destroy, keys.
//!
//! These talk to the backend directly and connect on demand, whatever the
//! enablement flag says.

use serde::Serialize;

use crate::admin::SessionService;
use crate::backends::SessionBackend;
use crate::error::Result;

/// Options for the inspect commands.
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// A diagnostic operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectOp {
    Get { key: String },
    Put { key: String, payload: String, ttl: Option<u64> },
    Destroy { key: String },
    Keys { pattern: String },
}

impl InspectOp {
    pub fn name(&self) -> &'static str {
        match self {
            InspectOp::Get { .. } => "get",
            InspectOp::Put { .. } => "put",
            InspectOp::Destroy { .. } => "destroy",
            InspectOp::Keys { .. } => "keys",
        }
    }
}

/// Output format for the inspect commands.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InspectOutput {
    /// Whether the operation succeeded.
    pub success: bool,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Whether the key held a record (get, destroy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    /// Payload, lossily decoded as UTF-8 (get).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// TTL applied (put).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// Matching keys (keys).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    /// Error message if the operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InspectOutput {
    fn failure(op: &InspectOp, error: impl Into<String>) -> Self {
        Self {
            success: false,
            operation: op.name().to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// The inspect command implementation.
pub struct InspectCommand<B: SessionBackend> {
    service: SessionService<B>,
}

impl<B: SessionBackend> InspectCommand<B> {
    /// Create a new inspect command.
    pub fn new(service: SessionService<B>) -> Self {
        Self { service }
    }

    /// Run a diagnostic operation.
    pub fn run(&self, op: &InspectOp, _options: &InspectOptions) -> InspectOutput {
        match self.execute(op) {
            Ok(output) => output,
            Err(e) => InspectOutput::failure(op, format!("{} failed: {}", op.name(), e)),
        }
    }

    fn execute(&self, op: &InspectOp) -> Result<InspectOutput> {
        let backend = self.service.backend();
        if !backend.is_connected() {
            backend.connect()?;
        }

        let mut output = InspectOutput {
            success: true,
            operation: op.name().to_string(),
            ..Default::default()
        };

        match op {
            InspectOp::Get { key } => {
                let payload = backend.get(key)?;
                output.key = Some(key.clone());
                output.found = Some(payload.is_some());
                output.payload = payload.map(|p| String::from_utf8_lossy(&p).into_owned());
            }
            InspectOp::Put { key, payload, ttl } => {
                let ttl = ttl.unwrap_or(self.service.manager().ttl_seconds());
                backend.put(key, payload.as_bytes(), ttl)?;
                output.key = Some(key.clone());
                output.ttl = Some(ttl);
            }
            InspectOp::Destroy { key } => {
                output.key = Some(key.clone());
                output.found = Some(backend.delete(key)?);
            }
            InspectOp::Keys { pattern } => {
                let mut keys = backend.keys(pattern)?;
                keys.sort();
                output.keys = Some(keys);
            }
        }

        Ok(output)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InspectOutput, options: &InspectOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &InspectOutput) -> String {
        if !output.success {
            return output
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
        }

        let key = output.key.as_deref().unwrap_or("");
        match output.operation.as_str() {
            "get" => match &output.payload {
                Some(payload) => payload.clone(),
                None => format!("No session stored under {}", key),
            },
            "put" => format!("Stored {} (ttl {}s)", key, output.ttl.unwrap_or_default()),
            "destroy" if output.found == Some(true) => format!("Destroyed {}", key),
            "destroy" => format!("No session stored under {}", key),
            "keys" => {
                let keys = output.keys.as_deref().unwrap_or_default();
                if keys.is_empty() {
                    "No sessions found.".to_string()
                } else {
                    let mut lines = vec![format!("Sessions ({} found):", keys.len())];
                    lines.extend(keys.iter().map(|k| format!("  {}", k)));
                    lines.join("\n")
                }
            }
            other => format!("{} succeeded", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use crate::config::Config;
    use crate::storage::MemoryOptionStore;
    use std::sync::Arc;

    fn command(backend: Arc<MemoryBackend>) -> InspectCommand<Arc<MemoryBackend>> {
        let service = SessionService::new(
            backend,
            Arc::new(MemoryOptionStore::new()),
            Config::default(),
        );
        InspectCommand::new(service)
    }

    fn put(key: &str, payload: &str) -> InspectOp {
        InspectOp::Put {
            key: key.to_string(),
            payload: payload.to_string(),
            ttl: None,
        }
    }

    #[test]
    fn test_put_then_get() {
        let backend = Arc::new(MemoryBackend::new());
        let cmd = command(backend.clone());
        let options = InspectOptions::default();

        let output = cmd.run(&put("abc123", "userid=7"), &options);
        assert!(output.success);
        assert_eq!(output.ttl, Some(86_400));
        assert!(backend.is_connected());

        let output = cmd.run(
            &InspectOp::Get {
                key: "abc123".to_string(),
            },
            &options,
        );
        assert_eq!(output.found, Some(true));
        assert_eq!(cmd.format_output(&output, &options), "userid=7");
    }

    #[test]
    fn test_get_missing() {
        let cmd = command(Arc::new(MemoryBackend::new()));
        let options = InspectOptions::default();
        let output = cmd.run(
            &InspectOp::Get {
                key: "nope".to_string(),
            },
            &options,
        );

        assert!(output.success);
        assert_eq!(output.found, Some(false));
        assert_eq!(
            cmd.format_output(&output, &options),
            "No session stored under nope"
        );
    }

    #[test]
    fn test_put_with_ttl() {
        let cmd = command(Arc::new(MemoryBackend::new()));
        let op = InspectOp::Put {
            key: "k".to_string(),
            payload: "v".to_string(),
            ttl: Some(30),
        };
        let output = cmd.run(&op, &InspectOptions::default());
        assert_eq!(output.ttl, Some(30));
    }

    #[test]
    fn test_destroy() {
        let cmd = command(Arc::new(MemoryBackend::new()));
        let options = InspectOptions::default();
        cmd.run(&put("abc123", "x"), &options);

        let destroy = InspectOp::Destroy {
            key: "abc123".to_string(),
        };
        assert_eq!(cmd.run(&destroy, &options).found, Some(true));
        assert_eq!(cmd.run(&destroy, &options).found, Some(false));
    }

    #[test]
    fn test_keys_sorted() {
        let cmd = command(Arc::new(MemoryBackend::new()));
        let options = InspectOptions::default();
        cmd.run(&put("b", "1"), &options);
        cmd.run(&put("a", "2"), &options);

        let output = cmd.run(
            &InspectOp::Keys {
                pattern: "*".to_string(),
            },
            &options,
        );
        assert_eq!(output.keys, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(
            cmd.format_output(&output, &options),
            "Sessions (2 found):\n  a\n  b"
        );
    }

    #[test]
    fn test_unreachable_backend() {
        let cmd = command(Arc::new(MemoryBackend::unreachable("Connection refused")));
        let output = cmd.run(
            &InspectOp::Keys {
                pattern: "*".to_string(),
            },
            &InspectOptions::default(),
        );

        assert!(!output.success);
        assert!(output.error.unwrap().contains("Connection refused"));
    }
}
