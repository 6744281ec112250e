//! redsess - Redis-backed session store
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use redsess::admin::SessionService;
use redsess::backends::RedisBackend;
use redsess::config::{redsess_home, Config};
use redsess::error::exit_codes;
use redsess::storage::FileOptionStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// redsess - Redis-backed session store
#[derive(Parser)]
#[command(name = "redsess")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Admin] Show connection, enablement, and server status
    Status {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Admin] Try to connect to Redis and report the result
    TestConnection {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Admin] Route sessions through Redis and start a session
    Enable {
        /// Session key to start (generated when omitted)
        #[arg(long)]
        session_key: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Admin] Stop routing sessions through Redis
    Disable {
        /// Session key started by `enable`, destroyed along the way
        #[arg(long)]
        session_key: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Developer] Print the payload stored under a session key
    Get {
        /// Session key
        key: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Developer] Store a payload under a session key
    Put {
        /// Session key
        key: String,
        /// Payload to store
        payload: String,
        /// Expiry in seconds (defaults to the configured TTL)
        #[arg(long)]
        ttl: Option<u64>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Developer] Delete a session
    Destroy {
        /// Session key
        key: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Developer] List stored session keys
    Keys {
        /// Glob pattern
        #[arg(long, short, default_value = "*")]
        pattern: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_logging();
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("redsess error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Log to stderr, filtered by `REDSESS_LOG` (default `warn`).
fn setup_logging() {
    let filter = EnvFilter::try_from_env("REDSESS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.redsess/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("redsess panic: {}", info);

        if let Some(home) = redsess_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status { json, quiet } => run_status(json, quiet),
        Commands::TestConnection { json, quiet } => run_test_connection(json, quiet),
        Commands::Enable {
            session_key,
            json,
            quiet,
        } => run_enable(session_key, json, quiet),
        Commands::Disable {
            session_key,
            json,
            quiet,
        } => run_disable(session_key, json, quiet),
        Commands::Get { key, json, quiet } => {
            run_inspect(redsess::cli::InspectOp::Get { key }, json, quiet)
        }
        Commands::Put {
            key,
            payload,
            ttl,
            json,
            quiet,
        } => run_inspect(redsess::cli::InspectOp::Put { key, payload, ttl }, json, quiet),
        Commands::Destroy { key, json, quiet } => {
            run_inspect(redsess::cli::InspectOp::Destroy { key }, json, quiet)
        }
        Commands::Keys {
            pattern,
            json,
            quiet,
        } => run_inspect(redsess::cli::InspectOp::Keys { pattern }, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Build the process-wide service and run startup resolution.
fn build_service() -> Result<SessionService<RedisBackend>, Box<dyn std::error::Error>> {
    let config = Config::load();
    config.validate()?;

    let options = FileOptionStore::new()?;
    let backend = RedisBackend::new(config.redis.clone());

    let mut service = SessionService::new(backend, Arc::new(options), config);
    service.bootstrap();
    Ok(service)
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_status(json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use redsess::cli::status::{StatusCommand, StatusOptions};

    let cmd = StatusCommand::new(build_service()?);
    let options = StatusOptions { json, quiet };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_test_connection(json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use redsess::cli::connection::{TestConnectionCommand, TestConnectionOptions};

    let mut cmd = TestConnectionCommand::new(build_service()?);
    let options = TestConnectionOptions { json, quiet };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_enable(
    session_key: Option<String>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use redsess::cli::toggle::{EnableCommand, ToggleOptions};

    let mut cmd = EnableCommand::new(build_service()?);
    let options = ToggleOptions {
        json,
        quiet,
        session_key,
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_disable(
    session_key: Option<String>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use redsess::cli::toggle::{DisableCommand, ToggleOptions};

    let mut cmd = DisableCommand::new(build_service()?);
    let options = ToggleOptions {
        json,
        quiet,
        session_key,
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_inspect(
    op: redsess::cli::InspectOp,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use redsess::cli::inspect::{InspectCommand, InspectOptions};

    let cmd = InspectCommand::new(build_service()?);
    let options = InspectOptions { json, quiet };

    let output = cmd.run(&op, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use redsess::cli::InspectOp;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::FAILURE, 1);
        assert_eq!(exit_codes::CRASH, 3);
    }

    #[test]
    fn test_success_to_exit_code() {
        assert_eq!(
            success_to_exit_code(true),
            ExitCode::from(exit_codes::SUCCESS as u8)
        );
        assert_eq!(
            success_to_exit_code(false),
            ExitCode::from(exit_codes::FAILURE as u8)
        );
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["redsess", "status", "--json"]);
        match cli.command {
            Commands::Status { json, quiet } => {
                assert!(json);
                assert!(!quiet);
            }
            _ => panic!("Expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_test_connection() {
        let cli = Cli::parse_from(["redsess", "test-connection", "-q"]);
        assert!(matches!(
            cli.command,
            Commands::TestConnection { quiet: true, .. }
        ));
    }

    #[test]
    fn test_cli_parse_enable() {
        let cli = Cli::parse_from(["redsess", "enable", "--session-key", "abc123"]);
        match cli.command {
            Commands::Enable { session_key, .. } => {
                assert_eq!(session_key, Some("abc123".to_string()));
            }
            _ => panic!("Expected Enable command"),
        }

        let cli = Cli::parse_from(["redsess", "enable"]);
        assert!(matches!(
            cli.command,
            Commands::Enable {
                session_key: None,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parse_disable() {
        let cli = Cli::parse_from(["redsess", "disable"]);
        assert!(matches!(
            cli.command,
            Commands::Disable {
                session_key: None,
                ..
            }
        ));

        let cli = Cli::parse_from(["redsess", "disable", "--session-key", "abc123"]);
        match cli.command {
            Commands::Disable { session_key, .. } => {
                assert_eq!(session_key.as_deref(), Some("abc123"));
            }
            _ => panic!("Expected Disable command"),
        }
    }

    #[test]
    fn test_cli_parse_put() {
        let cli = Cli::parse_from(["redsess", "put", "abc123", "userid=7", "--ttl", "60"]);
        match cli.command {
            Commands::Put {
                key, payload, ttl, ..
            } => {
                assert_eq!(
                    InspectOp::Put { key, payload, ttl },
                    InspectOp::Put {
                        key: "abc123".to_string(),
                        payload: "userid=7".to_string(),
                        ttl: Some(60),
                    }
                );
            }
            _ => panic!("Expected Put command"),
        }
    }

    #[test]
    fn test_cli_parse_get_and_destroy() {
        let cli = Cli::parse_from(["redsess", "get", "abc123"]);
        assert!(matches!(cli.command, Commands::Get { ref key, .. } if key == "abc123"));

        let cli = Cli::parse_from(["redsess", "destroy", "abc123", "--json"]);
        assert!(matches!(cli.command, Commands::Destroy { json: true, .. }));
    }

    #[test]
    fn test_cli_parse_keys_default_pattern() {
        let cli = Cli::parse_from(["redsess", "keys"]);
        match cli.command {
            Commands::Keys { pattern, .. } => assert_eq!(pattern, "*"),
            _ => panic!("Expected Keys command"),
        }

        let cli = Cli::parse_from(["redsess", "keys", "--pattern", "abc*"]);
        match cli.command {
            Commands::Keys { pattern, .. } => assert_eq!(pattern, "abc*"),
            _ => panic!("Expected Keys command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["redsess", "flush-all"]).is_err());
    }
}
