//! Configuration loading for redsess.
//!
//! Configuration follows a precedence chain:
//! 1. Key-value overrides: environment variables, or a map supplied by the
//!    host (highest priority)
//! 2. Project config (`.redsess/config.toml`)
//! 3. User config (`~/.redsess/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! Everything is optional. Configuration is loaded once at startup and is
//! immutable for the lifetime of the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::cookie::{CookieParams, SameSite};
use crate::error::{SessionError, Result};

/// Default Redis host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;
/// Default key prefix applied to every session key.
pub const DEFAULT_PREFIX: &str = "cs_session_";
/// Default connect and read timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 2;
/// Default session TTL: 24 hours.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Main configuration struct for redsess.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Redis connection parameters.
    pub redis: RedisConfig,
    /// Session lifecycle behavior.
    pub session: SessionConfig,
    /// Session cookie parameters.
    pub cookie: CookieParams,
}

/// Redis connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index selected after connecting.
    pub database: i64,
    /// Prefix prepended to every key.
    pub prefix: String,
    /// Connect timeout in seconds.
    pub timeout_secs: u64,
    /// Read/write timeout in seconds.
    pub read_timeout_secs: u64,
    /// Password sent with AUTH, if any.
    pub auth: Option<String>,
    pub tls: TlsConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: 0,
            prefix: DEFAULT_PREFIX.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth: None,
            tls: TlsConfig::default(),
        }
    }
}

/// TLS parameters for the Redis connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TlsConfig {
    /// Force TLS even with verification disabled.
    pub enabled: bool,
    /// Verify the server certificate chain.
    pub verify_peer: bool,
    /// Verify the server certificate matches the host name.
    pub verify_peer_name: bool,
    /// PEM bundle used as the trust root.
    pub ca_file: Option<PathBuf>,
}

impl TlsConfig {
    /// Whether the connection should use TLS.
    ///
    /// Turning on peer verification implies TLS.
    pub fn is_active(&self) -> bool {
        self.enabled || self.verify_peer
    }

    /// Whether certificate verification must be skipped.
    ///
    /// The TLS stack cannot skip name verification on its own, so disabling
    /// either check disables both.
    pub fn is_insecure(&self) -> bool {
        !(self.verify_peer && self.verify_peer_name)
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a written session lives before the backend expires it.
    pub ttl_seconds: u64,
    /// Connect at startup even when sessions are not enabled.
    pub auto_connect: bool,
    /// Route sessions through the store at startup even when the persisted
    /// flag is off.
    pub auto_enable: bool,
    /// Session name handed to the handler's `open`.
    pub name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECS,
            auto_connect: false,
            auto_enable: false,
            name: "REDSESSID".to_string(),
        }
    }
}

/// Minimum valid timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Minimum valid TTL, in seconds.
pub const MIN_TTL_SECS: u64 = 1;

impl RedisConfig {
    /// Check a port value (0 is not connectable).
    pub fn is_valid_port(value: u16) -> bool {
        value != 0
    }

    /// Check a timeout value.
    pub fn is_valid_timeout(value: u64) -> bool {
        value >= MIN_TIMEOUT_SECS
    }

    /// Check a database index.
    pub fn is_valid_database(value: i64) -> bool {
        value >= 0
    }
}

impl SessionConfig {
    /// Check a TTL value.
    pub fn is_valid_ttl(value: u64) -> bool {
        value >= MIN_TTL_SECS
    }
}

/// Parse a boolean override the way hosts usually spell them.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Build a config from defaults plus a host-supplied key-value set.
    ///
    /// Keys are the same names as the environment variables. Unknown keys are
    /// ignored; missing keys keep their defaults.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| pairs.get(key).cloned());
        config
    }

    fn load_user_config() -> Option<Config> {
        let home = redsess_home()?;
        Self::load_layer(&home.join("config.toml"))
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_layer(&cwd.join(".redsess").join("config.toml"))
    }

    /// A missing layer is skipped quietly; an unparsable one with a warning.
    fn load_layer(path: &Path) -> Option<Config> {
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(SessionError::Storage { .. }) => None,
            Err(e) => {
                tracing::warn!("ignoring config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| SessionError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| SessionError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup.
    ///
    /// Invalid values are reported and the current value is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("REDSESS_HOST") {
            let val = val.trim();
            if val.is_empty() {
                warn_invalid("REDSESS_HOST", val, "a non-empty host", &self.redis.host);
            } else {
                self.redis.host = val.to_string();
            }
        }

        if let Some(val) = lookup("REDSESS_PORT") {
            match val.trim().parse::<u16>() {
                Ok(n) if RedisConfig::is_valid_port(n) => self.redis.port = n,
                _ => warn_invalid("REDSESS_PORT", &val, "a port in 1..=65535", self.redis.port),
            }
        }

        if let Some(val) = lookup("REDSESS_DATABASE") {
            match val.trim().parse::<i64>() {
                Ok(n) if RedisConfig::is_valid_database(n) => self.redis.database = n,
                _ => warn_invalid(
                    "REDSESS_DATABASE",
                    &val,
                    "a non-negative integer",
                    self.redis.database,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_PREFIX") {
            self.redis.prefix = val;
        }

        if let Some(val) = lookup("REDSESS_TIMEOUT") {
            match val.trim().parse::<u64>() {
                Ok(n) if RedisConfig::is_valid_timeout(n) => self.redis.timeout_secs = n,
                _ => warn_invalid(
                    "REDSESS_TIMEOUT",
                    &val,
                    "a whole number of seconds >= 1",
                    self.redis.timeout_secs,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_READ_TIMEOUT") {
            match val.trim().parse::<u64>() {
                Ok(n) if RedisConfig::is_valid_timeout(n) => self.redis.read_timeout_secs = n,
                _ => warn_invalid(
                    "REDSESS_READ_TIMEOUT",
                    &val,
                    "a whole number of seconds >= 1",
                    self.redis.read_timeout_secs,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_AUTH") {
            self.redis.auth = if val.is_empty() { None } else { Some(val) };
        }

        if let Some(val) = lookup("REDSESS_TLS") {
            match parse_flag(&val) {
                Some(flag) => self.redis.tls.enabled = flag,
                None => warn_invalid("REDSESS_TLS", &val, "a boolean", self.redis.tls.enabled),
            }
        }

        if let Some(val) = lookup("REDSESS_TLS_VERIFY_PEER") {
            match parse_flag(&val) {
                Some(flag) => self.redis.tls.verify_peer = flag,
                None => warn_invalid(
                    "REDSESS_TLS_VERIFY_PEER",
                    &val,
                    "a boolean",
                    self.redis.tls.verify_peer,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_TLS_VERIFY_PEER_NAME") {
            match parse_flag(&val) {
                Some(flag) => self.redis.tls.verify_peer_name = flag,
                None => warn_invalid(
                    "REDSESS_TLS_VERIFY_PEER_NAME",
                    &val,
                    "a boolean",
                    self.redis.tls.verify_peer_name,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_TLS_CAFILE") {
            self.redis.tls.ca_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Some(val) = lookup("REDSESS_TTL") {
            match val.trim().parse::<u64>() {
                Ok(n) if SessionConfig::is_valid_ttl(n) => self.session.ttl_seconds = n,
                _ => warn_invalid(
                    "REDSESS_TTL",
                    &val,
                    "a whole number of seconds >= 1",
                    self.session.ttl_seconds,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_AUTO_CONNECT") {
            match parse_flag(&val) {
                Some(flag) => self.session.auto_connect = flag,
                None => warn_invalid(
                    "REDSESS_AUTO_CONNECT",
                    &val,
                    "a boolean",
                    self.session.auto_connect,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_AUTO_ENABLE") {
            match parse_flag(&val) {
                Some(flag) => self.session.auto_enable = flag,
                None => warn_invalid(
                    "REDSESS_AUTO_ENABLE",
                    &val,
                    "a boolean",
                    self.session.auto_enable,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_COOKIE_SECURE") {
            match parse_flag(&val) {
                Some(flag) => self.cookie.secure = flag,
                None => warn_invalid(
                    "REDSESS_COOKIE_SECURE",
                    &val,
                    "a boolean",
                    self.cookie.secure,
                ),
            }
        }

        if let Some(val) = lookup("REDSESS_COOKIE_DOMAIN") {
            self.cookie.domain = if val.is_empty() { None } else { Some(val) };
        }

        if let Some(val) = lookup("REDSESS_COOKIE_SAMESITE") {
            match SameSite::parse(val.trim()) {
                Some(policy) => self.cookie.same_site = policy,
                None => warn_invalid(
                    "REDSESS_COOKIE_SAMESITE",
                    &val,
                    "Strict, Lax or None",
                    self.cookie.same_site,
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Every field of `other` that differs from the default wins. A layer
    /// cannot set a value back to its default over a lower layer's
    /// customization.
    fn merge(mut self, other: Config) -> Self {
        let default_redis = RedisConfig::default();
        if other.redis.host != default_redis.host {
            self.redis.host = other.redis.host;
        }
        if other.redis.port != default_redis.port {
            self.redis.port = other.redis.port;
        }
        if other.redis.database != default_redis.database {
            self.redis.database = other.redis.database;
        }
        if other.redis.prefix != default_redis.prefix {
            self.redis.prefix = other.redis.prefix;
        }
        if other.redis.timeout_secs != default_redis.timeout_secs {
            self.redis.timeout_secs = other.redis.timeout_secs;
        }
        if other.redis.read_timeout_secs != default_redis.read_timeout_secs {
            self.redis.read_timeout_secs = other.redis.read_timeout_secs;
        }
        if other.redis.auth.is_some() {
            self.redis.auth = other.redis.auth;
        }

        let default_tls = TlsConfig::default();
        if other.redis.tls.enabled != default_tls.enabled {
            self.redis.tls.enabled = other.redis.tls.enabled;
        }
        if other.redis.tls.verify_peer != default_tls.verify_peer {
            self.redis.tls.verify_peer = other.redis.tls.verify_peer;
        }
        if other.redis.tls.verify_peer_name != default_tls.verify_peer_name {
            self.redis.tls.verify_peer_name = other.redis.tls.verify_peer_name;
        }
        if other.redis.tls.ca_file.is_some() {
            self.redis.tls.ca_file = other.redis.tls.ca_file;
        }

        let default_session = SessionConfig::default();
        if other.session.ttl_seconds != default_session.ttl_seconds {
            self.session.ttl_seconds = other.session.ttl_seconds;
        }
        if other.session.auto_connect != default_session.auto_connect {
            self.session.auto_connect = other.session.auto_connect;
        }
        if other.session.auto_enable != default_session.auto_enable {
            self.session.auto_enable = other.session.auto_enable;
        }
        if other.session.name != default_session.name {
            self.session.name = other.session.name;
        }

        let default_cookie = CookieParams::default();
        if other.cookie.lifetime_secs != default_cookie.lifetime_secs {
            self.cookie.lifetime_secs = other.cookie.lifetime_secs;
        }
        if other.cookie.path != default_cookie.path {
            self.cookie.path = other.cookie.path;
        }
        if other.cookie.domain.is_some() {
            self.cookie.domain = other.cookie.domain;
        }
        if other.cookie.secure != default_cookie.secure {
            self.cookie.secure = other.cookie.secure;
        }
        if other.cookie.http_only != default_cookie.http_only {
            self.cookie.http_only = other.cookie.http_only;
        }
        if other.cookie.same_site != default_cookie.same_site {
            self.cookie.same_site = other.cookie.same_site;
        }

        self
    }

    /// Validate values that serde accepted but a connection cannot use.
    ///
    /// TOML files bypass the override checks, so this runs on the merged
    /// result.
    pub fn validate(&self) -> Result<()> {
        if !RedisConfig::is_valid_port(self.redis.port) {
            return Err(SessionError::config("redis.port must be between 1 and 65535"));
        }
        if !RedisConfig::is_valid_database(self.redis.database) {
            return Err(SessionError::config("redis.database must be >= 0"));
        }
        if !RedisConfig::is_valid_timeout(self.redis.timeout_secs)
            || !RedisConfig::is_valid_timeout(self.redis.read_timeout_secs)
        {
            return Err(SessionError::config(format!(
                "redis timeouts must be >= {} second",
                MIN_TIMEOUT_SECS
            )));
        }
        if !SessionConfig::is_valid_ttl(self.session.ttl_seconds) {
            return Err(SessionError::config(format!(
                "session.ttl_seconds must be >= {}",
                MIN_TTL_SECS
            )));
        }
        Ok(())
    }
}

fn warn_invalid(key: &str, value: &str, expected: &str, current: impl std::fmt::Display) {
    tracing::warn!(
        "Invalid {} value '{}'. Expected {}. Using '{}'.",
        key,
        value,
        expected,
        current
    );
}

/// Get the redsess home directory.
///
/// Checks `REDSESS_HOME` first, then falls back to `~/.redsess`.
pub fn redsess_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("REDSESS_HOME") {
        if home.is_empty() {
            tracing::warn!("REDSESS_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("REDSESS_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".redsess"));
    }

    let fallback_path = env::temp_dir().join("redsess");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Path of the persisted option store.
pub fn options_path() -> Option<PathBuf> {
    redsess_home().map(|home| home.join("options.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.redis.host, "127.0.0.1");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.database, 0);
        assert_eq!(config.redis.prefix, "cs_session_");
        assert_eq!(config.redis.timeout_secs, 2);
        assert_eq!(config.redis.read_timeout_secs, 2);
        assert!(config.redis.auth.is_none());
        assert!(!config.redis.tls.is_active());

        assert_eq!(config.session.ttl_seconds, 86_400);
        assert!(!config.session.auto_connect);
        assert!(!config.session.auto_enable);

        assert_eq!(config.cookie, CookieParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_activation_rules() {
        let mut tls = TlsConfig::default();
        assert!(!tls.is_active());
        assert!(tls.is_insecure());

        tls.verify_peer = true;
        assert!(tls.is_active());
        assert!(tls.is_insecure(), "name verification still off");

        tls.verify_peer_name = true;
        assert!(!tls.is_insecure());

        let forced = TlsConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(forced.is_active());
        assert!(forced.is_insecure());
    }

    #[test]
    fn test_from_pairs_applies_known_keys() {
        let config = Config::from_pairs(&pairs(&[
            ("REDSESS_HOST", "redis.internal"),
            ("REDSESS_PORT", "6380"),
            ("REDSESS_DATABASE", "3"),
            ("REDSESS_PREFIX", "shop_"),
            ("REDSESS_TIMEOUT", "5"),
            ("REDSESS_READ_TIMEOUT", "7"),
            ("REDSESS_AUTH", "s3cret"),
            ("REDSESS_TLS_VERIFY_PEER", "true"),
            ("REDSESS_TLS_VERIFY_PEER_NAME", "1"),
            ("REDSESS_TLS_CAFILE", "/etc/ssl/redis-ca.pem"),
            ("REDSESS_TTL", "3600"),
            ("REDSESS_AUTO_CONNECT", "yes"),
            ("REDSESS_AUTO_ENABLE", "on"),
            ("REDSESS_COOKIE_SECURE", "true"),
            ("REDSESS_COOKIE_DOMAIN", "example.com"),
            ("REDSESS_COOKIE_SAMESITE", "strict"),
            ("SOMETHING_ELSE", "ignored"),
        ]));

        assert_eq!(config.redis.host, "redis.internal");
        assert_eq!(config.redis.port, 6380);
        assert_eq!(config.redis.database, 3);
        assert_eq!(config.redis.prefix, "shop_");
        assert_eq!(config.redis.timeout_secs, 5);
        assert_eq!(config.redis.read_timeout_secs, 7);
        assert_eq!(config.redis.auth.as_deref(), Some("s3cret"));
        assert!(config.redis.tls.is_active());
        assert!(!config.redis.tls.is_insecure());
        assert_eq!(
            config.redis.tls.ca_file,
            Some(PathBuf::from("/etc/ssl/redis-ca.pem"))
        );
        assert_eq!(config.session.ttl_seconds, 3600);
        assert!(config.session.auto_connect);
        assert!(config.session.auto_enable);
        assert!(config.cookie.secure);
        assert_eq!(config.cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(config.cookie.same_site, SameSite::Strict);
    }

    #[test]
    fn test_from_pairs_invalid_values_keep_defaults() {
        let config = Config::from_pairs(&pairs(&[
            ("REDSESS_PORT", "0"),
            ("REDSESS_DATABASE", "-1"),
            ("REDSESS_TIMEOUT", "0"),
            ("REDSESS_READ_TIMEOUT", "soon"),
            ("REDSESS_TTL", "forever"),
            ("REDSESS_AUTO_ENABLE", "maybe"),
            ("REDSESS_HOST", "   "),
        ]));

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_auth_clears_credential() {
        let mut config = Config::default();
        config.redis.auth = Some("old".to_string());
        config.apply_overrides(|key| (key == "REDSESS_AUTH").then(String::new));
        assert!(config.redis.auth.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[redis]
host = "10.0.0.5"
prefix = "app_"

[redis.tls]
verify_peer = true

[session]
ttl_seconds = 1800
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.redis.host, "10.0.0.5");
        assert_eq!(config.redis.prefix, "app_");
        assert!(config.redis.tls.verify_peer);
        assert_eq!(config.session.ttl_seconds, 1800);
        // Untouched fields keep defaults
        assert_eq!(config.redis.port, 6379);
        assert!(config.cookie.http_only);
    }

    #[test]
    fn test_load_from_file_lowercase_same_site() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        let toml_content = r#"
[redis]
host = "10.0.0.5"

[cookie]
same_site = "strict"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_layer(&config_path).unwrap();
        assert_eq!(config.redis.host, "10.0.0.5");
        assert_eq!(config.cookie.same_site, SameSite::Strict);
    }

    #[test]
    fn test_load_layer_skips_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_layer(&dir.path().join("absent.toml")).is_none());

        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[cookie]\nsame_site = \"sometimes\"\n").unwrap();
        assert!(Config::load_layer(&config_path).is_none());
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(SessionError::Storage { .. })));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(SessionError::Config { .. })));
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut base = Config::default();
        base.redis.port = 7000;
        base.session.ttl_seconds = 600;

        let mut other = Config::default();
        other.redis.host = "cache".to_string();
        other.session.auto_enable = true;

        let merged = base.merge(other);
        assert_eq!(merged.redis.host, "cache");
        assert_eq!(merged.redis.port, 7000, "default in other must not reset");
        assert_eq!(merged.session.ttl_seconds, 600);
        assert!(merged.session.auto_enable);
    }

    #[test]
    fn test_validate_rejects_zero_ttl_from_file() {
        let mut config = Config::default();
        config.session.ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.redis.read_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".redsess");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[redis]\nport = 6390\n",
        )
        .unwrap();

        let home = TempDir::new().unwrap();
        env::set_var("REDSESS_HOME", home.path());

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.redis.port, 6390);
        assert_eq!(config.redis.host, "127.0.0.1");

        env::remove_var("REDSESS_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".redsess");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[redis]\nport = 6390\n",
        )
        .unwrap();

        let home = TempDir::new().unwrap();
        env::set_var("REDSESS_HOME", home.path());
        env::set_var("REDSESS_PORT", "6391");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.redis.port, 6391);

        env::remove_var("REDSESS_PORT");
        env::remove_var("REDSESS_HOME");
    }

    #[test]
    #[serial]
    fn test_redsess_home_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("REDSESS_HOME", dir.path());

        assert_eq!(redsess_home(), Some(dir.path().to_path_buf()));
        assert_eq!(options_path(), Some(dir.path().join("options.json")));

        env::remove_var("REDSESS_HOME");
    }

    #[test]
    #[serial]
    fn test_redsess_home_empty_falls_back() {
        env::set_var("REDSESS_HOME", "");
        let home = redsess_home().unwrap();
        assert!(home.ends_with(".redsess") || home.ends_with("redsess"));
        env::remove_var("REDSESS_HOME");
    }
}
