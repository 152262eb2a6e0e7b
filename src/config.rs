//! Configuration Module
//!
//! Handles loading lookup engine and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

// == Backoff Config ==
/// Retry throttling for failed lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure; zero disables throttling
    pub duration: Duration,
    /// Multiplicative growth applied on each renewed failure
    pub factor: f64,
    /// Upper bound for the delay
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
        }
    }
}

// == Lookup Config ==
/// Lookup engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupConfig {
    /// Ordered key field names; empty means "use the runner's declared fields"
    pub key: Vec<String>,
    /// Failure retry throttling
    pub backoff: BackoffConfig,
    /// Minimum spacing between two eviction sweeps
    pub gc_interval: Duration,
    /// Idle time after which an entry is evicted; zero disables eviction
    pub expire_unused: Duration,
    /// Merge results at the event root instead of under `target`
    pub fields_under_root: bool,
    /// Field receiving the results when `fields_under_root` is false
    pub target: String,
    /// Event field holding the reference timestamp (RFC 3339)
    pub timestamp_field: String,
    /// Field receiving the error message of a failed lookup, if any
    pub error_field: Option<String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            key: Vec::new(),
            backoff: BackoffConfig::default(),
            gc_interval: Duration::from_secs(10),
            expire_unused: Duration::from_secs(3600),
            fields_under_root: false,
            target: "lookup".to_string(),
            timestamp_field: "@timestamp".to_string(),
            error_field: None,
        }
    }
}

impl LookupConfig {
    /// Creates a new LookupConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LOOKUP_KEY` - Comma separated key fields (default: none)
    /// - `LOOKUP_BACKOFF_MS` - Base backoff in milliseconds (default: 1000)
    /// - `LOOKUP_BACKOFF_FACTOR` - Backoff growth factor (default: 2.0)
    /// - `LOOKUP_BACKOFF_MAX_MS` - Backoff cap in milliseconds (default: 30000)
    /// - `LOOKUP_GC_INTERVAL_MS` - Minimum sweep spacing (default: 10000)
    /// - `LOOKUP_EXPIRE_UNUSED_MS` - Idle eviction threshold, 0 disables (default: 3600000)
    /// - `LOOKUP_FIELDS_UNDER_ROOT` - Merge at the event root (default: false)
    /// - `LOOKUP_TARGET` - Target field for results (default: "lookup")
    /// - `LOOKUP_TIMESTAMP_FIELD` - Reference timestamp field (default: "@timestamp")
    /// - `LOOKUP_ERROR_FIELD` - Field for failure messages (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            key: env::var("LOOKUP_KEY")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.key),
            backoff: BackoffConfig {
                duration: env_millis("LOOKUP_BACKOFF_MS").unwrap_or(defaults.backoff.duration),
                factor: env_parse("LOOKUP_BACKOFF_FACTOR").unwrap_or(defaults.backoff.factor),
                max: env_millis("LOOKUP_BACKOFF_MAX_MS").unwrap_or(defaults.backoff.max),
            },
            gc_interval: env_millis("LOOKUP_GC_INTERVAL_MS").unwrap_or(defaults.gc_interval),
            expire_unused: env_millis("LOOKUP_EXPIRE_UNUSED_MS")
                .unwrap_or(defaults.expire_unused),
            fields_under_root: env_parse("LOOKUP_FIELDS_UNDER_ROOT")
                .unwrap_or(defaults.fields_under_root),
            target: env::var("LOOKUP_TARGET").unwrap_or(defaults.target),
            timestamp_field: env::var("LOOKUP_TIMESTAMP_FIELD").unwrap_or(defaults.timestamp_field),
            error_field: env::var("LOOKUP_ERROR_FIELD")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    /// Checks the backoff settings.
    ///
    /// Key fields are checked by the engine, which knows the runner's defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff.factor.is_nan() || self.backoff.factor < 1.0 {
            return Err(ConfigError::InvalidFactor(self.backoff.factor));
        }
        if self.backoff.max < self.backoff.duration {
            return Err(ConfigError::MaxBelowBase);
        }
        Ok(())
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Program executed for each lookup
    pub command: String,
    /// Arguments passed to `command`
    pub command_args: Vec<String>,
    /// Key fields declared by the command backend
    pub command_key: Vec<String>,
    /// Lookup engine settings
    pub lookup: LookupConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `LOOKUP_COMMAND` - Lookup program (default: "cat")
    /// - `LOOKUP_COMMAND_ARGS` - Comma separated program arguments (default: none)
    /// - `LOOKUP_COMMAND_KEY` - Comma separated fields the program keys on (default: none)
    /// - everything read by [`LookupConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            command: env::var("LOOKUP_COMMAND").unwrap_or_else(|_| "cat".to_string()),
            command_args: env::var("LOOKUP_COMMAND_ARGS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            command_key: env::var("LOOKUP_COMMAND_KEY")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            lookup: LookupConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            command: "cat".to_string(),
            command_args: Vec::new(),
            command_key: Vec::new(),
            lookup: LookupConfig::default(),
        }
    }
}

// == Env Helpers ==
fn env_parse<T: FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(var: &str) -> Option<Duration> {
    env_parse::<u64>(var).map(Duration::from_millis)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.command, "cat");
        assert!(config.lookup.key.is_empty());
        assert_eq!(config.lookup.backoff.duration, Duration::from_secs(1));
        assert_eq!(config.lookup.backoff.factor, 2.0);
        assert_eq!(config.lookup.gc_interval, Duration::from_secs(10));
        assert_eq!(config.lookup.expire_unused, Duration::from_secs(3600));
        assert!(!config.lookup.fields_under_root);
        assert_eq!(config.lookup.target, "lookup");
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("LOOKUP_KEY", "host.name, process.pid,");
        env::set_var("LOOKUP_BACKOFF_MS", "250");
        env::set_var("LOOKUP_FIELDS_UNDER_ROOT", "true");
        env::set_var("LOOKUP_BACKOFF_FACTOR", "not-a-number");

        let config = LookupConfig::from_env();
        assert_eq!(config.key, vec!["host.name", "process.pid"]);
        assert_eq!(config.backoff.duration, Duration::from_millis(250));
        assert!(config.fields_under_root);
        assert_eq!(config.backoff.factor, 2.0);

        env::remove_var("LOOKUP_KEY");
        env::remove_var("LOOKUP_BACKOFF_MS");
        env::remove_var("LOOKUP_FIELDS_UNDER_ROOT");
        env::remove_var("LOOKUP_BACKOFF_FACTOR");
    }

    #[test]
    fn test_validate_rejects_shrinking_factor() {
        let mut config = LookupConfig::default();
        config.backoff.factor = 0.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFactor(0.5)));
    }

    #[test]
    fn test_validate_rejects_max_below_base() {
        let mut config = LookupConfig::default();
        config.backoff.max = Duration::from_millis(10);
        assert_eq!(config.validate(), Err(ConfigError::MaxBelowBase));
    }

    #[test]
    fn test_validate_accepts_disabled_backoff() {
        let mut config = LookupConfig::default();
        config.backoff.duration = Duration::ZERO;
        assert!(config.validate().is_ok());
    }
}
