//! Facade configuration.
//!
//! Sources, later wins: built-in defaults, a YAML document, environment
//! variables. All durations are milliseconds.
//!
//! ```yaml
//! cache:
//!   enabled: true
//!   ttl_ms: 300000
//! breaker:
//!   timeout_ms: 3000
//!   error_threshold_percentage: 50
//!   reset_timeout_ms: 30000
//! expose_error_details: false
//! ```
//!
//! | Variable | Field |
//! |----------|-------|
//! | `USER_FACADE_CACHE_TTL_MS` | `cache.default_ttl` |
//! | `USER_FACADE_CACHE_ENABLED` | `cache.enabled` |
//! | `USER_FACADE_BREAKER_TIMEOUT_MS` | `breaker.timeout` |
//! | `USER_FACADE_BREAKER_THRESHOLD_PCT` | `breaker.error_threshold_percentage` |
//! | `USER_FACADE_BREAKER_RESET_MS` | `breaker.reset_timeout` |
//! | `USER_FACADE_EXPOSE_ERROR_DETAILS` | `expose_error_details` |

use crate::cache::CacheConfig;
use crate::resilience::CircuitBreakerConfig;
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CACHE_TTL_MS: &str = "USER_FACADE_CACHE_TTL_MS";
pub const ENV_CACHE_ENABLED: &str = "USER_FACADE_CACHE_ENABLED";
pub const ENV_BREAKER_TIMEOUT_MS: &str = "USER_FACADE_BREAKER_TIMEOUT_MS";
pub const ENV_BREAKER_THRESHOLD_PCT: &str = "USER_FACADE_BREAKER_THRESHOLD_PCT";
pub const ENV_BREAKER_RESET_MS: &str = "USER_FACADE_BREAKER_RESET_MS";
pub const ENV_EXPOSE_ERROR_DETAILS: &str = "USER_FACADE_EXPOSE_ERROR_DETAILS";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacadeConfig {
    pub cache: CacheConfig,
    pub breaker: CircuitBreakerConfig,
    /// Include cause chains in client error bodies.
    pub expose_error_details: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    cache: FileCache,
    #[serde(default)]
    breaker: FileBreaker,
    expose_error_details: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileCache {
    enabled: Option<bool>,
    ttl_ms: Option<u64>,
    max_entries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileBreaker {
    timeout_ms: Option<u64>,
    error_threshold_percentage: Option<u8>,
    reset_timeout_ms: Option<u64>,
    rolling_window_ms: Option<u64>,
    rolling_buckets: Option<u32>,
    volume_threshold: Option<u32>,
    fallback_message: Option<String>,
}

impl FacadeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_expose_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Defaults overlaid with a YAML document. Absent keys keep their default.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: FileConfig = serde_yaml::from_str(yaml).map_err(|e| {
            Error::config_with_context(
                format!("invalid YAML configuration: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })?;
        let mut cfg = Self::default();

        let c = file.cache;
        if let Some(v) = c.enabled {
            cfg.cache.enabled = v;
        }
        if let Some(v) = c.ttl_ms {
            cfg.cache.default_ttl = Duration::from_millis(v);
        }
        if let Some(v) = c.max_entries {
            cfg.cache.max_entries = v;
        }

        let b = file.breaker;
        if let Some(v) = b.timeout_ms {
            cfg.breaker.timeout = Duration::from_millis(v);
        }
        if let Some(v) = b.error_threshold_percentage {
            cfg.breaker.error_threshold_percentage = v;
        }
        if let Some(v) = b.reset_timeout_ms {
            cfg.breaker.reset_timeout = Duration::from_millis(v);
        }
        if let Some(v) = b.rolling_window_ms {
            cfg.breaker.rolling_window = Duration::from_millis(v);
        }
        if let Some(v) = b.rolling_buckets {
            cfg.breaker.rolling_buckets = v;
        }
        if let Some(v) = b.volume_threshold {
            cfg.breaker.volume_threshold = v;
        }
        if let Some(v) = b.fallback_message {
            cfg.breaker.fallback_message = v;
        }

        if let Some(v) = file.expose_error_details {
            cfg.expose_error_details = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_CACHE_TTL_MS)? {
            self.cache.default_ttl = Duration::from_millis(ms);
        }
        if let Some(v) = parse_bool(&lookup, ENV_CACHE_ENABLED)? {
            self.cache.enabled = v;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_BREAKER_TIMEOUT_MS)? {
            self.breaker.timeout = Duration::from_millis(ms);
        }
        if let Some(pct) = parse_var::<u8, _>(&lookup, ENV_BREAKER_THRESHOLD_PCT)? {
            self.breaker.error_threshold_percentage = pct;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_BREAKER_RESET_MS)? {
            self.breaker.reset_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse_bool(&lookup, ENV_EXPOSE_ERROR_DETAILS)? {
            self.expose_error_details = v;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.default_ttl.is_zero() {
            return Err(Error::config_with_context(
                "must be non-zero",
                ErrorContext::new()
                    .with_field_path("cache.default_ttl")
                    .with_source("config"),
            ));
        }
        self.breaker.validate()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::config_with_context(
                format!("cannot parse {:?}: {}", raw, e),
                ErrorContext::new().with_field_path(key).with_source("config"),
            )
        }),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(Error::config_with_context(
            format!("expected a boolean, got {:?}", other),
            ErrorContext::new().with_field_path(key).with_source("config"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = FacadeConfig::default();
        assert_eq!(cfg.cache.default_ttl, Duration::from_secs(300));
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.breaker.timeout, Duration::from_millis(3000));
        assert_eq!(cfg.breaker.error_threshold_percentage, 50);
        assert_eq!(cfg.breaker.reset_timeout, Duration::from_millis(30_000));
        assert!(!cfg.expose_error_details);
    }

    #[test]
    fn test_yaml_overrides_only_given_keys() {
        let cfg = FacadeConfig::from_yaml_str(
            r#"
cache:
  ttl_ms: 1000
breaker:
  timeout_ms: 250
  fallback_message: "try later"
expose_error_details: true
"#,
        )
        .unwrap();
        assert_eq!(cfg.cache.default_ttl, Duration::from_millis(1000));
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.breaker.timeout, Duration::from_millis(250));
        assert_eq!(cfg.breaker.reset_timeout, Duration::from_millis(30_000));
        assert_eq!(cfg.breaker.fallback_message, "try later");
        assert!(cfg.expose_error_details);
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        assert!(FacadeConfig::from_yaml_str("cache:\n  ttl: 5\n").is_err());
        assert!(FacadeConfig::from_yaml_str("cache:\n  key_prefix: tenant\n").is_err());
        assert!(FacadeConfig::from_yaml_str("cache:\n  max_entries: 64\n").is_ok());
    }

    #[test]
    fn test_yaml_validates_ranges() {
        let err = FacadeConfig::from_yaml_str("breaker:\n  error_threshold_percentage: 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("error_threshold_percentage"));
    }

    #[test]
    fn test_env_overlay() {
        let mut cfg = FacadeConfig::default();
        cfg.apply_vars(vars(&[
            (ENV_CACHE_TTL_MS, "60000"),
            (ENV_CACHE_ENABLED, "false"),
            (ENV_BREAKER_THRESHOLD_PCT, "75"),
            (ENV_EXPOSE_ERROR_DETAILS, "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.cache.default_ttl, Duration::from_secs(60));
        assert!(!cfg.cache.enabled);
        assert_eq!(cfg.breaker.error_threshold_percentage, 75);
        assert!(cfg.expose_error_details);
    }

    #[test]
    fn test_env_parse_error_names_variable() {
        let mut cfg = FacadeConfig::default();
        let err = cfg
            .apply_vars(vars(&[(ENV_BREAKER_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some(ENV_BREAKER_TIMEOUT_MS)
        );
    }
}
