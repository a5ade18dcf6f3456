//! # Runtime Configuration Module
//!
//! [`DispatcherConfig`] holds the process-wide knobs the dispatcher reads at
//! construction. It can be built from defaults, environment variables or YAML.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ACTR_SEPARATOR` | `separator` | `/` |
//! | `ACTR_SUFFIX` | `suffix` | none |
//! | `ACTR_CACHE_SIZE` | `cache_size` | `1000` |
//! | `ACTR_DEFAULT_RESULT_TYPE` | `default_result_type` | empty |
//! | `ACTR_DEFAULT_RESULT_LOCATION` | `default_result_location` | empty |
//! | `ACTR_DEFAULT_STACK` | `default_stack` | none |
//! | `ACTR_FIXED_ORDER` | `fixed_order` | `false` |
//!
//! `ACTR_CACHE_SIZE` accepts decimal (`4096`) or hexadecimal (`0x1000`); zero or
//! a negative number disables the resolution cache. Values that fail to parse
//! fall back to the default.
//!
//! ## Usage
//!
//! ```rust
//! use actionrouter::runtime_config::DispatcherConfig;
//!
//! let config = DispatcherConfig::from_yaml_str("separator: '.'\ncache_size: 64\n").unwrap();
//! assert_eq!(config.separator, '.');
//! assert_eq!(config.cache_size, 64);
//! assert!(!config.fixed_order);
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::DispatchError;
use crate::router::SuffixRule;

pub const DEFAULT_CACHE_SIZE: i64 = 1000;

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Path segment separator.
    pub separator: char,
    /// Extension or delimiter stripped from incoming paths.
    pub suffix: Option<String>,
    /// Capacity of the wildcard resolution cache; `<= 0` disables caching.
    pub cache_size: i64,
    /// Result type used by descriptors that name none.
    pub default_result_type: String,
    /// Location used by ad-hoc results that name none.
    pub default_result_location: String,
    /// Interceptor stack applied to routes declaring no interceptors.
    pub default_stack: Option<String>,
    /// Memoize each handler's parameter binding plan after its first call.
    pub fixed_order: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            separator: '/',
            suffix: None,
            cache_size: DEFAULT_CACHE_SIZE,
            default_result_type: String::new(),
            default_result_location: String::new(),
            default_stack: None,
            fixed_order: false,
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from `ACTR_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let separator = lookup("ACTR_SEPARATOR")
            .and_then(|val| single_char(&val))
            .unwrap_or(defaults.separator);
        let cache_size = match lookup("ACTR_CACHE_SIZE") {
            Some(val) => {
                let val = val.trim();
                if let Some(hex) = val.strip_prefix("0x") {
                    i64::from_str_radix(hex, 16).unwrap_or(DEFAULT_CACHE_SIZE)
                } else {
                    val.parse().unwrap_or(DEFAULT_CACHE_SIZE)
                }
            }
            None => DEFAULT_CACHE_SIZE,
        };
        let fixed_order = lookup("ACTR_FIXED_ORDER")
            .and_then(|val| parse_flag(&val))
            .unwrap_or(defaults.fixed_order);

        Self {
            separator,
            suffix: lookup("ACTR_SUFFIX").filter(|val| !val.is_empty()),
            cache_size,
            default_result_type: lookup("ACTR_DEFAULT_RESULT_TYPE").unwrap_or_default(),
            default_result_location: lookup("ACTR_DEFAULT_RESULT_LOCATION").unwrap_or_default(),
            default_stack: lookup("ACTR_DEFAULT_STACK").filter(|val| !val.is_empty()),
            fixed_order,
        }
    }

    /// Parse and validate a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DispatchError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|err| DispatchError::Config(format!("invalid YAML configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|err| DispatchError::Config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject settings the router cannot work with.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.separator.is_alphanumeric() || self.separator.is_whitespace() {
            return Err(DispatchError::Config(format!(
                "separator '{}' must be a punctuation character",
                self.separator
            )));
        }
        if let Some(suffix) = &self.suffix {
            if suffix.contains(self.separator) {
                return Err(DispatchError::Config(format!(
                    "suffix '{suffix}' must not contain the separator '{}'",
                    self.separator
                )));
            }
        }
        Ok(())
    }

    /// The suffix stripping rule this configuration describes.
    #[must_use]
    pub fn suffix_rule(&self) -> SuffixRule {
        SuffixRule::parse(self.suffix.as_deref())
    }
}

fn single_char(val: &str) -> Option<char> {
    let mut chars = val.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
