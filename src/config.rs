//! Dispatcher configuration.
//!
//! Plain flags consumed at install time. Environment overrides use the
//! `CERBERUS_*` namespace so embedding applications can flip behavior
//! without code changes.

use crate::error::{CerberusError, Result};
use serde::{Deserialize, Serialize};

/// Default scratch allocation released at shutdown so an out-of-memory
/// fatal can still be processed.
pub const DEFAULT_RESERVED_MEMORY_BYTES: usize = 20 * 1024;

/// Seed for auto-assigned handler priorities.
pub const DEFAULT_PRIORITY_SEED: i32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlerConfig {
    /// Enrich dispatches with memory figures and stack snapshots.
    pub debug: bool,
    /// Convert fatal failures into raised [`crate::exception::ErrorException`]s.
    pub throw_exceptions: bool,
    /// Convert non-fatal failures too (only meaningful with `throw_exceptions`).
    pub throw_non_fatal: bool,
    /// Size of the failure-of-last-resort scratch buffer.
    pub reserved_memory_bytes: usize,
    /// First priority handed to handlers registered without an explicit one.
    pub priority_seed: i32,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            debug: true,
            throw_exceptions: false,
            throw_non_fatal: false,
            reserved_memory_bytes: DEFAULT_RESERVED_MEMORY_BYTES,
            priority_seed: DEFAULT_PRIORITY_SEED,
        }
    }
}

impl ErrorHandlerConfig {
    /// Load configuration with environment variable overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(debug) = std::env::var("CERBERUS_DEBUG") {
            config.debug = parse_bool("CERBERUS_DEBUG", &debug)?;
        }

        if let Ok(throw) = std::env::var("CERBERUS_THROW_EXCEPTIONS") {
            config.throw_exceptions = parse_bool("CERBERUS_THROW_EXCEPTIONS", &throw)?;
        }

        if let Ok(throw_non_fatal) = std::env::var("CERBERUS_THROW_NON_FATAL") {
            config.throw_non_fatal = parse_bool("CERBERUS_THROW_NON_FATAL", &throw_non_fatal)?;
        }

        if let Ok(reserved) = std::env::var("CERBERUS_RESERVED_MEMORY") {
            config.reserved_memory_bytes = reserved.parse().map_err(|e| {
                CerberusError::ConfigurationError(format!("Invalid reserved_memory_bytes: {e}"))
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CerberusError::ConfigurationError(format!(
            "Invalid boolean for {name}: '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ErrorHandlerConfig::default();
        assert!(config.debug);
        assert!(!config.throw_exceptions);
        assert!(!config.throw_non_fatal);
        assert_eq!(config.reserved_memory_bytes, 20480);
        assert_eq!(config.priority_seed, 10);
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(parse_bool("X", "On").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        let err = parse_bool("CERBERUS_DEBUG", "maybe").unwrap_err();
        assert!(matches!(err, CerberusError::ConfigurationError(_)));
    }
}
