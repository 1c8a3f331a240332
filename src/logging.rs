//! # Structured Logging Module
//!
//! Environment-aware `tracing` initialization for applications embedding the
//! interception layer. The dispatcher and registry emit `tracing` events;
//! this helper wires up a console subscriber with an environment filter.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Honors `CERBERUS_LOG` as an `EnvFilter` directive; otherwise derives a
/// default level from `CERBERUS_ENV`. Safe to call more than once, and safe
/// to call when the embedding application already installed a global
/// subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env("CERBERUS_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&get_environment())));

        let subscriber = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true);

        // Another global subscriber may already be set by the embedder.
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }
    });
}

/// Get current environment from environment variables.
fn get_environment() -> String {
    std::env::var("CERBERUS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment.
fn default_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
