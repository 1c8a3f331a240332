//! Structured error types for the crate itself.
//!
//! These cover setup and programming errors inside the interception layer
//! (bad configuration, double registration, handler faults). Failures being
//! *reported through* the layer are modeled in [`crate::failure`] instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CerberusError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Registration error: {0}")]
    RegistrationError(String),
    #[error("Handler error: {0}")]
    HandlerError(String),
}

impl From<serde_json::Error> for CerberusError {
    fn from(error: serde_json::Error) -> Self {
        CerberusError::HandlerError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, CerberusError>;
