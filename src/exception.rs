//! # Exception Normalization
//!
//! Two types bridge the error world and the exception world:
//!
//! - [`ErrorException`] is the typed exception the dispatcher raises when
//!   configured to convert runtime failures into exceptions. It keeps the
//!   original severity, source location, and (when present) the structured
//!   failure-site context.
//! - [`ExceptionInfo`] is the normalized record of any caught exception
//!   entering the catch-all path. It carries the concrete type name for
//!   display, the exception's own trace (never synthesized by the
//!   dispatcher), and an optional status code used by handler filters.

use crate::failure::{ErrorKind, StackFrame};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Exception produced by the error-conversion path.
///
/// Carries the structured context when the failure site had one, and is
/// recognized on re-entry through the exception path so the display label
/// can name the original error level.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ErrorException {
    message: String,
    severity: ErrorKind,
    file: String,
    line: u32,
    context: Option<Value>,
}

impl ErrorException {
    pub fn new(
        message: impl Into<String>,
        severity: ErrorKind,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            message: message.into(),
            severity,
            file: file.into(),
            line,
            context: None,
        }
    }

    /// Conversion target for failures that arrived with structured context.
    pub fn with_context(
        message: impl Into<String>,
        severity: ErrorKind,
        file: impl Into<String>,
        line: u32,
        context: Value,
    ) -> Self {
        Self {
            context: Some(context),
            ..Self::new(message, severity, file, line)
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> ErrorKind {
        self.severity
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Structured context captured at the failure site, if any.
    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }
}

/// Normalized record of a caught exception.
///
/// The dispatcher stores this in the context bag under its dedicated slot;
/// handlers read message, location, and trace through it rather than from
/// flattened bag fields.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Short type name of the concrete exception, used as the display label.
    pub name: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    /// Status code for status-bearing exceptions (e.g. an HTTP error type).
    pub code: Option<u16>,
    /// The exception's own trace, captured by whoever raised it. The
    /// dispatcher never fills this in.
    pub trace: Vec<StackFrame>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ExceptionInfo {
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            file: file.into(),
            line,
            code: None,
            trace: Vec::new(),
            source: None,
        }
    }

    /// Normalize any concrete error type. The type name is captured here,
    /// at the one point where the concrete type is still known.
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let name = short_type_name::<E>().to_string();
        let message = error.to_string();
        let source: Arc<dyn std::error::Error + Send + Sync> = Arc::new(error);
        let (file, line) = match source.downcast_ref::<ErrorException>() {
            Some(converted) => (converted.file().to_string(), converted.line()),
            None => (String::new(), 0),
        };

        Self {
            name,
            message,
            file,
            line,
            code: None,
            trace: Vec::new(),
            source: Some(source),
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_trace(mut self, trace: Vec<StackFrame>) -> Self {
        self.trace = trace;
        self
    }

    /// The underlying exception object, when this record was built from one.
    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        self.source.as_deref()
    }

    /// Severity of the original runtime failure, present only for
    /// exceptions produced by the error-conversion path.
    pub fn severity(&self) -> Option<ErrorKind> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<ErrorException>())
            .map(ErrorException::severity)
    }

    /// Structured failure-site context preserved through conversion.
    pub fn error_context(&self) -> Option<&Value> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<ErrorException>())
            .and_then(ErrorException::context)
    }

    /// Serializable summary for log sinks.
    pub fn summary(&self) -> Value {
        json!({
            "name": self.name,
            "message": self.message,
            "file": self.file,
            "line": self.line,
        })
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
