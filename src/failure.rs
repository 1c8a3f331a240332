//! # Failure Model
//!
//! Normalized representation of one failure occurrence and the context bag
//! that travels with it through the handler chain.
//!
//! ## Overview
//!
//! The host runtime signals failures with heterogeneous shapes: numeric
//! error codes with message and source location, caught exception objects,
//! or a pending fatal discovered at shutdown. The dispatcher flattens all of
//! them into a [`FailureEvent`], built once and consumed by exactly one
//! dispatch pass. Handlers never see raw runtime input.

use crate::exception::ExceptionInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classified failure kind with the runtime's stable raw codes.
///
/// `Exception` is a synthetic marker (raw code 0) used only by the catch-all
/// exception path; every other variant mirrors a runtime error level.
/// Unrecognized codes survive as `Unknown` rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Exception,
    Error,
    Warning,
    Parse,
    Notice,
    CoreError,
    CoreWarning,
    CompileError,
    CompileWarning,
    UserError,
    UserWarning,
    UserNotice,
    Strict,
    RecoverableError,
    Deprecated,
    UserDeprecated,
    Unknown(u32),
}

impl ErrorKind {
    /// Map a raw runtime error code onto a kind. Total: unrecognized codes
    /// become [`ErrorKind::Unknown`].
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => ErrorKind::Exception,
            1 => ErrorKind::Error,
            2 => ErrorKind::Warning,
            4 => ErrorKind::Parse,
            8 => ErrorKind::Notice,
            16 => ErrorKind::CoreError,
            32 => ErrorKind::CoreWarning,
            64 => ErrorKind::CompileError,
            128 => ErrorKind::CompileWarning,
            256 => ErrorKind::UserError,
            512 => ErrorKind::UserWarning,
            1024 => ErrorKind::UserNotice,
            2048 => ErrorKind::Strict,
            4096 => ErrorKind::RecoverableError,
            8192 => ErrorKind::Deprecated,
            16384 => ErrorKind::UserDeprecated,
            other => ErrorKind::Unknown(other),
        }
    }

    /// The runtime's numeric code for this kind.
    pub fn raw(self) -> u32 {
        match self {
            ErrorKind::Exception => 0,
            ErrorKind::Error => 1,
            ErrorKind::Warning => 2,
            ErrorKind::Parse => 4,
            ErrorKind::Notice => 8,
            ErrorKind::CoreError => 16,
            ErrorKind::CoreWarning => 32,
            ErrorKind::CompileError => 64,
            ErrorKind::CompileWarning => 128,
            ErrorKind::UserError => 256,
            ErrorKind::UserWarning => 512,
            ErrorKind::UserNotice => 1024,
            ErrorKind::Strict => 2048,
            ErrorKind::RecoverableError => 4096,
            ErrorKind::Deprecated => 8192,
            ErrorKind::UserDeprecated => 16384,
            ErrorKind::Unknown(raw) => raw,
        }
    }

    /// Human-readable kind label used in display messages and log lines.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Exception => "E_EXCEPTION",
            ErrorKind::Error => "E_ERROR",
            ErrorKind::Warning => "E_WARNING",
            ErrorKind::Parse => "E_PARSE",
            ErrorKind::Notice => "E_NOTICE",
            ErrorKind::CoreError => "E_CORE_ERROR",
            ErrorKind::CoreWarning => "E_CORE_WARNING",
            ErrorKind::CompileError => "E_COMPILE_ERROR",
            ErrorKind::CompileWarning => "E_COMPILE_WARNING",
            ErrorKind::UserError => "E_USER_ERROR",
            ErrorKind::UserWarning => "E_USER_WARNING",
            ErrorKind::UserNotice => "E_USER_NOTICE",
            ErrorKind::Strict => "E_STRICT",
            ErrorKind::RecoverableError => "E_RECOVERABLE_ERROR",
            ErrorKind::Deprecated => "E_DEPRECATED",
            ErrorKind::UserDeprecated => "E_USER_DEPRECATED",
            ErrorKind::Unknown(_) => "E_UNKNOWN",
        }
    }

    /// Whether this kind is unrecoverable for the current request/process.
    ///
    /// Pure function of the kind; warnings, notices, deprecations, strict
    /// notices, recoverable errors, and unknown codes are all non-fatal.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::Exception
                | ErrorKind::Error
                | ErrorKind::Parse
                | ErrorKind::CoreError
                | ErrorKind::CompileError
                | ErrorKind::UserError
        )
    }
}

/// One frame of a captured call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    pub fn at(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: Some(file.into()),
            line: Some(line),
        }
    }
}

/// Key/value side-channel carried alongside the descriptor through the
/// handler chain. Populated once per dispatch; handlers run sequentially, so
/// no two ever mutate it concurrently.
#[derive(Debug, Clone, Default)]
pub struct FailureContext {
    /// The underlying exception object, exception path only. Descriptor
    /// fields are never flattened for exceptions; handlers read through
    /// the object.
    pub exception: Option<ExceptionInfo>,
    /// Structured context at the failure site (variable scope and the like),
    /// only when non-empty.
    pub context: Option<Value>,
    /// Peak memory usage figure, debug mode only.
    pub memory: Option<u64>,
    /// Captured call stack, debug mode only and never for exceptions.
    pub trace: Option<Vec<StackFrame>>,
    /// Status code lifted from a status-bearing exception.
    pub code: Option<u16>,
    /// Flattened descriptor fields merged in by leaf handlers for sink
    /// convenience on non-exception failures.
    pub fields: Map<String, Value>,
}

impl FailureContext {
    /// Memory figure, zero when enrichment did not run.
    pub fn memory(&self) -> u64 {
        self.memory.unwrap_or(0)
    }

    /// Best available call stack: the captured snapshot for runtime errors,
    /// the exception's own trace otherwise, empty when neither exists.
    pub fn trace(&self) -> &[StackFrame] {
        if let Some(trace) = &self.trace {
            return trace;
        }
        if let Some(exception) = &self.exception {
            return &exception.trace;
        }
        &[]
    }

    /// JSON rendering for log sinks. The exception object is summarized
    /// (name, message, location) since the live object cannot cross a
    /// serialization boundary.
    pub fn to_json(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(exception) = &self.exception {
            map.insert("exception".to_string(), exception.summary());
        }
        if let Some(context) = &self.context {
            map.insert("context".to_string(), context.clone());
        }
        if let Some(memory) = self.memory {
            map.insert("memory".to_string(), Value::from(memory));
        }
        if let Some(trace) = &self.trace {
            map.insert(
                "trace".to_string(),
                serde_json::to_value(trace).unwrap_or(Value::Null),
            );
        }
        if let Some(code) = self.code {
            map.insert("code".to_string(), Value::from(code));
        }
        Value::Object(map)
    }
}

/// Normalized representation of one failure occurrence, immutable once
/// constructed and consumed by exactly one dispatch pass.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub kind: ErrorKind,
    /// Human-readable kind label: the error level label for runtime errors,
    /// the exception type name (optionally suffixed with the original level)
    /// for exceptions.
    pub display_type: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub extra: FailureContext,
}

impl FailureEvent {
    /// The display message every leaf handler agrees on.
    pub fn formatted_message(&self) -> String {
        format!(
            "{}: {} in {} line {}",
            self.display_type, self.message, self.file, self.line
        )
    }

    /// Context bag for a sink, with the descriptor fields flattened in for
    /// non-exception failures.
    pub fn sink_context(&self) -> FailureContext {
        let mut extra = self.extra.clone();
        if extra.exception.is_none() {
            extra
                .fields
                .entry("type".to_string())
                .or_insert_with(|| Value::from(self.kind.raw()));
            extra
                .fields
                .entry("message".to_string())
                .or_insert_with(|| Value::from(self.message.clone()));
            extra
                .fields
                .entry("file".to_string())
                .or_insert_with(|| Value::from(self.file.clone()));
            extra
                .fields
                .entry("line".to_string())
                .or_insert_with(|| Value::from(self.line));
        }
        extra
    }
}
