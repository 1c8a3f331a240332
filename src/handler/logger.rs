//! # Logging Handler
//!
//! Routes failures to a pluggable [`ErrorLogger`] sink with a per-kind
//! severity table. Ships with [`TracingLogger`], which maps the levels onto
//! `tracing` events.

use crate::error::Result;
use crate::failure::{ErrorKind, FailureContext, FailureEvent};
use crate::handler::{Disposition, Handler};
use std::collections::HashMap;
use std::sync::Arc;

/// Log severity, richest-first. Follows the syslog scale so sink
/// implementations can map it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

/// Collaborator the handler writes to.
pub trait ErrorLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &FailureContext);
}

/// Default chain position: late, after monitoring.
pub const DEFAULT_LOGGER_PRIORITY: i32 = 100;

/// Status codes below this threshold log at the non-critical level.
pub const DEFAULT_STATUS_THRESHOLD: u16 = 500;

pub struct LoggerHandler {
    logger: Arc<dyn ErrorLogger>,
    priority: i32,
    handle_non_fatal: bool,
    call_next_handler: bool,
    level_overrides: HashMap<ErrorKind, LogLevel>,
    status_threshold: u16,
    critical_exception_level: LogLevel,
    non_critical_exception_level: LogLevel,
}

impl LoggerHandler {
    pub fn new(logger: Arc<dyn ErrorLogger>) -> Self {
        Self {
            logger,
            priority: DEFAULT_LOGGER_PRIORITY,
            handle_non_fatal: true,
            call_next_handler: true,
            level_overrides: HashMap::new(),
            status_threshold: DEFAULT_STATUS_THRESHOLD,
            critical_exception_level: LogLevel::Critical,
            non_critical_exception_level: LogLevel::Warning,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_handle_non_fatal(mut self, handle_non_fatal: bool) -> Self {
        self.handle_non_fatal = handle_non_fatal;
        self
    }

    /// When false, the handler stops the chain after logging.
    pub fn with_call_next_handler(mut self, call_next_handler: bool) -> Self {
        self.call_next_handler = call_next_handler;
        self
    }

    /// Override individual entries of the default per-kind level table.
    pub fn with_level_overrides(mut self, overrides: HashMap<ErrorKind, LogLevel>) -> Self {
        self.level_overrides = overrides;
        self
    }

    /// Status-bearing exceptions below this threshold log at the
    /// non-critical level.
    pub fn with_status_threshold(mut self, threshold: u16) -> Self {
        self.status_threshold = threshold;
        self
    }

    fn level_for(&self, kind: ErrorKind) -> LogLevel {
        if let Some(level) = self.level_overrides.get(&kind) {
            return *level;
        }
        default_error_level(kind)
    }

    fn exception_level(&self, extra: &FailureContext) -> LogLevel {
        if let Some(code) = extra.code {
            if code < self.status_threshold {
                return self.non_critical_exception_level;
            }
        } else if let Some(severity) = extra.exception.as_ref().and_then(|e| e.severity()) {
            return self.level_for(severity);
        }
        self.critical_exception_level
    }
}

/// Default per-kind severity table. Unknown kinds log critical so
/// misclassified failures are loud, not lost.
pub fn default_error_level(kind: ErrorKind) -> LogLevel {
    match kind {
        ErrorKind::Error | ErrorKind::CoreError => LogLevel::Critical,
        ErrorKind::Parse | ErrorKind::CompileError => LogLevel::Alert,
        ErrorKind::UserError | ErrorKind::RecoverableError => LogLevel::Error,
        ErrorKind::Warning
        | ErrorKind::CoreWarning
        | ErrorKind::CompileWarning
        | ErrorKind::UserWarning => LogLevel::Warning,
        ErrorKind::Notice
        | ErrorKind::UserNotice
        | ErrorKind::Strict
        | ErrorKind::Deprecated
        | ErrorKind::UserDeprecated => LogLevel::Notice,
        ErrorKind::Exception | ErrorKind::Unknown(_) => LogLevel::Critical,
    }
}

impl Handler for LoggerHandler {
    fn priority(&self) -> Option<i32> {
        Some(self.priority)
    }

    fn handle_non_fatal(&self) -> bool {
        self.handle_non_fatal
    }

    fn handle(&mut self, event: &FailureEvent) -> Result<Disposition> {
        let extra = event.sink_context();
        let level = if extra.exception.is_some() {
            self.exception_level(&extra)
        } else {
            self.level_for(event.kind)
        };

        self.logger.log(level, &event.formatted_message(), &extra);

        if self.call_next_handler {
            Ok(Disposition::Continue)
        } else {
            Ok(Disposition::Stop)
        }
    }
}

/// [`ErrorLogger`] sink emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ErrorLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &FailureContext) {
        let context = context.to_json();
        match level {
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical | LogLevel::Error => {
                tracing::error!(context = %context, "{message}");
            }
            LogLevel::Warning => {
                tracing::warn!(context = %context, "{message}");
            }
            LogLevel::Notice | LogLevel::Info => {
                tracing::info!(context = %context, "{message}");
            }
            LogLevel::Debug => {
                tracing::debug!(context = %context, "{message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{ErrorException, ExceptionInfo};
    use crate::test_utils::MockLogger;

    fn error_event(kind: ErrorKind) -> FailureEvent {
        FailureEvent {
            kind,
            display_type: kind.label().to_string(),
            message: "m".to_string(),
            file: "f".to_string(),
            line: 5,
            extra: FailureContext::default(),
        }
    }

    fn exception_event(info: ExceptionInfo, code: Option<u16>) -> FailureEvent {
        FailureEvent {
            kind: ErrorKind::Exception,
            display_type: info.name.clone(),
            message: info.message.clone(),
            file: info.file.clone(),
            line: info.line,
            extra: FailureContext {
                exception: Some(info),
                code,
                ..FailureContext::default()
            },
        }
    }

    #[test]
    fn test_notice_maps_to_notice_level() {
        let logger = Arc::new(MockLogger::default());
        let mut handler = LoggerHandler::new(Arc::clone(&logger) as Arc<dyn ErrorLogger>);

        let disposition = handler.handle(&error_event(ErrorKind::Notice)).unwrap();
        assert_eq!(disposition, Disposition::Continue);

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, LogLevel::Notice);
        assert!(entries[0].1.contains('m'));
        assert!(entries[0].1.contains('f'));
        assert!(entries[0].1.contains('5'));
    }

    #[test]
    fn test_default_level_table() {
        assert_eq!(default_error_level(ErrorKind::Error), LogLevel::Critical);
        assert_eq!(default_error_level(ErrorKind::Parse), LogLevel::Alert);
        assert_eq!(default_error_level(ErrorKind::UserError), LogLevel::Error);
        assert_eq!(default_error_level(ErrorKind::Warning), LogLevel::Warning);
        assert_eq!(default_error_level(ErrorKind::Deprecated), LogLevel::Notice);
        assert_eq!(
            default_error_level(ErrorKind::Unknown(31337)),
            LogLevel::Critical
        );
    }

    #[test]
    fn test_level_overrides_replace_defaults() {
        let logger = Arc::new(MockLogger::default());
        let mut overrides = HashMap::new();
        overrides.insert(ErrorKind::Notice, LogLevel::Debug);
        let mut handler = LoggerHandler::new(Arc::clone(&logger) as Arc<dyn ErrorLogger>)
            .with_level_overrides(overrides);

        handler.handle(&error_event(ErrorKind::Notice)).unwrap();
        assert_eq!(logger.entries()[0].0, LogLevel::Debug);
    }

    #[test]
    fn test_converted_exception_logs_at_original_severity() {
        let logger = Arc::new(MockLogger::default());
        let mut handler = LoggerHandler::new(Arc::clone(&logger) as Arc<dyn ErrorLogger>);

        let converted = ErrorException::new("w", ErrorKind::Warning, "f", 2);
        let info = ExceptionInfo::from_error(converted);
        handler.handle(&exception_event(info, None)).unwrap();

        assert_eq!(logger.entries()[0].0, LogLevel::Warning);
    }

    #[test]
    fn test_status_code_filter() {
        let logger = Arc::new(MockLogger::default());
        let mut handler = LoggerHandler::new(Arc::clone(&logger) as Arc<dyn ErrorLogger>);

        let not_found = ExceptionInfo::new("HttpError", "not found", "f", 1).with_code(404);
        handler
            .handle(&exception_event(not_found.clone(), not_found.code))
            .unwrap();

        let upstream = ExceptionInfo::new("HttpError", "bad gateway", "f", 1).with_code(502);
        handler
            .handle(&exception_event(upstream.clone(), upstream.code))
            .unwrap();

        let entries = logger.entries();
        assert_eq!(entries[0].0, LogLevel::Warning);
        assert_eq!(entries[1].0, LogLevel::Critical);
    }

    #[test]
    fn test_stop_when_not_calling_next() {
        let logger = Arc::new(MockLogger::default());
        let mut handler = LoggerHandler::new(Arc::clone(&logger) as Arc<dyn ErrorLogger>)
            .with_call_next_handler(false);
        assert!(handler.handle(&error_event(ErrorKind::Error)).unwrap().is_stop());
    }

    #[test]
    fn test_defaults() {
        let logger = Arc::new(MockLogger::default());
        let handler = LoggerHandler::new(logger as Arc<dyn ErrorLogger>);
        assert_eq!(handler.priority(), Some(100));
        assert!(handler.handle_non_fatal());
    }
}
