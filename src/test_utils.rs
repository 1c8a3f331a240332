//! # Test Utilities
//!
//! Mock collaborators for exercising the dispatch pipeline without a real
//! runtime, log sink, or monitoring SDK. Kept in the library so integration
//! tests and embedders' test suites can reuse them.

use crate::error::Result;
use crate::error_handler::ErrorOutcome;
use crate::exception::ExceptionInfo;
use crate::failure::{FailureContext, FailureEvent, StackFrame};
use crate::handler::{Disposition, ErrorLogger, Handler, LogLevel, MonitoringAgent};
use crate::registry::DispatchOutcome;
use crate::runtime::{ErrorHook, ExceptionHook, LastError, Runtime, ShutdownHook};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default memory figure reported by [`MockRuntime`].
pub const MOCK_PEAK_MEMORY: u64 = 1_048_576;

/// Fake runtime signal source: stores hooks, lets tests deliver signals,
/// and answers the dispatcher's runtime queries with fixed data.
pub struct MockRuntime {
    error_hook: Mutex<Option<ErrorHook>>,
    exception_hook: Mutex<Option<ExceptionHook>>,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
    last_error: Mutex<Option<LastError>>,
    peak_memory: AtomicU64,
    cycles_collected: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            error_hook: Mutex::new(None),
            exception_hook: Mutex::new(None),
            shutdown_hooks: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
            peak_memory: AtomicU64::new(MOCK_PEAK_MEMORY),
            cycles_collected: AtomicUsize::new(0),
        }
    }

    pub fn set_peak_memory(&self, bytes: u64) {
        self.peak_memory.store(bytes, Ordering::SeqCst);
    }

    pub fn set_last_error(&self, kind_raw: u32, message: &str, file: &str, line: u32) {
        *self.last_error.lock() = Some(LastError {
            kind_raw,
            message: message.to_string(),
            file: file.to_string(),
            line,
        });
    }

    pub fn has_error_hook(&self) -> bool {
        self.error_hook.lock().is_some()
    }

    pub fn has_exception_hook(&self) -> bool {
        self.exception_hook.lock().is_some()
    }

    pub fn shutdown_hook_count(&self) -> usize {
        self.shutdown_hooks.lock().len()
    }

    pub fn cycles_collected(&self) -> usize {
        self.cycles_collected.load(Ordering::SeqCst)
    }

    /// Deliver a runtime error signal through the installed hook, the way
    /// the real runtime would.
    pub fn deliver_error(
        &self,
        kind_raw: u32,
        message: &str,
        file: &str,
        line: u32,
        context: Option<Value>,
    ) -> Result<ErrorOutcome> {
        let hook = self.error_hook.lock().clone();
        match hook {
            Some(hook) => hook(kind_raw, message, file, line, context),
            None => Ok(ErrorOutcome::Dispatched(DispatchOutcome::PassedThrough)),
        }
    }

    /// Deliver an uncaught exception through the installed hook.
    pub fn deliver_exception(&self, exception: ExceptionInfo) -> Result<DispatchOutcome> {
        let hook = self.exception_hook.lock().clone();
        match hook {
            Some(hook) => hook(exception),
            None => Ok(DispatchOutcome::PassedThrough),
        }
    }

    /// Fire all scheduled shutdown hooks in registration order.
    pub fn fire_shutdown(&self) {
        let hooks = self.shutdown_hooks.lock().clone();
        for hook in hooks {
            hook();
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for MockRuntime {
    fn swap_error_hook(&self, hook: Option<ErrorHook>) -> Option<ErrorHook> {
        std::mem::replace(&mut *self.error_hook.lock(), hook)
    }

    fn swap_exception_hook(&self, hook: Option<ExceptionHook>) -> Option<ExceptionHook> {
        std::mem::replace(&mut *self.exception_hook.lock(), hook)
    }

    fn register_shutdown_hook(&self, hook: ShutdownHook) {
        self.shutdown_hooks.lock().push(hook);
    }

    fn last_error(&self) -> Option<LastError> {
        self.last_error.lock().clone()
    }

    fn peak_memory_usage(&self) -> u64 {
        self.peak_memory.load(Ordering::SeqCst)
    }

    fn capture_backtrace(&self) -> Vec<StackFrame> {
        vec![
            StackFrame::at("app::faulty", "app.rs", 42),
            StackFrame::at("main", "main.rs", 7),
        ]
    }

    fn collect_cycles(&self) {
        self.cycles_collected.fetch_add(1, Ordering::SeqCst);
    }
}

/// Log sink recording every entry for assertions.
#[derive(Default)]
pub struct MockLogger {
    entries: Mutex<Vec<(LogLevel, String, Value)>>,
}

impl MockLogger {
    pub fn entries(&self) -> Vec<(LogLevel, String, Value)> {
        self.entries.lock().clone()
    }
}

impl ErrorLogger for MockLogger {
    fn log(&self, level: LogLevel, message: &str, context: &FailureContext) {
        self.entries
            .lock()
            .push((level, message.to_string(), context.to_json()));
    }
}

/// Monitoring agent recording reported errors and naming calls.
#[derive(Default)]
pub struct MockAgent {
    reports: Mutex<Vec<String>>,
    app_name: Mutex<Option<String>>,
    transaction_name: Mutex<Option<String>>,
}

impl MockAgent {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().clone()
    }

    pub fn app_name(&self) -> Option<String> {
        self.app_name.lock().clone()
    }

    pub fn transaction_name(&self) -> Option<String> {
        self.transaction_name.lock().clone()
    }
}

impl MonitoringAgent for MockAgent {
    fn report_error(&self, message: &str, _exception: Option<&ExceptionInfo>) {
        self.reports.lock().push(message.to_string());
    }

    fn set_app_name(&self, name: &str) {
        *self.app_name.lock() = Some(name.to_string());
    }

    fn set_transaction_name(&self, name: &str) {
        *self.transaction_name.lock() = Some(name.to_string());
    }
}

/// Handler that appends its name to a shared call log, for ordering and
/// short-circuit assertions.
pub struct RecordingHandler {
    name: String,
    calls: Arc<Mutex<Vec<String>>>,
    priority: Option<i32>,
    handle_non_fatal: bool,
    disposition: Disposition,
}

impl RecordingHandler {
    pub fn new(name: &str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::clone(calls),
            priority: None,
            handle_non_fatal: false,
            disposition: Disposition::Continue,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn non_fatal_aware(mut self) -> Self {
        self.handle_non_fatal = true;
        self
    }

    /// Make this handler stop the chain.
    pub fn stopping(mut self) -> Self {
        self.disposition = Disposition::Stop;
        self
    }
}

impl Handler for RecordingHandler {
    fn priority(&self) -> Option<i32> {
        self.priority
    }

    fn handle_non_fatal(&self) -> bool {
        self.handle_non_fatal
    }

    fn handle(&mut self, _event: &FailureEvent) -> Result<Disposition> {
        self.calls.lock().push(self.name.clone());
        Ok(self.disposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runtime_defaults() {
        let runtime = MockRuntime::new();
        assert_eq!(runtime.peak_memory_usage(), MOCK_PEAK_MEMORY);
        assert!(runtime.last_error().is_none());
        assert!(!runtime.capture_backtrace().is_empty());
    }

    #[test]
    fn test_recording_handler_logs_calls() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut handler = RecordingHandler::new("h", &calls).stopping();
        let event = FailureEvent {
            kind: crate::failure::ErrorKind::Error,
            display_type: "E_ERROR".to_string(),
            message: "m".to_string(),
            file: "f".to_string(),
            line: 1,
            extra: FailureContext::default(),
        };
        assert!(handler.handle(&event).unwrap().is_stop());
        assert_eq!(*calls.lock(), vec!["h"]);
    }
}
