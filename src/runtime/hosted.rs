//! # Hosted Runtime
//!
//! In-process [`Runtime`] implementation for embeddings that raise failure
//! signals themselves: an interpreter, a plugin host, or application glue
//! code. The embedder calls [`HostedRuntime::raise_error`],
//! [`HostedRuntime::raise_exception`], and [`HostedRuntime::run_shutdown`];
//! installed hooks observe the signals exactly as they would from a native
//! runtime.
//!
//! Backtraces come from the `backtrace` crate, memory figures from
//! `sysinfo`. Cycle collection is a no-op hook point here since this
//! runtime has no cycle collector of its own.

use crate::error::Result;
use crate::error_handler::ErrorOutcome;
use crate::exception::ExceptionInfo;
use crate::failure::StackFrame;
use crate::registry::DispatchOutcome;
use crate::runtime::{ErrorHook, ExceptionHook, LastError, Runtime, ShutdownHook};
use parking_lot::Mutex;
use serde_json::Value;
use sysinfo::{get_current_pid, ProcessesToUpdate, System};
use tracing::warn;

pub struct HostedRuntime {
    error_hook: Mutex<Option<ErrorHook>>,
    exception_hook: Mutex<Option<ExceptionHook>>,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
    last_error: Mutex<Option<LastError>>,
    system: Mutex<System>,
}

impl HostedRuntime {
    pub fn new() -> Self {
        Self {
            error_hook: Mutex::new(None),
            exception_hook: Mutex::new(None),
            shutdown_hooks: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
            system: Mutex::new(System::new()),
        }
    }

    /// Signal a runtime error. The failure is recorded as the last error
    /// before hook delivery so the shutdown path can still find it if the
    /// hook chain never absorbs it.
    pub fn raise_error(
        &self,
        kind_raw: u32,
        message: &str,
        file: &str,
        line: u32,
        context: Option<Value>,
    ) -> Result<ErrorOutcome> {
        *self.last_error.lock() = Some(LastError {
            kind_raw,
            message: message.to_string(),
            file: file.to_string(),
            line,
        });

        let hook = self.error_hook.lock().clone();
        match hook {
            Some(hook) => hook(kind_raw, message, file, line, context),
            None => Ok(ErrorOutcome::Dispatched(DispatchOutcome::PassedThrough)),
        }
    }

    /// Signal an uncaught exception.
    pub fn raise_exception(&self, exception: ExceptionInfo) -> Result<DispatchOutcome> {
        let hook = self.exception_hook.lock().clone();
        match hook {
            Some(hook) => hook(exception),
            None => Ok(DispatchOutcome::PassedThrough),
        }
    }

    /// Run all scheduled shutdown hooks in registration order.
    pub fn run_shutdown(&self) {
        let hooks = self.shutdown_hooks.lock().clone();
        for hook in hooks {
            hook();
        }
    }

    /// Clear the recorded last error, e.g. after it was absorbed.
    pub fn clear_last_error(&self) {
        *self.last_error.lock() = None;
    }
}

impl Default for HostedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for HostedRuntime {
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
        let pid = match get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                warn!("Could not resolve current pid for memory figure: {e}");
                return 0;
            }
        };

        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(|process| process.memory()).unwrap_or(0)
    }

    fn capture_backtrace(&self) -> Vec<StackFrame> {
        let mut frames = Vec::new();
        for frame in backtrace::Backtrace::new().frames() {
            for symbol in frame.symbols() {
                frames.push(StackFrame {
                    function: symbol
                        .name()
                        .map(|name| name.to_string())
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    file: symbol
                        .filename()
                        .map(|path| path.display().to_string()),
                    line: symbol.lineno(),
                });
            }
        }
        frames
    }

    fn collect_cycles(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_raise_error_without_hook_passes_through() {
        let runtime = HostedRuntime::new();
        let outcome = runtime.raise_error(1, "oom", "alloc.rs", 3, None).unwrap();
        assert_eq!(
            outcome,
            ErrorOutcome::Dispatched(DispatchOutcome::PassedThrough)
        );

        // Still recorded for the shutdown path.
        let last = runtime.last_error().unwrap();
        assert_eq!(last.kind_raw, 1);
        assert_eq!(last.message, "oom");
    }

    #[test]
    fn test_hook_swap_returns_previous() {
        let runtime = HostedRuntime::new();
        let first: ErrorHook = Arc::new(|_, _, _, _, _| {
            Ok(ErrorOutcome::Dispatched(DispatchOutcome::Absorbed))
        });

        assert!(runtime.swap_error_hook(Some(first)).is_none());
        let previous = runtime.swap_error_hook(None);
        assert!(previous.is_some());
        assert!(runtime.error_hook.lock().is_none());
    }

    #[test]
    fn test_shutdown_hooks_run_in_order() {
        let runtime = HostedRuntime::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for expected in 0..3 {
            let counter = Arc::clone(&counter);
            runtime.register_shutdown_hook(Arc::new(move || {
                assert_eq!(counter.fetch_add(1, Ordering::SeqCst), expected);
            }));
        }

        runtime.run_shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backtrace_capture_is_non_empty() {
        let runtime = HostedRuntime::new();
        let frames = runtime.capture_backtrace();
        assert!(!frames.is_empty());
    }
}
