//! # Error Handler Dispatcher
//!
//! The single point of recovery for runtime failures.
//!
//! ## Overview
//!
//! One `ErrorHandler` installs itself as the process-wide interceptor for
//! three signals on an injected [`Runtime`]: recoverable runtime errors,
//! uncaught exceptions, and end-of-process cleanup. Each signal is
//! normalized into a [`FailureEvent`] and walked through the priority-
//! ordered [`HandlerRegistry`]. While installed and enabled, no failure
//! escapes to the runtime's default behavior: it is absorbed by a handler,
//! absorbed by an empty or fully-delegating chain, or converted into a
//! typed exception that re-enters through the exception path.
//!
//! ## Lifecycle
//!
//! `Uninstalled -> Installed` ([`ErrorHandler::install`]) `-> Disabled <->
//! Enabled` (toggle any time) `-> Uninstalled` ([`ErrorHandler::uninstall`],
//! restoring the previously-installed hooks). The shutdown hook stays
//! scheduled across teardown at the runtime level, so it checks an internal
//! "still registered" flag and becomes a no-op after uninstall.
//!
//! ## Usage
//!
//! ```rust
//! use cerberus::{CliHandler, ErrorHandler, ErrorHandlerConfig};
//! use cerberus::runtime::HostedRuntime;
//! use std::sync::Arc;
//!
//! # fn example() -> cerberus::Result<()> {
//! let runtime = Arc::new(HostedRuntime::new());
//! let handler = ErrorHandler::install(ErrorHandlerConfig::default(), runtime.clone())?;
//! handler.add_handler(Box::new(CliHandler::with_writer(
//!     Box::new(std::io::sink()),
//!     true,
//! )));
//!
//! // the embedder raises signals; installed hooks route them here
//! runtime.raise_error(8, "value not set", "app.rs", 12, None)?;
//! # Ok(())
//! # }
//! ```

use crate::config::ErrorHandlerConfig;
use crate::error::{CerberusError, Result};
use crate::exception::{ErrorException, ExceptionInfo};
use crate::failure::{ErrorKind, FailureContext, FailureEvent};
use crate::handler::{CallbackHandler, Disposition, Handler};
use crate::registry::{DispatchOutcome, HandlerRegistry};
use crate::runtime::{ErrorHook, ExceptionHook, Runtime};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Result of the error path: either a completed dispatch or a typed
/// exception the embedder must propagate (which, uncaught, re-enters via
/// [`ErrorHandler::on_exception`]).
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorOutcome {
    Dispatched(DispatchOutcome),
    Raised(ErrorException),
}

struct DispatcherState {
    disabled: bool,
    debug: bool,
    throw_exceptions: bool,
    throw_non_fatal: bool,
    registry: HandlerRegistry,
    /// Failure-of-last-resort headroom, released first thing at shutdown.
    reserved_memory: Vec<u8>,
    previous_error_hook: Option<ErrorHook>,
    previous_exception_hook: Option<ExceptionHook>,
}

/// Process-wide failure dispatcher. See the module docs for the lifecycle.
pub struct ErrorHandler {
    runtime: Arc<dyn Runtime>,
    state: Mutex<DispatcherState>,
    registered: AtomicBool,
}

impl ErrorHandler {
    /// Construct a dispatcher and install it on the runtime, remembering
    /// the previously-installed hooks for restoration at teardown.
    pub fn install(
        config: ErrorHandlerConfig,
        runtime: Arc<dyn Runtime>,
    ) -> Result<Arc<ErrorHandler>> {
        let handler = Arc::new(ErrorHandler {
            runtime,
            state: Mutex::new(DispatcherState {
                disabled: false,
                debug: config.debug,
                throw_exceptions: config.throw_exceptions,
                throw_non_fatal: config.throw_non_fatal,
                registry: HandlerRegistry::with_priority_seed(config.priority_seed),
                reserved_memory: vec![0u8; config.reserved_memory_bytes],
                previous_error_hook: None,
                previous_exception_hook: None,
            }),
            registered: AtomicBool::new(false),
        });
        handler.register()?;
        Ok(handler)
    }

    fn register(self: &Arc<Self>) -> Result<()> {
        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(CerberusError::RegistrationError(
                "Error handler is already installed".to_string(),
            ));
        }

        let error_hook: ErrorHook = {
            let weak = Arc::downgrade(self);
            Arc::new(move |kind_raw, message, file, line, context| {
                match Weak::upgrade(&weak) {
                    Some(handler) => handler.on_error(
                        ErrorKind::from_raw(kind_raw),
                        message,
                        file,
                        line,
                        context,
                    ),
                    None => Ok(ErrorOutcome::Dispatched(DispatchOutcome::PassedThrough)),
                }
            })
        };

        let exception_hook: ExceptionHook = {
            let weak = Arc::downgrade(self);
            Arc::new(move |exception| match Weak::upgrade(&weak) {
                Some(handler) => handler.on_exception_info(exception),
                None => Ok(DispatchOutcome::PassedThrough),
            })
        };

        let shutdown_hook = {
            let weak = Arc::downgrade(self);
            Arc::new(move || {
                if let Some(handler) = Weak::upgrade(&weak) {
                    if let Err(e) = handler.on_shutdown() {
                        warn!("Shutdown-time failure dispatch failed: {e}");
                    }
                }
            })
        };

        let previous_error_hook = self.runtime.swap_error_hook(Some(error_hook));
        let previous_exception_hook = self.runtime.swap_exception_hook(Some(exception_hook));
        self.runtime.register_shutdown_hook(shutdown_hook);

        let mut state = self.state.lock();
        state.previous_error_hook = previous_error_hook;
        state.previous_exception_hook = previous_exception_hook;

        info!("Installed error handler as process-wide failure interceptor");
        Ok(())
    }

    /// Tear down, restoring whatever hooks were installed before. The
    /// shutdown hook cannot be unregistered; it checks the registered flag
    /// instead.
    pub fn uninstall(&self) -> Result<()> {
        if !self.registered.swap(false, Ordering::SeqCst) {
            return Err(CerberusError::RegistrationError(
                "Error handler is not installed".to_string(),
            ));
        }

        let (previous_error_hook, previous_exception_hook) = {
            let mut state = self.state.lock();
            (
                state.previous_error_hook.take(),
                state.previous_exception_hook.take(),
            )
        };
        self.runtime.swap_error_hook(previous_error_hook);
        self.runtime.swap_exception_hook(previous_exception_hook);

        info!("Uninstalled error handler, previous hooks restored");
        Ok(())
    }

    /// Whether this dispatcher is currently installed on the runtime.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Resume dispatching after [`ErrorHandler::disable`].
    pub fn enable(&self) {
        self.state.lock().disabled = false;
    }

    /// Let failures pass through invisibly without touching the registry,
    /// e.g. to silence reporting around a known-noisy operation.
    pub fn disable(&self) {
        self.state.lock().disabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        !self.state.lock().disabled
    }

    pub fn set_debug(&self, debug: bool) {
        self.state.lock().debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.state.lock().debug
    }

    pub fn set_throw_exceptions(&self, throw_exceptions: bool) {
        self.state.lock().throw_exceptions = throw_exceptions;
    }

    pub fn throw_exceptions(&self) -> bool {
        self.state.lock().throw_exceptions
    }

    pub fn set_throw_non_fatal(&self, throw_non_fatal: bool) {
        self.state.lock().throw_non_fatal = throw_non_fatal;
    }

    pub fn throw_non_fatal(&self) -> bool {
        self.state.lock().throw_non_fatal
    }

    /// Public fatal-kind predicate so handlers never duplicate the
    /// classification table.
    pub fn is_fatal(kind: ErrorKind) -> bool {
        kind.is_fatal()
    }

    /// Register a handler, honoring its preferred priority.
    pub fn add_handler(&self, handler: Box<dyn Handler>) {
        self.state.lock().registry.add(handler);
    }

    /// Register a handler at an explicit priority.
    pub fn add_handler_with_priority(&self, handler: Box<dyn Handler>, priority: i32) {
        self.state.lock().registry.add_with_priority(handler, priority);
    }

    /// Register a plain closure as a handler.
    pub fn add_callback<F>(&self, callback: F, handle_non_fatal: bool)
    where
        F: FnMut(&str, &FailureContext) -> Disposition + Send + 'static,
    {
        self.add_handler(Box::new(CallbackHandler::new(callback, handle_non_fatal)));
    }

    pub fn handler_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Error normalization path.
    ///
    /// In conversion mode (and for a fatal failure, or any failure with
    /// `throw_non_fatal`), returns [`ErrorOutcome::Raised`] carrying the
    /// structured context when present; dispatch is aborted and control
    /// passes to the exception path once the raised value goes uncaught.
    /// Otherwise builds the context bag and runs the shared dispatch step.
    pub fn on_error(
        &self,
        kind: ErrorKind,
        message: &str,
        file: &str,
        line: u32,
        context: Option<Value>,
    ) -> Result<ErrorOutcome> {
        let context = context.filter(|value| !context_is_empty(value));

        let mut state = self.state.lock();
        if state.throw_exceptions && (state.throw_non_fatal || kind.is_fatal()) {
            let exception = match context {
                Some(context) => {
                    ErrorException::with_context(message, kind, file, line, context)
                }
                None => ErrorException::new(message, kind, file, line),
            };
            debug!(
                kind = kind.label(),
                "Converting runtime failure into raised exception"
            );
            return Ok(ErrorOutcome::Raised(exception));
        }

        let mut extra = FailureContext {
            context,
            ..FailureContext::default()
        };
        self.enrich(&state, &mut extra);

        let event = FailureEvent {
            kind,
            display_type: kind.label().to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            extra,
        };
        Ok(ErrorOutcome::Dispatched(Self::dispatch(&mut state, &event)?))
    }

    /// Exception normalization path for any concrete error type. The type
    /// name is captured here for the display label.
    pub fn on_exception<E>(&self, exception: E) -> Result<DispatchOutcome>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.on_exception_info(ExceptionInfo::from_error(exception))
    }

    /// Exception normalization path for an already-normalized record.
    ///
    /// The display label names the exception type, with the original error
    /// level appended for exceptions produced by the conversion path. The
    /// context bag stores the exception under its dedicated slot and never
    /// flattens its fields; no stack trace is synthesized since the
    /// exception owns its own.
    pub fn on_exception_info(&self, exception: ExceptionInfo) -> Result<DispatchOutcome> {
        let display_type = match exception.severity() {
            Some(severity) => format!("{} ({})", exception.name, severity.label()),
            None => exception.name.clone(),
        };

        let mut state = self.state.lock();
        let mut extra = FailureContext {
            code: exception.code,
            ..FailureContext::default()
        };
        let (message, file, line) = (
            exception.message.clone(),
            exception.file.clone(),
            exception.line,
        );
        extra.exception = Some(exception);
        self.enrich(&state, &mut extra);

        let event = FailureEvent {
            kind: ErrorKind::Exception,
            display_type,
            message,
            file,
            line,
            extra,
        };
        Self::dispatch(&mut state, &event)
    }

    /// End-of-process path.
    ///
    /// Releases the reserved buffer before anything else so an
    /// out-of-memory fatal can still be processed, reclaims cyclic garbage,
    /// then routes any pending unsurfaced fatal through the shared dispatch
    /// step. No-op once the dispatcher is uninstalled (the runtime cannot
    /// unschedule the hook). Shutdown-time failures are never converted to
    /// exceptions.
    pub fn on_shutdown(&self) -> Result<Option<DispatchOutcome>> {
        if !self.registered.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut state = self.state.lock();
        state.reserved_memory = Vec::new();
        self.runtime.collect_cycles();

        let Some(last) = self.runtime.last_error() else {
            return Ok(None);
        };

        let kind = ErrorKind::from_raw(last.kind_raw);
        let mut extra = FailureContext::default();
        self.enrich(&state, &mut extra);

        let event = FailureEvent {
            kind,
            display_type: kind.label().to_string(),
            message: last.message,
            file: last.file,
            line: last.line,
            extra,
        };
        debug!(
            kind = kind.label(),
            "Dispatching unsurfaced fatal found at shutdown"
        );
        Ok(Some(Self::dispatch(&mut state, &event)?))
    }

    /// Debug enrichment: memory figure always, stack snapshot only for
    /// non-exception failures.
    fn enrich(&self, state: &DispatcherState, extra: &mut FailureContext) {
        if !state.debug {
            return;
        }
        extra.memory = Some(self.runtime.peak_memory_usage());
        if extra.exception.is_none() {
            extra.trace = Some(self.runtime.capture_backtrace());
        }
    }

    /// Shared dispatch step. A disabled dispatcher reports
    /// [`DispatchOutcome::PassedThrough`] without touching the registry;
    /// otherwise the walk always reports absorbed, stopped early or not.
    fn dispatch(state: &mut DispatcherState, event: &FailureEvent) -> Result<DispatchOutcome> {
        if state.disabled {
            debug!(
                kind = event.kind.label(),
                "Dispatcher disabled, failure passes through unobserved"
            );
            return Ok(DispatchOutcome::PassedThrough);
        }

        state.registry.dispatch(event)
    }
}

fn context_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(values) => values.is_empty(),
        _ => false,
    }
}
