//! # Runtime Signal Source
//!
//! Abstraction over the host runtime's global failure hooks. The dispatcher
//! never touches hidden global state: it installs and removes hooks through
//! this capability, which also answers the runtime queries the dispatcher
//! needs (pending fatal at shutdown, memory figures, backtraces, cycle
//! collection). Tests inject a mock source; production embeddings drive
//! [`HostedRuntime`].

pub mod hosted;

pub use hosted::HostedRuntime;

use crate::error::Result;
use crate::error_handler::ErrorOutcome;
use crate::exception::ExceptionInfo;
use crate::failure::StackFrame;
use crate::registry::DispatchOutcome;
use serde_json::Value;
use std::sync::Arc;

/// Hook for non-fatal/recoverable runtime errors:
/// `(raw kind, message, file, line, structured context)`.
pub type ErrorHook =
    Arc<dyn Fn(u32, &str, &str, u32, Option<Value>) -> Result<ErrorOutcome> + Send + Sync>;

/// Hook for uncaught exceptions.
pub type ExceptionHook = Arc<dyn Fn(ExceptionInfo) -> Result<DispatchOutcome> + Send + Sync>;

/// End-of-process hook. Scheduled once; cannot be unregistered.
pub type ShutdownHook = Arc<dyn Fn() + Send + Sync>;

/// A fatal failure the runtime recorded but never surfaced through the
/// error hook (out-of-memory and friends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub kind_raw: u32,
    pub message: String,
    pub file: String,
    pub line: u32,
}

/// The runtime's failure-signaling surface, injected into the dispatcher.
pub trait Runtime: Send + Sync {
    /// Install or remove the error hook, returning the previous one so the
    /// dispatcher can restore it on teardown.
    fn swap_error_hook(&self, hook: Option<ErrorHook>) -> Option<ErrorHook>;

    /// Install or remove the uncaught-exception hook, returning the
    /// previous one.
    fn swap_exception_hook(&self, hook: Option<ExceptionHook>) -> Option<ExceptionHook>;

    /// Schedule an end-of-process hook. Fire-and-forget: once scheduled it
    /// always runs, so the hook itself must check whether its owner is
    /// still active.
    fn register_shutdown_hook(&self, hook: ShutdownHook);

    /// The last fatal failure that never reached the error hook, if any.
    fn last_error(&self) -> Option<LastError>;

    /// Peak memory usage figure for debug enrichment.
    fn peak_memory_usage(&self) -> u64;

    /// Snapshot of the current call stack, without argument capture.
    fn capture_backtrace(&self) -> Vec<StackFrame>;

    /// Reclaim cyclic garbage before processing a possible out-of-memory
    /// fatal. A no-op on runtimes without cycle collection.
    fn collect_cycles(&self);
}
