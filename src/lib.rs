#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cerberus
//!
//! Runtime error and exception interception with a priority-ordered handler
//! chain.
//!
//! ## Overview
//!
//! Cerberus hooks into a host runtime's global error, exception, and
//! shutdown signaling, normalizes heterogeneous failure events into a
//! uniform record, and dispatches that record through an ordered chain of
//! pluggable handlers: display, logging, external monitoring, process
//! termination, or anything else implementing the [`Handler`] trait.
//!
//! ## Architecture
//!
//! The core is the dispatch pipeline: priority-ordered registration, a
//! single-pass chain-of-responsibility walk with short-circuiting, and the
//! normalization of error vs. exception inputs into one common context bag.
//! Everything at the edges — the log sink, the monitoring SDK, the terminal
//! renderer — is a thin leaf behind a collaborator trait.
//!
//! ## Key Features
//!
//! - **Deterministic ordering**: handlers run in ascending priority order,
//!   stable on ties, with auto-assigned slots for unprioritized handlers
//! - **Fatal classification**: a pure per-kind predicate decides which
//!   handlers see warning-level failures
//! - **Exception conversion**: optionally re-raise runtime failures as
//!   typed exceptions that re-enter the pipeline through the catch-all path
//! - **Debug enrichment**: memory figures and stack snapshots attached to
//!   the context bag when debug mode is on
//! - **Reversible installation**: installing swaps the runtime's hooks and
//!   remembers the previous ones; uninstalling restores them
//!
//! ## Module Organization
//!
//! - [`error_handler`] - The dispatcher: installation, normalization paths,
//!   shared dispatch step
//! - [`registry`] - Priority-ordered handler storage and the chain walk
//! - [`handler`] - The handler capability and the bundled leaf handlers
//! - [`failure`] - Failure kinds, descriptors, and the context bag
//! - [`exception`] - Exception conversion and normalization records
//! - [`runtime`] - The injected runtime signal-source abstraction
//! - [`config`] - Dispatcher flags
//! - [`error`] - Structured error handling
//! - [`logging`] - `tracing` subscriber setup for embedders
//! - [`test_utils`] - Mock collaborators for pipeline tests
//!
//! ## Quick Start
//!
//! ```rust
//! use cerberus::runtime::HostedRuntime;
//! use cerberus::{ErrorHandler, ErrorHandlerConfig, LoggerHandler, TracingLogger};
//! use std::sync::Arc;
//!
//! # fn example() -> cerberus::Result<()> {
//! let runtime = Arc::new(HostedRuntime::new());
//! let handler = ErrorHandler::install(ErrorHandlerConfig::default(), runtime.clone())?;
//! handler.add_handler(Box::new(LoggerHandler::new(Arc::new(TracingLogger))));
//!
//! // The embedder raises signals; the dispatcher routes them through the
//! // handler chain in priority order.
//! runtime.raise_error(2, "resource is stale", "cache.rs", 88, None)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod error_handler;
pub mod exception;
pub mod failure;
pub mod handler;
pub mod logging;
pub mod registry;
pub mod runtime;
pub mod test_utils;

pub use config::ErrorHandlerConfig;
pub use error::{CerberusError, Result};
pub use error_handler::{ErrorHandler, ErrorOutcome};
pub use exception::{ErrorException, ExceptionInfo};
pub use failure::{ErrorKind, FailureContext, FailureEvent, StackFrame};
pub use handler::{
    CallbackHandler, CliHandler, Disposition, ErrorLogger, Handler, LogLevel, LoggerHandler,
    MonitorHandler, MonitoringAgent, TracingLogger,
};
pub use registry::{DispatchOutcome, HandlerRegistry};
pub use runtime::{HostedRuntime, LastError, Runtime};
