//! # Handler Capability
//!
//! The extensibility surface of the interception layer. A handler is a
//! function from one [`FailureEvent`](crate::failure::FailureEvent) to a
//! [`Disposition`]: stop the chain or delegate to the next handler.
//!
//! Concrete handlers ship for the common leaves (closure adapter, log sink,
//! monitoring agent, CLI display). Presentation-heavy renderers such as an
//! HTML debug page are deliberately left to embedders; this trait plus the
//! context-bag accessors are the extension surface.

pub mod callback;
pub mod cli;
pub mod logger;
pub mod monitor;

pub use callback::CallbackHandler;
pub use cli::CliHandler;
pub use logger::{ErrorLogger, LogLevel, LoggerHandler, TracingLogger};
pub use monitor::{MonitorHandler, MonitoringAgent};

use crate::error::Result;
use crate::failure::{ErrorKind, FailureEvent};

/// Explicit two-state result of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fully handled: no lower-priority handler sees this failure.
    Stop,
    /// Delegate to the next handler in the chain.
    Continue,
}

impl Disposition {
    pub fn is_stop(self) -> bool {
        matches!(self, Disposition::Stop)
    }
}

/// A pluggable failure handler.
///
/// Registration samples [`priority`](Handler::priority) and
/// [`handle_non_fatal`](Handler::handle_non_fatal) once; the registry skips
/// non-fatal failures for handlers that do not opt in, so `handle` only ever
/// sees failures the handler asked for.
pub trait Handler: Send {
    /// Preferred chain position, lower runs first. `None` lets the registry
    /// assign the next default slot in registration order.
    fn priority(&self) -> Option<i32> {
        None
    }

    /// Whether warning-level failures should reach this handler. Defaults to
    /// false: by default a handler only sees fatal failures.
    fn handle_non_fatal(&self) -> bool {
        false
    }

    /// Inspect the failure and decide whether to stop the chain.
    ///
    /// An internal fault here is a setup bug, not a runtime failure to
    /// report; surface it as an error immediately rather than degrading
    /// silently.
    fn handle(&mut self, event: &FailureEvent) -> Result<Disposition>;

    /// The centralized skip decision: true when the failure is non-fatal
    /// and this handler did not opt into non-fatal failures.
    fn can_ignore(&self, kind: ErrorKind) -> bool {
        !kind.is_fatal() && !self.handle_non_fatal()
    }
}
