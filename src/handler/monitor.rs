//! # Monitoring Handler
//!
//! Forwards failures to an external monitoring agent (an APM or error
//! tracking SDK) through the [`MonitoringAgent`] collaborator trait. The
//! vendor SDK stays outside the core; tests use a mock agent.

use crate::error::Result;
use crate::exception::ExceptionInfo;
use crate::failure::FailureEvent;
use crate::handler::{Disposition, Handler};
use std::sync::Arc;

/// External monitoring SDK surface.
pub trait MonitoringAgent: Send + Sync {
    fn report_error(&self, message: &str, exception: Option<&ExceptionInfo>);
    fn set_app_name(&self, name: &str);
    fn set_transaction_name(&self, name: &str);
}

/// Default chain position: just before logging.
pub const DEFAULT_MONITOR_PRIORITY: i32 = 95;

/// Status codes below this threshold are not worth an external report.
pub const DEFAULT_STATUS_THRESHOLD: u16 = 500;

pub struct MonitorHandler {
    agent: Arc<dyn MonitoringAgent>,
    priority: i32,
    handle_non_fatal: bool,
    call_next_handler: bool,
    status_threshold: u16,
}

impl MonitorHandler {
    pub fn new(agent: Arc<dyn MonitoringAgent>) -> Self {
        Self {
            agent,
            priority: DEFAULT_MONITOR_PRIORITY,
            handle_non_fatal: false,
            call_next_handler: true,
            status_threshold: DEFAULT_STATUS_THRESHOLD,
        }
    }

    pub fn with_app_name(self, name: &str) -> Self {
        self.agent.set_app_name(name);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_handle_non_fatal(mut self, handle_non_fatal: bool) -> Self {
        self.handle_non_fatal = handle_non_fatal;
        self
    }

    /// When false, the handler stops the chain after reporting.
    pub fn with_call_next_handler(mut self, call_next_handler: bool) -> Self {
        self.call_next_handler = call_next_handler;
        self
    }

    pub fn with_status_threshold(mut self, threshold: u16) -> Self {
        self.status_threshold = threshold;
        self
    }

    pub fn set_transaction_name(&self, name: &str) {
        self.agent.set_transaction_name(name);
    }
}

impl Handler for MonitorHandler {
    fn priority(&self) -> Option<i32> {
        Some(self.priority)
    }

    fn handle_non_fatal(&self) -> bool {
        self.handle_non_fatal
    }

    fn handle(&mut self, event: &FailureEvent) -> Result<Disposition> {
        // Client-class statuses are expected traffic, not incidents.
        if let Some(code) = event.extra.code {
            if code < self.status_threshold {
                return Ok(Disposition::Continue);
            }
        }

        self.agent
            .report_error(&event.formatted_message(), event.extra.exception.as_ref());

        if self.call_next_handler {
            Ok(Disposition::Continue)
        } else {
            Ok(Disposition::Stop)
        }
    }
}
