//! # Handler Registry
//!
//! Registry for failure handlers with deterministic priority ordering.
//!
//! ## Overview
//!
//! The HandlerRegistry keeps registrations fully sorted ascending by
//! priority. Handlers registered without an explicit priority receive the
//! next integer from a monotonically increasing counter, so they run in
//! registration order relative to each other and after any explicitly
//! lower-numbered handler. Equal priorities keep insertion order (the sort
//! is stable).
//!
//! Dispatch walks the chain once: handlers that did not opt into non-fatal
//! failures are skipped for those, and a [`Disposition::Stop`] terminates
//! the walk. Whether a handler stopped the walk, every handler delegated,
//! or the registry is empty, the dispatch reports
//! [`DispatchOutcome::Absorbed`]; there is no "unhandled" terminal state on
//! this path. Only a disabled dispatcher reports
//! [`DispatchOutcome::PassedThrough`].

use crate::config::DEFAULT_PRIORITY_SEED;
use crate::error::Result;
use crate::failure::FailureEvent;
use crate::handler::Handler;
use tracing::{debug, trace};

/// Result of one full dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The failure reached the end of the chain (or was stopped early)
    /// without propagating further.
    Absorbed,
    /// The dispatcher was disabled; no handler observed the failure.
    PassedThrough,
}

impl DispatchOutcome {
    pub fn is_absorbed(self) -> bool {
        matches!(self, DispatchOutcome::Absorbed)
    }
}

/// One registered handler with its chain metadata, sampled once at
/// registration time.
pub struct Registration {
    handler: Box<dyn Handler>,
    priority: i32,
    handle_non_fatal: bool,
}

impl Registration {
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn handle_non_fatal(&self) -> bool {
        self.handle_non_fatal
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("handler", &"<Box<dyn Handler>>".to_string())
            .field("priority", &self.priority)
            .field("handle_non_fatal", &self.handle_non_fatal)
            .finish()
    }
}

/// Priority-ordered collection of handlers.
#[derive(Debug)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
    next_priority: i32,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::with_priority_seed(DEFAULT_PRIORITY_SEED)
    }

    /// Seed the auto-assignment counter; handlers without an explicit
    /// priority receive consecutive integers starting here.
    pub fn with_priority_seed(seed: i32) -> Self {
        Self {
            registrations: Vec::new(),
            next_priority: seed,
        }
    }

    /// Register a handler, honoring its preferred priority when it has one.
    pub fn add(&mut self, handler: Box<dyn Handler>) {
        match handler.priority() {
            Some(priority) => self.insert(handler, priority),
            None => {
                let priority = self.next_priority;
                self.next_priority += 1;
                self.insert(handler, priority);
            }
        }
    }

    /// Register a handler at an explicit priority, overriding its own
    /// preference.
    pub fn add_with_priority(&mut self, handler: Box<dyn Handler>, priority: i32) {
        self.insert(handler, priority);
    }

    fn insert(&mut self, handler: Box<dyn Handler>, priority: i32) {
        let handle_non_fatal = handler.handle_non_fatal();
        self.registrations.push(Registration {
            handler,
            priority,
            handle_non_fatal,
        });
        // Stable: equal priorities keep insertion order.
        self.registrations.sort_by_key(Registration::priority);

        debug!(
            priority = priority,
            handle_non_fatal = handle_non_fatal,
            total_handlers = self.registrations.len(),
            "Registered failure handler"
        );
    }

    /// Walk the chain in ascending priority order.
    ///
    /// Empty registries degenerate to a no-op that still reports
    /// [`DispatchOutcome::Absorbed`].
    pub fn dispatch(&mut self, event: &FailureEvent) -> Result<DispatchOutcome> {
        let fatal = event.kind.is_fatal();

        for registration in &mut self.registrations {
            if !fatal && !registration.handle_non_fatal {
                trace!(
                    priority = registration.priority,
                    kind = event.kind.label(),
                    "Skipping handler for non-fatal failure"
                );
                continue;
            }

            if registration.handler.handle(event)?.is_stop() {
                debug!(
                    priority = registration.priority,
                    kind = event.kind.label(),
                    "Handler stopped propagation"
                );
                return Ok(DispatchOutcome::Absorbed);
            }
        }

        Ok(DispatchOutcome::Absorbed)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Assigned priorities in chain order.
    pub fn priorities(&self) -> Vec<i32> {
        self.registrations.iter().map(Registration::priority).collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{ErrorKind, FailureContext};
    use crate::test_utils::RecordingHandler;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn event(kind: ErrorKind) -> FailureEvent {
        FailureEvent {
            kind,
            display_type: kind.label().to_string(),
            message: "m".to_string(),
            file: "f".to_string(),
            line: 1,
            extra: FailureContext::default(),
        }
    }

    #[test]
    fn test_empty_registry_dispatch_is_absorbed() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        let outcome = registry.dispatch(&event(ErrorKind::Error)).unwrap();
        assert_eq!(outcome, DispatchOutcome::Absorbed);
    }

    #[test]
    fn test_auto_priorities_are_consecutive_from_seed() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add(Box::new(RecordingHandler::new("a", &calls)));
        registry.add(Box::new(RecordingHandler::new("b", &calls)));
        registry.add(Box::new(RecordingHandler::new("c", &calls)));

        assert_eq!(registry.priorities(), vec![10, 11, 12]);
    }

    #[test]
    fn test_explicit_priority_orders_before_auto_assigned() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add(Box::new(RecordingHandler::new("auto", &calls)));
        registry.add(Box::new(
            RecordingHandler::new("early", &calls).with_priority(5),
        ));

        registry.dispatch(&event(ErrorKind::Error)).unwrap();
        assert_eq!(*calls.lock(), vec!["early", "auto"]);
        assert_eq!(registry.priorities(), vec![5, 10]);
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add(Box::new(
            RecordingHandler::new("first", &calls).with_priority(7),
        ));
        registry.add(Box::new(
            RecordingHandler::new("second", &calls).with_priority(7),
        ));

        registry.dispatch(&event(ErrorKind::Error)).unwrap();
        assert_eq!(*calls.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_stop_short_circuits_lower_priority_handlers() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add(Box::new(
            RecordingHandler::new("a", &calls)
                .with_priority(5)
                .stopping(),
        ));
        registry.add(Box::new(RecordingHandler::new("b", &calls).with_priority(10)));

        let outcome = registry.dispatch(&event(ErrorKind::Error)).unwrap();
        assert_eq!(outcome, DispatchOutcome::Absorbed);
        assert_eq!(*calls.lock(), vec!["a"]);
    }

    #[test]
    fn test_non_fatal_skips_handlers_that_did_not_opt_in() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add(Box::new(RecordingHandler::new("fatal_only", &calls)));
        registry.add(Box::new(
            RecordingHandler::new("wants_all", &calls).non_fatal_aware(),
        ));

        registry.dispatch(&event(ErrorKind::Notice)).unwrap();
        assert_eq!(*calls.lock(), vec!["wants_all"]);

        calls.lock().clear();
        registry.dispatch(&event(ErrorKind::Error)).unwrap();
        assert_eq!(*calls.lock(), vec!["fatal_only", "wants_all"]);
    }

    #[test]
    fn test_add_with_priority_overrides_preference() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add_with_priority(
            Box::new(RecordingHandler::new("a", &calls).with_priority(50)),
            1,
        );
        assert_eq!(registry.priorities(), vec![1]);
    }
}
