//! Closure adapter so plain functions can join the handler chain without a
//! dedicated type. This is the tagged-adapter answer to dynamic
//! "is-callable" inspection: the dispatcher's `add_callback` wraps any
//! `FnMut` in this handler.

use crate::error::Result;
use crate::failure::{FailureContext, FailureEvent};
use crate::handler::{Disposition, Handler};

type Callback = Box<dyn FnMut(&str, &FailureContext) -> Disposition + Send>;

pub struct CallbackHandler {
    callback: Callback,
    handle_non_fatal: bool,
}

impl CallbackHandler {
    pub fn new<F>(callback: F, handle_non_fatal: bool) -> Self
    where
        F: FnMut(&str, &FailureContext) -> Disposition + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
            handle_non_fatal,
        }
    }
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("callback", &"<FnMut>".to_string())
            .field("handle_non_fatal", &self.handle_non_fatal)
            .finish()
    }
}

impl Handler for CallbackHandler {
    fn handle_non_fatal(&self) -> bool {
        self.handle_non_fatal
    }

    fn handle(&mut self, event: &FailureEvent) -> Result<Disposition> {
        let extra = event.sink_context();
        Ok((self.callback)(&event.formatted_message(), &extra))
    }
}
