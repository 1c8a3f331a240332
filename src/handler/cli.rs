//! # CLI Display Handler
//!
//! Plain-text terminal rendering for command-line embeddings: prints the
//! failure and any available trace to an injected writer, then optionally
//! terminates the process after flushing.

use crate::error::{CerberusError, Result};
use crate::failure::FailureEvent;
use crate::handler::{Disposition, Handler};
use std::io::Write;

pub struct CliHandler {
    writer: Box<dyn Write + Send>,
    handle_non_fatal: bool,
    /// Process exit code after rendering; `None` hands control back to the
    /// embedder instead.
    exit_code: Option<i32>,
}

impl CliHandler {
    /// Render to stderr and terminate the process with exit code 1.
    pub fn new(handle_non_fatal: bool) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            handle_non_fatal,
            exit_code: Some(1),
        }
    }

    /// Render to an arbitrary writer and never terminate the process.
    pub fn with_writer(writer: Box<dyn Write + Send>, handle_non_fatal: bool) -> Self {
        Self {
            writer,
            handle_non_fatal,
            exit_code: None,
        }
    }
}

impl std::fmt::Debug for CliHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliHandler")
            .field("writer", &"<dyn Write>".to_string())
            .field("handle_non_fatal", &self.handle_non_fatal)
            .field("exit_code", &self.exit_code)
            .finish()
    }
}

impl Handler for CliHandler {
    fn handle_non_fatal(&self) -> bool {
        self.handle_non_fatal
    }

    fn handle(&mut self, event: &FailureEvent) -> Result<Disposition> {
        let write_failure =
            |e: std::io::Error| CerberusError::HandlerError(format!("CLI write failed: {e}"));

        writeln!(self.writer, "Error : {}", event.formatted_message()).map_err(write_failure)?;
        for frame in event.extra.trace() {
            match (&frame.file, frame.line) {
                (Some(file), Some(line)) => {
                    writeln!(self.writer, "  at {} in {} line {}", frame.function, file, line)
                        .map_err(write_failure)?;
                }
                _ => {
                    writeln!(self.writer, "  at {}", frame.function).map_err(write_failure)?;
                }
            }
        }
        self.writer.flush().map_err(write_failure)?;

        if let Some(code) = self.exit_code {
            std::process::exit(code);
        }

        Ok(Disposition::Stop)
    }
}
