//! # Handler Registry
//!
//! Ordered handler storage and the single-pass chain-of-responsibility walk.

pub mod handler_registry;

pub use handler_registry::{DispatchOutcome, HandlerRegistry, Registration};
