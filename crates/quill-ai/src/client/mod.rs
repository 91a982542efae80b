//! Invocation client
//!
//! The broker object and its invocation orchestrator. Resolves the
//! effective service, synthesizes authentication headers, issues the
//! timeout-guarded network call, and threads the formatter and normalizer
//! together into a single error channel.

pub mod core;
pub mod invoke;

// Re-export main types
pub use core::{AiBroker, RequestOptions};
