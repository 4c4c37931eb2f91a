//! Shared test utilities for logscan integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Harnesses run against a real HTTP server on loopback,
//! with intervals shrunk by [`fast_config`] so they finish quickly.

pub mod assertions;
pub mod fake_log_service;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fake_log_service::*;
pub use fixtures::*;
