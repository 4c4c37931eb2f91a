//! logscan: Log Scanner client.
//!
//! Upload a log file (or pasted text) to the processing service, follow the
//! processing job until it finishes, then search and export the structured
//! entries it produced. The workspace crates are re-exported here so that
//! integration tests and the binary can import them from one place.
//!
//! # Architecture
//!
//! ```text
//! logscan-core    pure data: job model, session state, request builder, config
//! logscan-client  LogService trait + HTTP implementation
//! logscan-engine  JobTracker, QuerySession, ExportCoordinator, UploadCoordinator
//! logscan         command runners and terminal rendering (this crate)
//! ```

pub mod commands;
pub mod render;

pub use logscan_client as client;
pub use logscan_engine as engine;
pub use logscan_core::{config, request, types};
