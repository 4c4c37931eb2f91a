//! logscan-core: shared types for the Log Scanner client.
//!
//! This crate holds everything that is pure data: the job and log entry model,
//! the per-view session state, and the [`request`] compiler that turns that
//! state into the canonical [`SearchRequest`] sent to the log store.
//!
//! # Architecture
//!
//! ```text
//! Upload ──► JobTracker ──► QuerySession ──► RequestBuilder ──► search
//!                                  │
//!                                  └──► Export
//! ```
//!
//! Nothing in this crate performs I/O except [`config::Config::load`].

pub mod config;
pub mod error;
pub mod request;
pub mod types;

pub use error::ParseError;
pub use request::{
    build_search_request, DateRange, FilterState, SearchRequest, SessionState, SortDirection,
    SortSpec,
};
pub use types::{
    AvailableFields, ExportFormat, Job, JobHandle, JobProgress, JobStatus, JobSummary, LogEntry,
    LogLevel, ResultPage, SearchSummary, TimestampFormat,
};
