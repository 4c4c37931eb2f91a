//! logscan-engine: the stateful half of the Log Scanner client.
//!
//! Each component talks to the processing service only through
//! [`logscan_client::LogService`]:
//!
//! ```text
//! UploadCoordinator ──► JobHandle ──► JobTracker ──(COMPLETED)──► QuerySession
//!                                                                     │
//!                                                     ExportCoordinator ◄┘
//! ```
//!
//! Components never block: polling loops, debounce timers and fetches run as
//! tokio tasks owned by the component that spawned them, and die with it.

pub mod export;
pub mod session;
pub mod tracker;
pub mod upload;

#[cfg(test)]
mod testing;

pub use export::{ExportCoordinator, ExportFile};
pub use session::{QuerySession, SessionView, SORTABLE_FIELDS};
pub use tracker::{JobTracker, TrackerEvent};
pub use upload::UploadCoordinator;
