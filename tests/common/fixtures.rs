//! Static log corpora used across harnesses.
//!
//! The fake service never parses uploads, so these only need to look like
//! what a user would submit.

/// A plain-text log as a user would paste it.
pub const PASTED_LOG: &str = "\
2024-03-01 08:00:00 INFO  [main] com.example.App - Starting application version 2.4.1
2024-03-01 08:00:01 WARN  [main] com.example.Db - Slow query took 4200ms
2024-03-01 08:00:02 ERROR [worker-1] com.example.Queue - Task queue overflow
java.lang.IllegalStateException: queue full
\tat com.example.Queue.offer(Queue.java:42)
2024-03-01 08:00:03 INFO  [main] com.example.App - Graceful shutdown complete
";

/// Lines in ISO 8601 and day-first layouts, for timestamp format uploads.
pub const CORPUS_TIMESTAMPS: &[&str] = &[
    "2024-03-01T08:00:00Z INFO started",
    "01/03/2024 08:00:01 ERROR failed to bind port",
];

/// Write `content` to a file named `name` inside a fresh temporary directory.
/// The directory is removed when the returned guard is dropped.
pub fn log_file(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
