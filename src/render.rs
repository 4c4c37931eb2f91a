//! Plain-text rendering of engine state for the terminal.
//!
//! Everything here is a pure `… -> String` function so the command runners
//! stay free of formatting and the output can be asserted in tests.

use chrono::{DateTime, Utc};
use logscan_core::types::format_bytes;
use logscan_core::{AvailableFields, Job, JobSummary, LogEntry, ResultPage};
use std::fmt::Write;

const MESSAGE_WIDTH: usize = 100;

/// One status line for a tracked job, e.g.
/// `[PROCESSING]  40%  a.log (1.00 KB)  400/1000 lines  12s`.
pub fn progress_line(job: &Job, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "[{}] {:>3.0}%  {} ({})",
        job.status(),
        job.progress(),
        job.display_file_name(),
        format_bytes(job.display_file_size())
    );
    if let Some(t) = &job.telemetry {
        if t.total_lines > 0 {
            let _ = write!(line, "  {}/{} lines", t.processed_lines, t.total_lines);
        }
        if t.lines_per_second > 0.0 {
            let _ = write!(line, "  {:.0} lines/s", t.lines_per_second);
        }
    }
    if let Some(elapsed) = job.elapsed(now) {
        let _ = write!(line, "  {elapsed}");
    }
    if let Some(detail) = job.detail() {
        let _ = write!(line, "  {detail}");
    }
    line
}

/// A result page as a fixed-width table with a pagination footer.
pub fn results_table(results: &ResultPage, page: u32, page_size: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<19}  {:<5}  {:<24}  MESSAGE",
        "LINE", "TIMESTAMP", "LEVEL", "LOGGER"
    );
    for entry in &results.logs {
        let _ = writeln!(out, "{}", entry_row(entry));
    }

    let pages = results.total_elements.div_ceil(u64::from(page_size.max(1)));
    let _ = write!(
        out,
        "page {} of {} ({} matching)",
        page,
        pages.max(1),
        results.total_elements
    );
    if let Some(summary) = &results.summary {
        let counts: Vec<String> = summary
            .level_counts
            .iter()
            .map(|(level, count)| format!("{level}={count}"))
            .collect();
        if !counts.is_empty() {
            let _ = write!(out, "  [{}]", counts.join(" "));
        }
    }
    out
}

fn entry_row(entry: &LogEntry) -> String {
    let level = entry.level.map(|l| l.as_str()).unwrap_or("-");
    let marker = if entry.has_stack_trace { " +trace" } else { "" };
    let message = entry.message.lines().next().unwrap_or_default();
    // Second precision is enough for the table.
    let timestamp: String = entry.timestamp.as_deref().unwrap_or("-").chars().take(19).collect();
    format!(
        "{:>6}  {:<19}  {:<5}  {:<24}  {}{}",
        entry.line_number,
        timestamp,
        level,
        truncate(entry.logger.as_deref().unwrap_or("-"), 24),
        truncate(message, MESSAGE_WIDTH),
        marker
    )
}

/// Keep the rightmost part of dotted logger names; cut everything else.
fn truncate(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    if s.contains('.') && !s.contains(' ') {
        let tail: String = s.chars().skip(count - (width - 1)).collect();
        format!("…{tail}")
    } else {
        let head: String = s.chars().take(width - 1).collect();
        format!("{head}…")
    }
}

pub fn summary_block(summary: &JobSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "entries:       {}", summary.total_entries);
    let _ = writeln!(out, "errors:        {}", summary.error_count);
    let _ = writeln!(out, "warnings:      {}", summary.warning_count);
    let _ = writeln!(out, "stack traces:  {}", summary.stack_trace_count);
    let _ = write!(
        out,
        "time span:     {} .. {}",
        summary.earliest_timestamp.as_deref().unwrap_or("?"),
        summary.latest_timestamp.as_deref().unwrap_or("?")
    );
    out
}

pub fn fields_block(fields: &AvailableFields) -> String {
    let mut out = format!("loggers ({}):\n", fields.loggers.len());
    for logger in &fields.loggers {
        let _ = writeln!(out, "  {logger}");
    }
    let _ = write!(out, "threads ({}):", fields.threads.len());
    for thread in &fields.threads {
        let _ = write!(out, "\n  {thread}");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
