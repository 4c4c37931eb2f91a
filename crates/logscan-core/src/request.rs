//! Request builder: compiles session state into a canonical [`SearchRequest`].
//!
//! [`build_search_request`] is a pure function: the same job id and state always
//! produce the same request. A refinement field is present in the request only
//! when the corresponding control holds a non-default value; absence is how the
//! store is told "unfiltered".

use crate::error::ParseError;
use crate::types::LogLevel;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Layout of `startDate` / `endDate`: local time, no offset.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascend" => Ok(SortDirection::Asc),
            "desc" | "descend" => Ok(SortDirection::Desc),
            _ => Err(ParseError::Direction(s.to_string())),
        }
    }
}

/// Inclusive time window. Both ends are required; a half-open range is not
/// sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Parse two `YYYY-MM-DDTHH:mm:ss` timestamps (a space separator is also
    /// accepted).
    pub fn parse(start: &str, end: &str) -> Result<Self, ParseError> {
        Ok(Self::new(parse_local(start)?, parse_local(end)?))
    }
}

fn parse_local(raw: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| ParseError::Timestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// The filter controls of a result view. `Default` is "nothing filtered".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub search_text: String,
    pub levels: BTreeSet<LogLevel>,
    pub logger: Option<String>,
    pub thread: Option<String>,
    pub date_range: Option<DateRange>,
    /// Tri-state: `None` means "don't care".
    pub has_error: Option<bool>,
    pub has_stack_trace: Option<bool>,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        self != &FilterState::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: "timestamp".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Full filter/sort/pagination state of one result view.
///
/// `page` is one-based, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub filters: FilterState,
    pub sort: SortSpec,
    pub page: u32,
    pub page_size: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// The service-facing search request. `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub job_id: String,
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub sort_direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<LogLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_stack_trace: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_summary: Option<bool>,
}

/// Compile `state` into a search request for `job_id`.
///
/// `page` (one-based) and `size` override the state's pagination without
/// touching it; export uses this to ask for a different window than the one
/// on screen.
pub fn build_search_request(
    job_id: &str,
    state: &SessionState,
    page: Option<u32>,
    size: Option<u32>,
) -> SearchRequest {
    let filters = &state.filters;
    let page = page.unwrap_or(state.page);
    let size = size.unwrap_or(state.page_size).max(1);

    let date_range = filters.date_range.map(|range| {
        (
            range.start.format(DATE_FORMAT).to_string(),
            range.end.format(DATE_FORMAT).to_string(),
        )
    });
    let (start_date, end_date) = match date_range {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    SearchRequest {
        job_id: job_id.to_string(),
        page: page.saturating_sub(1),
        size,
        sort_by: state.sort.field.clone(),
        sort_direction: state.sort.direction,
        search_text: non_empty(Some(&filters.search_text)),
        levels: (!filters.levels.is_empty()).then(|| filters.levels.iter().copied().collect()),
        logger: non_empty(filters.logger.as_ref()),
        thread: non_empty(filters.thread.as_ref()),
        start_date,
        end_date,
        has_error: filters.has_error,
        has_stack_trace: filters.has_stack_trace,
        include_summary: Some(true),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
