//! Query session: filter/sort/pagination state for one result view.
//!
//! A [`QuerySession`] is bound to a single job id for its whole life. Filter
//! and sort setters schedule a refetch after a quiet period (the debounce
//! window); page and page-size changes fetch immediately. Every fetch is
//! numbered, and a response is applied only if it belongs to the most
//! recently issued fetch, so a slow older response can never overwrite a newer
//! page.
//!
//! Results are published as [`SessionView`] snapshots through a `watch`
//! channel. Dropping the session aborts its timers and in-flight fetches.

use logscan_client::{ClientError, LogService};
use logscan_core::config::SessionConfig;
use logscan_core::{
    build_search_request, AvailableFields, DateRange, FilterState, JobSummary, LogLevel,
    ResultPage, SearchRequest, SessionState, SortDirection, SortSpec,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinSet};

/// Columns the service accepts in `sortBy`.
pub const SORTABLE_FIELDS: [&str; 4] = ["lineNumber", "timestamp", "level", "logger"];

/// What a renderer needs to draw the result view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    /// Latest successfully fetched page.
    pub results: ResultPage,
    /// One-based page number `results` belongs to (0 before the first fetch).
    pub page: u32,
    pub page_size: u32,
    pub loading: bool,
    /// Message of the last failed fetch; cleared by the next success.
    pub error: Option<String>,
    pub job_summary: Option<JobSummary>,
    pub fields: Option<AvailableFields>,
}

struct Shared {
    service: Arc<dyn LogService>,
    view: watch::Sender<SessionView>,
    /// Sequence number of the most recently issued fetch.
    latest: AtomicU64,
}

impl Shared {
    /// Register a new fetch as the latest one and flag the view as loading.
    fn begin(&self) -> u64 {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.send_modify(|view| view.loading = true);
        seq
    }

    fn complete(&self, seq: u64, request: &SearchRequest, result: Result<ResultPage, ClientError>) {
        if self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, job_id = %request.job_id, "discarding stale search response");
            return;
        }
        match result {
            Ok(results) => {
                tracing::debug!(
                    seq,
                    job_id = %request.job_id,
                    page = request.page,
                    rows = results.logs.len(),
                    total = results.total_elements,
                    "search results"
                );
                self.view.send_modify(|view| {
                    view.results = results;
                    view.page = request.page + 1;
                    view.page_size = request.size;
                    view.loading = false;
                    view.error = None;
                });
            }
            Err(e) => {
                tracing::warn!(seq, job_id = %request.job_id, error = %e, "search failed");
                self.view.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(format!("Failed to fetch logs: {e}"));
                });
            }
        }
    }

    async fn fetch(&self, seq: u64, request: SearchRequest) {
        let result = self.service.search(&request).await;
        self.complete(seq, &request, result);
    }
}

pub struct QuerySession {
    job_id: String,
    state: SessionState,
    debounce: Duration,
    shared: Arc<Shared>,
    pending: Option<AbortHandle>,
    tasks: JoinSet<()>,
}

impl QuerySession {
    /// Open a view over `job_id`: fetch page 1 right away and load the job
    /// summary and field lists in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(job_id: impl Into<String>, service: Arc<dyn LogService>, config: &SessionConfig) -> Self {
        Self::with_state(job_id, service, config.initial_state(), config.debounce())
    }

    /// Like [`QuerySession::open`], starting from an explicit state instead of
    /// the configured defaults.
    pub fn with_state(
        job_id: impl Into<String>,
        service: Arc<dyn LogService>,
        state: SessionState,
        debounce: Duration,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        let mut session = Self {
            job_id: job_id.into(),
            state,
            debounce,
            shared: Arc::new(Shared {
                service,
                view,
                latest: AtomicU64::new(0),
            }),
            pending: None,
            tasks: JoinSet::new(),
        };
        tracing::info!(job_id = %session.job_id, "opened query session");
        session.fetch_now();
        session.load_metadata();
        session
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    pub fn has_active_filters(&self) -> bool {
        self.state.filters.is_active()
    }

    /// The request the current state compiles to.
    pub fn current_request(&self) -> SearchRequest {
        build_search_request(&self.job_id, &self.state, None, None)
    }

    // -- debounced setters -------------------------------------------------

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.update_filters(|f| f.search_text = text);
    }

    pub fn set_levels(&mut self, levels: impl IntoIterator<Item = LogLevel>) {
        let levels: BTreeSet<LogLevel> = levels.into_iter().collect();
        self.update_filters(|f| f.levels = levels);
    }

    pub fn toggle_level(&mut self, level: LogLevel) {
        self.update_filters(|f| {
            if !f.levels.remove(&level) {
                f.levels.insert(level);
            }
        });
    }

    pub fn set_logger(&mut self, logger: Option<String>) {
        self.update_filters(|f| f.logger = logger);
    }

    pub fn set_thread(&mut self, thread: Option<String>) {
        self.update_filters(|f| f.thread = thread);
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.update_filters(|f| f.date_range = range);
    }

    pub fn set_has_error(&mut self, has_error: Option<bool>) {
        self.update_filters(|f| f.has_error = has_error);
    }

    pub fn set_has_stack_trace(&mut self, has_stack_trace: Option<bool>) {
        self.update_filters(|f| f.has_stack_trace = has_stack_trace);
    }

    /// Replace every filter at once.
    pub fn set_filters(&mut self, filters: FilterState) {
        self.update_filters(|f| *f = filters);
    }

    /// Reset all filters in one step: one refetch, not one per field.
    pub fn clear_filters(&mut self) {
        self.set_filters(FilterState::default());
    }

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        let sort = SortSpec {
            field: field.into(),
            direction,
        };
        if self.state.sort != sort {
            self.state.sort = sort;
            self.state.page = 1;
            self.schedule_refetch();
        }
    }

    // -- immediate fetches -------------------------------------------------

    pub fn set_page(&mut self, page: u32) {
        self.apply_table_change(page, self.state.page_size, None);
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.apply_table_change(self.state.page, page_size, None);
    }

    /// A pagination or column-header interaction: apply the new page, size
    /// and (optionally) sort, then fetch without waiting for the debounce
    /// window. A pending debounced refetch is left to run.
    pub fn apply_table_change(&mut self, page: u32, page_size: u32, sort: Option<SortSpec>) {
        if let Some(sort) = sort {
            self.state.sort = sort;
        }
        self.state.page = page.max(1);
        self.state.page_size = page_size.max(1);
        self.fetch_now();
    }

    /// Fetch immediately with the current state, optionally moving to another
    /// page or page size first.
    pub fn refresh(&mut self, page: Option<u32>, page_size: Option<u32>) {
        let page = page.unwrap_or(self.state.page);
        let page_size = page_size.unwrap_or(self.state.page_size);
        self.apply_table_change(page, page_size, None);
    }

    // -- internals ---------------------------------------------------------

    fn update_filters(&mut self, change: impl FnOnce(&mut FilterState)) {
        let before = self.state.filters.clone();
        change(&mut self.state.filters);
        if self.state.filters != before {
            self.state.page = 1;
            self.schedule_refetch();
        }
    }

    fn reap(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }

    /// Restart the debounce timer. Only the last timer of a burst survives,
    /// and it compiles the state as it was after the final change.
    fn schedule_refetch(&mut self) {
        self.reap();
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let request = self.current_request();
        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        let handle = self.tasks.spawn(async move {
            tokio::time::sleep(debounce).await;
            tracing::debug!(job_id = %request.job_id, "debounced refetch");
            let seq = shared.begin();
            shared.fetch(seq, request).await;
        });
        self.pending = Some(handle);
    }

    fn fetch_now(&mut self) {
        self.reap();
        let request = self.current_request();
        let seq = self.shared.begin();
        let shared = Arc::clone(&self.shared);
        self.tasks.spawn(async move { shared.fetch(seq, request).await });
    }

    fn load_metadata(&mut self) {
        let job_id = self.job_id.clone();
        let shared = Arc::clone(&self.shared);
        self.tasks.spawn(async move {
            let (summary, fields) = tokio::join!(
                shared.service.job_summary(&job_id),
                shared.service.available_fields(&job_id),
            );
            let summary = summary
                .map_err(|e| tracing::warn!(%job_id, error = %e, "failed to fetch job summary"))
                .ok();
            let fields = fields
                .map_err(|e| tracing::warn!(%job_id, error = %e, "failed to fetch available fields"))
                .ok();
            shared.view.send_modify(|view| {
                view.job_summary = summary;
                view.fields = fields;
            });
        });
    }
}

impl Drop for QuerySession {
    fn drop(&mut self) {
        tracing::debug!(job_id = %self.job_id, "closing query session");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
