//! Command runners behind the `logscan` subcommands.
//!
//! Each runner drives one engine component to completion and hands the result
//! back to `main` for printing. Runners take a [`Context`] so the integration
//! harnesses can point them at a fake service.

use anyhow::{bail, Context as _};
use logscan_client::{HttpLogService, LogService, UploadPayload};
use logscan_core::config::{Config, ExportConfig};
use logscan_core::{
    DateRange, ExportFormat, Job, JobHandle, LogLevel, SessionState, SortDirection,
    TimestampFormat,
};
use logscan_engine::{
    ExportCoordinator, JobTracker, QuerySession, SessionView, TrackerEvent, UploadCoordinator,
    SORTABLE_FIELDS,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Configuration plus the service every runner talks to.
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub service: Arc<dyn LogService>,
}

impl Context {
    pub fn new(config: Config, service: Arc<dyn LogService>) -> Self {
        Self { config, service }
    }

    /// Connect to the service named by `config.service.base_url`.
    pub fn connect(config: Config) -> anyhow::Result<Self> {
        let service = HttpLogService::new(&config.service.base_url)
            .with_context(|| format!("invalid service url {:?}", config.service.base_url))?;
        Ok(Self::new(config, Arc::new(service)))
    }

    pub fn timestamp_format(&self, requested: Option<&str>) -> TimestampFormat {
        TimestampFormat::from(requested.unwrap_or(&self.config.upload.timestamp_format))
    }
}

// ---------------------------------------------------------------------------
// Filter flags
// ---------------------------------------------------------------------------

/// Filter and sort flags shared by `search` and `export`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
    /// Full-text search.
    #[arg(long)]
    pub text: Option<String>,
    /// Restrict to a level; repeat for several.
    #[arg(long = "level")]
    pub levels: Vec<LogLevel>,
    #[arg(long)]
    pub logger: Option<String>,
    #[arg(long)]
    pub thread: Option<String>,
    /// Range start, `YYYY-MM-DDTHH:mm:ss` local time.
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Range end, `YYYY-MM-DDTHH:mm:ss` local time.
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    #[arg(long)]
    pub has_error: Option<bool>,
    #[arg(long)]
    pub has_stack_trace: Option<bool>,
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(SORTABLE_FIELDS))]
    pub sort: Option<String>,
    #[arg(long)]
    pub direction: Option<SortDirection>,
}

impl FilterArgs {
    /// Apply the flags on top of `state`. Flags not given leave it untouched.
    pub fn apply(&self, mut state: SessionState) -> anyhow::Result<SessionState> {
        let filters = &mut state.filters;
        if let Some(text) = &self.text {
            filters.search_text = text.clone();
        }
        if !self.levels.is_empty() {
            filters.levels = self.levels.iter().copied().collect();
        }
        if self.logger.is_some() {
            filters.logger = self.logger.clone();
        }
        if self.thread.is_some() {
            filters.thread = self.thread.clone();
        }
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            filters.date_range = Some(DateRange::parse(from, to)?);
        }
        if self.has_error.is_some() {
            filters.has_error = self.has_error;
        }
        if self.has_stack_trace.is_some() {
            filters.has_stack_trace = self.has_stack_trace;
        }
        if let Some(field) = &self.sort {
            state.sort.field = field.clone();
        }
        if let Some(direction) = self.direction {
            state.sort.direction = direction;
        }
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

pub async fn upload(
    ctx: &Context,
    payload: &UploadPayload,
    format: &TimestampFormat,
) -> anyhow::Result<JobHandle> {
    UploadCoordinator::new(Arc::clone(&ctx.service))
        .upload(payload, format)
        .await
        .with_context(|| format!("could not upload {}", payload.file_name))
}

/// Poll `handle` until it reaches a terminal status, calling `on_update`
/// after every successful poll. Returns the terminal snapshot, whatever its
/// status.
pub async fn track(
    ctx: &Context,
    handle: &JobHandle,
    mut on_update: impl FnMut(&Job),
) -> anyhow::Result<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tracker = JobTracker::new(
        Arc::clone(&ctx.service),
        ctx.config.tracker.poll_interval(),
        tx,
    );
    tracker.start(handle);

    while let Some(event) = rx.recv().await {
        match event {
            TrackerEvent::Update(job) => on_update(&job),
            TrackerEvent::Terminal(job) => return Ok(job),
        }
    }
    bail!("tracking of job {} stopped unexpectedly", handle.job_id)
}

/// Fetch one page for `state` through a query session.
pub async fn search(ctx: &Context, job_id: &str, state: SessionState) -> anyhow::Result<SessionView> {
    let session = QuerySession::with_state(
        job_id,
        Arc::clone(&ctx.service),
        state,
        ctx.config.session.debounce(),
    );
    let mut view = session.subscribe();
    let view = view
        .wait_for(|v| !v.loading)
        .await
        .context("query session closed")?
        .clone();
    if let Some(error) = view.error {
        bail!(error);
    }
    Ok(view)
}

/// Export the rows matching `state`. `out` overrides the configured directory.
pub async fn export(
    ctx: &Context,
    job_id: &str,
    state: &SessionState,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let config = ExportConfig {
        output_dir: out.unwrap_or_else(|| ctx.config.export.output_dir.clone()),
        ..ctx.config.export.clone()
    };
    ExportCoordinator::new(Arc::clone(&ctx.service), &config)
        .export(job_id, state, format)
        .await
        .with_context(|| format!("could not export job {job_id}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
