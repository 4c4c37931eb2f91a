use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use logscan::client::{
    LogService, UploadPayload, DEFAULT_CONTEXT_LINES, DEFAULT_FIELD_VALUE_LIMIT, DEFAULT_TIMELINE_INTERVAL,
};
use logscan::commands::{self, Context, FilterArgs};
use logscan::config::Config;
use logscan::render;
use logscan::types::{ExportFormat, JobHandle, JobStatus};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "logscan", about = "Log Scanner: upload, track, search and export processed logs")]
struct Cli {
    /// Write debug logs to /tmp/logscan-debug.log (tail -f to inspect).
    #[arg(long, global = true)]
    debug: bool,

    /// Service root URL; overrides `[service] base_url` from the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a log file, wait for processing and show the first page.
    Upload {
        file: PathBuf,
        #[arg(long)]
        timestamp_format: Option<String>,
    },
    /// Like `upload`, reading the log text from stdin.
    Paste {
        #[arg(long)]
        timestamp_format: Option<String>,
    },
    /// Follow an existing job until it finishes.
    Track { job: String },
    /// Show one page of a job's entries.
    Search {
        job: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Save every entry matching the filters to `logs-<job>.<format>`.
    Export {
        job: String,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Directory to write into (default: `[export] output_dir`).
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Whole-job statistics and level distribution.
    Summary { job: String },
    /// Loggers and threads present in a job, or the values of one field.
    Fields {
        job: String,
        #[arg(long)]
        field: Option<String>,
        #[arg(long, default_value_t = DEFAULT_FIELD_VALUE_LIMIT)]
        limit: u32,
    },
    /// Entry counts bucketed over time.
    Timeline {
        job: String,
        #[arg(long, default_value = DEFAULT_TIMELINE_INTERVAL)]
        interval: String,
    },
    /// Lines surrounding one line of the original file.
    Context {
        job: String,
        line: u64,
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
        before: u32,
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
        after: u32,
    },
    /// Raw processed output of a job.
    #[command(name = "result")]
    JobResult { job: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::defaults()
    });
    if let Some(base_url) = cli.base_url {
        config.service.base_url = base_url;
    }
    let ctx = Context::connect(config)?;

    match cli.command {
        Command::Upload {
            file,
            timestamp_format,
        } => {
            let payload = UploadPayload::from_path(&file)
                .await
                .with_context(|| format!("could not read {}", file.display()))?;
            process(&ctx, payload, timestamp_format.as_deref()).await
        }
        Command::Paste { timestamp_format } => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("could not read stdin")?;
            process(&ctx, UploadPayload::from_text(text), timestamp_format.as_deref()).await
        }
        Command::Track { job } => {
            let handle = JobHandle {
                job_id: job,
                file_name: String::new(),
                file_size: 0,
                raw: serde_json::Value::Null,
            };
            follow(&ctx, &handle).await
        }
        Command::Search {
            job,
            filters,
            page,
            page_size,
        } => {
            let mut state = filters.apply(ctx.config.session.initial_state())?;
            state.page = page.max(1);
            if let Some(size) = page_size {
                state.page_size = size.max(1);
            }
            let view = commands::search(&ctx, &job, state).await?;
            println!("{}", render::results_table(&view.results, view.page, view.page_size));
            Ok(())
        }
        Command::Export {
            job,
            format,
            out,
            filters,
        } => {
            let state = filters.apply(ctx.config.session.initial_state())?;
            let path = commands::export(&ctx, &job, &state, format, out).await?;
            println!("wrote {}", path.display());
            Ok(())
        }
        Command::Summary { job } => {
            let (summary, levels) = tokio::join!(
                ctx.service.job_summary(&job),
                ctx.service.level_distribution(&job)
            );
            println!("{}", render::summary_block(&summary?));
            println!("levels:        {}", levels?);
            Ok(())
        }
        Command::Fields { job, field, limit } => {
            match field {
                Some(field) => {
                    let values = ctx.service.field_values(&job, &field, limit).await?;
                    println!("{}", serde_json::to_string_pretty(&values)?);
                }
                None => {
                    let fields = ctx.service.available_fields(&job).await?;
                    println!("{}", render::fields_block(&fields));
                }
            }
            Ok(())
        }
        Command::Timeline { job, interval } => {
            let timeline = ctx.service.timeline(&job, &interval).await?;
            println!("{}", serde_json::to_string_pretty(&timeline)?);
            Ok(())
        }
        Command::Context {
            job,
            line,
            before,
            after,
        } => {
            let lines = ctx.service.context_lines(&job, line, before, after).await?;
            println!("{}", serde_json::to_string_pretty(&lines)?);
            Ok(())
        }
        Command::JobResult { job } => {
            let result = ctx.service.job_result(&job).await?;
            match result {
                serde_json::Value::String(text) => println!("{text}"),
                other => println!("{}", serde_json::to_string_pretty(&other)?),
            }
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    if debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/logscan-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("logscan debug log started, tail -f /tmp/logscan-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
    Ok(())
}

/// Upload, follow the job, and show the first page once it completes.
async fn process(
    ctx: &Context,
    payload: UploadPayload,
    timestamp_format: Option<&str>,
) -> anyhow::Result<()> {
    let format = ctx.timestamp_format(timestamp_format);
    let handle = commands::upload(ctx, &payload, &format).await?;
    println!("uploaded {} as job {}", handle.file_name, handle.job_id);

    follow(ctx, &handle).await?;
    let view = commands::search(ctx, &handle.job_id, ctx.config.session.initial_state()).await?;
    println!("{}", render::results_table(&view.results, view.page, view.page_size));
    Ok(())
}

/// Print progress until the job finishes; a failed or cancelled job is an error.
async fn follow(ctx: &Context, handle: &JobHandle) -> anyhow::Result<()> {
    let job = commands::track(ctx, handle, |job| {
        println!("{}", render::progress_line(job, Utc::now()));
    })
    .await?;
    if job.status() != JobStatus::Completed {
        anyhow::bail!(
            "job {} {}: {}",
            job.job_id,
            job.status().as_str().to_lowercase(),
            job.detail().unwrap_or("no detail")
        );
    }
    Ok(())
}
