//! Command implementations.

use anyhow::{Context, Result};
use catalog_service::CatalogService;
use catalog_types::{CacheBackendKind, CourseEntry, Record, Settings};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::cli::{Cli, Commands, OutputFormat};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(data) = &cli.data {
        settings.data_path = data.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    if cli.no_cache {
        settings.cache.backend = CacheBackendKind::Disabled;
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Run one CLI invocation end to end.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;

    info!(
        data_path = %settings.data_path,
        cache = ?settings.cache.backend,
        log_level = %settings.log_level,
        "Starting catalog"
    );
    let service = CatalogService::start(settings)
        .await
        .context("Failed to start catalog service")?;

    let output = match cli.command {
        Commands::Search { name, instructor } => {
            handle_search(&service, &name, &instructor, cli.format).await?
        }
        Commands::Stats => handle_stats(&service, cli.format)?,
        Commands::Lookup { key, column } => {
            handle_lookup(&service, &key, column.as_deref(), cli.format)?
        }
        Commands::Complete {
            prefix,
            column,
            limit,
        } => handle_complete(&service, &prefix, column.as_deref(), limit, cli.format)?,
        Commands::Submit { fields } => handle_submit(&service, fields, cli.format)?,
        Commands::FlushCache => handle_flush(&service, cli.format).await?,
        Commands::Shell => return run_shell(&service, cli.format).await,
    };

    println!("{}", output);
    Ok(())
}

pub async fn handle_search(
    service: &CatalogService,
    name: &str,
    instructor: &str,
    format: OutputFormat,
) -> Result<String> {
    let records = service.search(name, instructor).await;
    render_records(&records, format)
}

pub fn handle_stats(service: &CatalogService, format: OutputFormat) -> Result<String> {
    #[derive(Serialize)]
    struct StatsView {
        record_count: usize,
        generation: u64,
        loaded_at: String,
        evaluation_count: usize,
        submitted_count: usize,
    }

    let stats = service.stats();
    let evaluations = service.evaluation_stats();
    let view = StatsView {
        record_count: stats.record_count,
        generation: stats.generation,
        loaded_at: stats.loaded_at.to_rfc3339(),
        evaluation_count: evaluations.evaluation_count,
        submitted_count: evaluations.submitted_count,
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => Ok(format!(
            "Records:     {}\nGeneration:  {}\nLoaded at:   {}\nEvaluations: {}\nSubmitted:   {}",
            view.record_count,
            view.generation,
            view.loaded_at,
            view.evaluation_count,
            view.submitted_count
        )),
    }
}

pub fn handle_lookup(
    service: &CatalogService,
    key: &str,
    column: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let column = column.unwrap_or(&service.settings().name_column);
    let index = service
        .key_index(column)
        .with_context(|| format!("Failed to index column '{}'", column))?;
    let found: Vec<Record> = index.lookup(key).cloned().into_iter().collect();
    render_records(&found, format)
}

pub fn handle_complete(
    service: &CatalogService,
    prefix: &str,
    column: Option<&str>,
    limit: usize,
    format: OutputFormat,
) -> Result<String> {
    let column = column.unwrap_or(&service.settings().name_column);
    let index = service
        .prefix_index(column)
        .with_context(|| format!("Failed to index column '{}'", column))?;
    let matches: Vec<Record> = index.lookup_prefix(prefix).take(limit).cloned().collect();
    render_records(&matches, format)
}

pub fn handle_submit(
    service: &CatalogService,
    fields: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<String> {
    let entry = fields
        .into_iter()
        .fold(CourseEntry::new(), |entry, (key, value)| entry.with(key, value));
    service
        .submit_course(&entry)
        .context("Course submission rejected")?;

    let submitted = service.evaluation_stats().submitted_count;
    match format {
        OutputFormat::Json => Ok(serde_json::json!({ "submitted": true, "submitted_count": submitted })
            .to_string()),
        OutputFormat::Text => Ok(format!("Submitted ({} pending review)", submitted)),
    }
}

pub async fn handle_flush(service: &CatalogService, format: OutputFormat) -> Result<String> {
    let flushed = service.flush_cache().await;
    match format {
        OutputFormat::Json => Ok(serde_json::json!({ "flushed": flushed }).to_string()),
        OutputFormat::Text if flushed => Ok("Cache flushed".to_string()),
        OutputFormat::Text => Ok("Cache backend unavailable, nothing flushed".to_string()),
    }
}

/// Render records as a JSON array or one tab-separated line per record.
pub fn render_records(records: &[Record], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                return Ok("No matching courses".to_string());
            }
            let lines: Vec<String> = records
                .iter()
                .map(|r| {
                    let mut line = format!("{}\t{}", r.name_str(), r.instructor_str());
                    for (column, value) in &r.extra {
                        line.push_str(&format!("\t{}={}", column, value));
                    }
                    line
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// `search <TAB> name <TAB> instructor`, missing filters are empty
    Search { name: String, instructor: String },
    Reload,
    Stats,
    Flush,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.trim_end_matches(['\r', '\n']).split('\t');
        match parts.next().map(str::trim) {
            Some("search") => Ok(ShellCommand::Search {
                name: parts.next().unwrap_or_default().to_string(),
                instructor: parts.next().unwrap_or_default().to_string(),
            }),
            Some("reload") => Ok(ShellCommand::Reload),
            Some("stats") => Ok(ShellCommand::Stats),
            Some("flush") => Ok(ShellCommand::Flush),
            Some("quit") | Some("exit") => Ok(ShellCommand::Quit),
            Some("") | None => Err("empty command".to_string()),
            Some(other) => Err(format!(
                "unknown command '{}' (expected search, reload, stats, flush, quit)",
                other
            )),
        }
    }
}

/// Serve commands from stdin until EOF or `quit`.
///
/// Keeps one service alive so the result cache and reloads are shared
/// across queries.
pub async fn run_shell(service: &CatalogService, format: OutputFormat) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let output = match ShellCommand::parse(&line) {
            Ok(ShellCommand::Search { name, instructor }) => {
                handle_search(service, &name, &instructor, format).await?
            }
            Ok(ShellCommand::Reload) => match service.reload().await {
                Ok(count) => format!("Reloaded {} records", count),
                Err(e) => format!("Reload failed: {}", e),
            },
            Ok(ShellCommand::Stats) => handle_stats(service, format)?,
            Ok(ShellCommand::Flush) => handle_flush(service, format).await?,
            Ok(ShellCommand::Quit) => break,
            Err(e) => format!("error: {}", e),
        };
        println!("{}", output);
    }
    Ok(())
}
