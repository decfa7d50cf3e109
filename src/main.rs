use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use energy_audit::config::{load_config, AppConfig};
use energy_audit::data_models::{DatasetSummary, EnergyRecord, Insight};
use energy_audit::insights::{fallback_insights, fetch_insights, HttpInsightProvider};
use energy_audit::live::{run_live, LiveUpdate, SyntheticFeed};
use energy_audit::metrics::METRICS;
use energy_audit::parallel::{expand_paths, FileAuditResult, ParallelAuditor};
use energy_audit::report::render_report;
use energy_audit::summary::Aggregator;
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "energy-audit")]
#[command(about = "Normalize heterogeneous energy readings and summarize consumption", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "ENERGY_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit CSV, TSV or JSON files (directories are walked)
    Audit {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Ask the insight service for advisory items
        #[arg(long)]
        insights: bool,

        /// Worker threads (defaults to the CPU count)
        #[arg(long)]
        workers: Option<usize>,

        /// Title used in text reports
        #[arg(long, default_value = "Energy Audit")]
        title: String,
    },
    /// Stream a synthetic feed and print every recomputed summary
    Live {
        /// Stop after this many ticks (runs until Ctrl-C otherwise)
        #[arg(long)]
        ticks: Option<u64>,

        #[arg(long)]
        interval_ms: Option<u64>,

        #[arg(long)]
        window: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditOutput<'a> {
    file: &'a str,
    rows_seen: usize,
    rows_dropped: usize,
    summary: &'a DatasetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    insights: Option<Vec<Insight>>,
}

#[derive(Serialize)]
struct LiveOutput<'a> {
    tick: u64,
    latest: &'a EnergyRecord,
    summary: &'a DatasetSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_ref())?;

    let outcome = match cli.command {
        Command::Audit {
            paths,
            format,
            insights,
            workers,
            title,
        } => run_audit(&config, paths, format, insights, workers, &title).await,
        Command::Live {
            ticks,
            interval_ms,
            window,
            seed,
            format,
        } => {
            let mut config = config;
            if let Some(interval_ms) = interval_ms {
                config.live.tick_interval_ms = interval_ms;
            }
            if let Some(window) = window {
                config.live.window_size = window;
            }
            if seed.is_some() {
                config.live.seed = seed;
            }
            config.validate().context("Invalid live settings")?;
            run_live_feed(&config, ticks, format).await
        }
    };

    METRICS.lock().print_summary();
    outcome
}

fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => {
            let path_str = path.to_string_lossy();
            info!("Loading configuration from {}", path_str);
            load_config(&path_str).with_context(|| format!("Failed to load configuration from {}", path_str))?
        }
        None => AppConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid ENERGY_* environment override")?;
    Ok(config)
}

async fn run_audit(
    config: &AppConfig,
    inputs: Vec<PathBuf>,
    format: OutputFormat,
    with_insights: bool,
    workers: Option<usize>,
    title: &str,
) -> Result<()> {
    let paths = expand_paths(&inputs);
    if paths.is_empty() {
        bail!("No supported input files (.csv, .tsv, .json) found");
    }

    let auditor = match workers.or(config.workers) {
        Some(n) => ParallelAuditor::with_workers(n),
        None => ParallelAuditor::new(),
    };
    let aggregator = Aggregator::new(config.summary.clone());
    let results = auditor.audit_files(paths, &aggregator);

    let provider = if with_insights {
        match HttpInsightProvider::from_config(&config.insights) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!("Insight service disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut outputs = Vec::new();
    let mut failures = 0usize;
    for result in &results {
        let (Some(summary), Some(report)) = (&result.summary, &result.report) else {
            failures += 1;
            log_failure(result);
            continue;
        };

        let insights = if with_insights {
            Some(match &provider {
                Some(provider) => fetch_insights(summary, provider).await,
                None => {
                    METRICS.lock().record_insight_fallback();
                    fallback_insights(summary)
                }
            })
        } else {
            None
        };

        outputs.push(AuditOutput {
            file: &result.file_path,
            rows_seen: report.rows_seen,
            rows_dropped: report.rows_dropped(),
            summary,
            insights,
        });
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outputs).context("Failed to serialize summaries")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let today = Utc::now().date_naive();
            for output in &outputs {
                println!("== {} ==", output.file);
                println!("{}", render_report(output.summary, title, today));
                if let Some(insights) = &output.insights {
                    println!("\nINSIGHTS");
                    for insight in insights {
                        println!("- [{}] {}: {}", insight.kind, insight.title, insight.description);
                    }
                }
                println!();
            }
        }
    }

    info!("Audited {} files: {} succeeded, {} failed", results.len(), outputs.len(), failures);
    if outputs.is_empty() {
        bail!("All {} input files failed", failures);
    }
    Ok(())
}

fn log_failure(result: &FileAuditResult) {
    error!(
        "Failed to audit {}: {}",
        result.file_path,
        result.error.as_deref().unwrap_or("unknown error")
    );
}

async fn run_live_feed(config: &AppConfig, ticks: Option<u64>, format: OutputFormat) -> Result<()> {
    let aggregator = Aggregator::new(config.summary.clone());
    let feed = match config.live.seed {
        Some(seed) => SyntheticFeed::seeded(seed),
        None => SyntheticFeed::from_entropy(),
    };

    let print_update = |update: LiveUpdate| match format {
        OutputFormat::Json => {
            let line = LiveOutput {
                tick: update.tick,
                latest: &update.latest,
                summary: &update.summary,
            };
            match serde_json::to_string(&line) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize live update {}: {}", update.tick, e),
            }
        }
        OutputFormat::Text => {
            let summary = &update.summary;
            println!(
                "tick {:>4} | latest {:>6.2} kWh | window total {:>9.2} kWh | score {:>3} | intensity {} | confidence {:.1}",
                update.tick,
                update.latest.total,
                summary.total_consumption,
                summary.efficiency_score,
                summary.peak_load_intensity,
                summary.confidence_score
            );
        }
    };

    tokio::select! {
        result = run_live(&config.live, &aggregator, feed, ticks, print_update) => {
            let window = result.context("Live summary failed")?;
            info!("Live feed finished with {} records in the window", window.len());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping live feed");
        }
    }
    Ok(())
}
