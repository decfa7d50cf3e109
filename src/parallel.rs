use crate::data_models::DatasetSummary;
use crate::file_processor::{self, is_supported};
use crate::normalizer::NormalizeReport;
use crate::summary::Aggregator;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Result of auditing a single file
#[derive(Debug)]
pub struct FileAuditResult {
    pub file_path: String,
    pub report: Option<NormalizeReport>,
    pub summary: Option<DatasetSummary>,
    pub error: Option<String>,
    pub processing_time_ms: u128,
}

impl FileAuditResult {
    pub fn is_success(&self) -> bool {
        self.summary.is_some()
    }
}

/// Parallel file auditor using Rayon
pub struct ParallelAuditor {
    num_workers: usize,
    show_progress: bool,
}

impl Default for ParallelAuditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelAuditor {
    pub fn new() -> Self {
        let num_workers = num_cpus::get();
        info!("Initializing ParallelAuditor with {} workers", num_workers);
        Self {
            num_workers,
            show_progress: true,
        }
    }

    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        info!("Initializing ParallelAuditor with {} custom workers", num_workers);
        Self {
            num_workers,
            show_progress: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Audit files in parallel. Results keep the input order; a failing file
    /// does not affect the others.
    pub fn audit_files(&self, paths: Vec<PathBuf>, aggregator: &Aggregator) -> Vec<FileAuditResult> {
        let total_files = paths.len();
        info!("Starting parallel audit of {} files", total_files);

        let progress = ProgressBar::new(total_files as u64);
        if self.show_progress {
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            {
                progress.set_style(style.progress_chars("#>-"));
            }
        } else {
            progress.set_draw_target(ProgressDrawTarget::hidden());
        }

        let audit = || -> Vec<FileAuditResult> {
            paths
                .into_par_iter()
                .map(|path| {
                    let result = audit_one(&path, aggregator);
                    progress.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new().num_threads(self.num_workers).build() {
            Ok(pool) => pool.install(audit),
            Err(e) => {
                warn!("Could not build a {}-thread pool ({}); using the global pool", self.num_workers, e);
                audit()
            }
        };

        progress.finish_with_message("File audit completed");
        results
    }
}

fn audit_one(path: &Path, aggregator: &Aggregator) -> FileAuditResult {
    let start = Instant::now();
    let file_path = path.to_string_lossy().to_string();
    match file_processor::audit_file(path, aggregator) {
        Ok(audit) => FileAuditResult {
            file_path,
            report: Some(audit.report),
            summary: Some(audit.summary),
            error: None,
            processing_time_ms: start.elapsed().as_millis(),
        },
        Err(e) => {
            error!("Failed to audit {}: {}", file_path, e);
            FileAuditResult {
                file_path,
                report: None,
                summary: None,
                error: Some(e.to_string()),
                processing_time_ms: start.elapsed().as_millis(),
            }
        }
    }
}

/// Expands directory arguments into the supported files beneath them, sorted.
/// Plain file arguments pass through untouched so unsupported ones still get reported.
pub fn expand_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            info!("Expanded directory {} to {} files", input.display(), found.len());
            expanded.extend(found);
        } else {
            expanded.push(input.clone());
        }
    }
    expanded
}
