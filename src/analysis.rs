//! The two boundary operations, `validate` and `analyze`, plus guarded and
//! batched runs built on them.

use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::AtomicBool,
};

use rayon::prelude::*;
use thiserror::Error;

use crate::{
    cleanup::UploadGuard,
    loader::{self, LoadOutcome},
    report::{AnalysisReport, ValidationResult},
    sniff::FormatKind,
    source,
    stats::{self, AggregateError},
};

/// Worker count used when neither the caller nor `VARIANT_STATS_WORKERS`
/// provides one.
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{message}")]
    UnrepairableFormat { path: PathBuf, message: String },
    #[error("failed reading {path} after {records_read} records: {source}")]
    StreamReadFailure {
        path: PathBuf,
        records_read: u64,
        #[source]
        source: io::Error,
    },
    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("analysis of {path} cancelled after {records_read} records")]
    Cancelled { path: PathBuf, records_read: u64 },
}

/// Pre-flight check: load (repairing if needed) without aggregating.
pub fn validate(path: &Path) -> ValidationResult {
    ValidationResult::from(&loader::load(path))
}

/// Load `path` and aggregate its records into a report.
pub fn analyze(path: &Path) -> Result<AnalysisReport, AnalysisError> {
    analyze_with_outcome(path, None).map(|(_, report)| report)
}

/// Like [`analyze`], but stops between records once `cancel` is set. A
/// cancelled run returns no partial report.
pub fn analyze_cancellable(
    path: &Path,
    cancel: &AtomicBool,
) -> Result<AnalysisReport, AnalysisError> {
    analyze_with_outcome(path, Some(cancel)).map(|(_, report)| report)
}

/// [`analyze`] that also returns how the input was loaded.
pub fn analyze_with_outcome(
    path: &Path,
    cancel: Option<&AtomicBool>,
) -> Result<(LoadOutcome, AnalysisReport), AnalysisError> {
    tracing::info!(path = %path.display(), "starting analysis");

    let outcome = loader::load(path);
    if let Some(message) = &outcome.error {
        return Err(AnalysisError::UnrepairableFormat {
            path: path.to_path_buf(),
            message: message.clone(),
        });
    }

    let kind = outcome
        .sniffed
        .map(|s| s.kind)
        .unwrap_or(FormatKind::Unknown);
    let mut records =
        source::open_source(&outcome.path, kind).map_err(|source| AnalysisError::IoFailure {
            path: outcome.path.clone(),
            source,
        })?;

    let raw = stats::aggregate_until(records.as_mut(), cancel).map_err(|e| match e {
        AggregateError::Read {
            records_read,
            source,
        } => AnalysisError::StreamReadFailure {
            path: outcome.path.clone(),
            records_read,
            source,
        },
        AggregateError::Cancelled { records_read } => AnalysisError::Cancelled {
            path: outcome.path.clone(),
            records_read,
        },
    })?;

    let report = AnalysisReport::from_raw(raw);
    tracing::info!(
        path = %path.display(),
        records = report.record_count(),
        repaired = outcome.repaired,
        "analysis complete"
    );

    Ok((outcome, report))
}

/// Analyze an uploaded file, removing it and any repaired copy afterwards
/// regardless of the outcome.
pub fn process_upload(path: &Path) -> Result<(LoadOutcome, AnalysisReport), AnalysisError> {
    let _guard = UploadGuard::new(path);
    analyze_with_outcome(path, None)
        .inspect_err(|e| tracing::error!(path = %path.display(), error = %e, "analysis failed"))
}

/// Run independent analyses on a fixed-size pool. Results keep input order.
pub fn analyze_batch(
    paths: &[PathBuf],
    workers: usize,
) -> Result<Vec<Result<(LoadOutcome, AnalysisReport), AnalysisError>>, rayon::ThreadPoolBuildError>
{
    run_pooled(paths, workers, |path| analyze_with_outcome(path, None))
}

/// [`process_upload`] for each path on a fixed-size pool. Results keep input
/// order; every input is removed whatever its outcome.
pub fn process_upload_batch(
    paths: &[PathBuf],
    workers: usize,
) -> Result<Vec<Result<(LoadOutcome, AnalysisReport), AnalysisError>>, rayon::ThreadPoolBuildError>
{
    run_pooled(paths, workers, process_upload)
}

fn run_pooled<F, T>(paths: &[PathBuf], workers: usize, run: F) -> Result<Vec<T>, rayon::ThreadPoolBuildError>
where
    F: Fn(&Path) -> T + Sync,
    T: Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?;

    Ok(pool.install(|| paths.par_iter().map(|path| run(path)).collect()))
}

/// Worker count from `VARIANT_STATS_WORKERS`, falling back to [`DEFAULT_WORKERS`].
pub fn default_workers() -> usize {
    std::env::var("VARIANT_STATS_WORKERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_WORKERS)
}
