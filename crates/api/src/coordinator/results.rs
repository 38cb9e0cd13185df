//! Ledger listing, bulk clear and targeted delete.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use visage_core::error::CoreError;
use visage_core::job::JobKind;
use visage_core::upload::{sanitize_filename, staged_name};
use visage_db::models::ledger::{LedgerFilter, LedgerRecord};
use visage_db::repositories::{LedgerRepo, QueueRepo};

use crate::error::AppResult;
use crate::state::AppState;

pub async fn list_results(state: &AppState, filter: &LedgerFilter) -> AppResult<Vec<LedgerRecord>> {
    Ok(LedgerRepo::list(&state.pool, filter).await?)
}

// ---------------------------------------------------------------------------
// Bulk clear
// ---------------------------------------------------------------------------

/// Outcome of a bulk clear. `failures` lists files that could not be removed.
#[derive(Debug, Default, Serialize)]
pub struct ClearReport {
    pub records_deleted: u64,
    pub artifacts_deleted: u64,
    pub uploads_deleted: u64,
    pub failures: Vec<String>,
}

/// Delete every ledger record, every artifact and every staged upload.
///
/// Uploads of jobs still in the queue are kept so those jobs can run. The
/// ledger goes first: if it cannot be cleared, no file is touched. File
/// removal failures do not stop the clear; they are reported with the
/// counts of what was removed.
pub async fn clear_all(state: &AppState) -> AppResult<ClearReport> {
    let mut report = ClearReport::default();

    let queued: HashSet<OsString> = QueueRepo::list_all(&state.pool)
        .await?
        .iter()
        .filter_map(|job| Path::new(&job.descriptor().input_ref).file_name().map(OsString::from))
        .collect();

    report.records_deleted = LedgerRepo::delete_all(&state.pool).await?;

    let (artifacts, failures) = remove_dir_files(&state.config.results_dir, &HashSet::new()).await;
    report.artifacts_deleted = artifacts;
    report.failures.extend(failures);

    let (uploads, failures) = remove_dir_files(&state.config.upload_dir, &queued).await;
    report.uploads_deleted = uploads;
    report.failures.extend(failures);

    if report.failures.is_empty() {
        tracing::info!(
            records = report.records_deleted,
            artifacts = report.artifacts_deleted,
            uploads = report.uploads_deleted,
            uploads_kept = queued.len(),
            "Results cleared",
        );
    } else {
        tracing::warn!(
            records = report.records_deleted,
            failures = report.failures.len(),
            "Results partially cleared",
        );
    }
    Ok(report)
}

/// Remove every regular file directly inside `dir` whose name is not in `keep`.
///
/// Returns the number removed and a description of each failure. A missing
/// directory counts as already empty.
async fn remove_dir_files(dir: &Path, keep: &HashSet<OsString>) -> (u64, Vec<String>) {
    let mut failures = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return (0, failures),
        Err(e) => {
            failures.push(format!("{}: {e}", dir.display()));
            return (0, failures);
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if keep.contains(&entry.file_name()) {
                    continue;
                }
                if entry.file_type().await.is_ok_and(|t| t.is_file()) {
                    files.push(entry.path());
                }
            }
            Ok(None) => break,
            Err(e) => {
                failures.push(format!("{}: {e}", dir.display()));
                break;
            }
        }
    }

    let outcomes =
        futures::future::join_all(files.iter().map(|path| tokio::fs::remove_file(path))).await;

    let mut removed = 0;
    for (path, outcome) in files.iter().zip(outcomes) {
        match outcome {
            Ok(()) => removed += 1,
            Err(e) => failures.push(format!("{}: {e}", path.display())),
        }
    }
    (removed, failures)
}

// ---------------------------------------------------------------------------
// Targeted delete
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DeleteReport {
    pub filename: String,
    pub records_deleted: usize,
    pub files_deleted: u64,
}

/// Delete the ledger records, artifacts and uploads for one file name.
///
/// `filename` may be either a display name or an artifact name. Fails with
/// `NotFound` when nothing matched.
pub async fn delete_result(state: &AppState, filename: &str) -> AppResult<DeleteReport> {
    let name = sanitize_filename(filename);
    let config = &state.config;

    let records = LedgerRepo::delete_by_filename(&state.pool, &name).await?;

    let mut paths: Vec<PathBuf> = vec![config.results_dir.join(&name)];
    for record in &records {
        if record.job_kind == JobKind::Detect.name() && !record.artifact_ref.is_empty() {
            paths.push(config.results_dir.join(&record.artifact_ref));
        }
        paths.push(
            config
                .upload_dir
                .join(staged_name(&record.job_id, &record.display_name)),
        );
    }
    paths.sort();
    paths.dedup();

    let mut files_deleted = 0;
    for path in &paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => files_deleted += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete result file");
            }
        }
    }

    if records.is_empty() && files_deleted == 0 {
        return Err(CoreError::NotFound {
            entity: "Result",
            id: name,
        }
        .into());
    }

    tracing::info!(
        filename = %name,
        records = records.len(),
        files = files_deleted,
        "Result deleted",
    );
    Ok(DeleteReport {
        filename: name,
        records_deleted: records.len(),
        files_deleted,
    })
}
