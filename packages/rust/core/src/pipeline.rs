//! Ingestion pipeline: fetch → row mapping → find-or-create → task log.
//!
//! Per-row parse errors and per-candidate validation rejections are
//! collected without aborting the batch; a document-level retrieval
//! failure aborts the run and surfaces through the task runner as an
//! error-level log entry.

use chrono::Utc;
use tracing::{info, instrument, warn};

use kyukou_scrape::Scraper;
use kyukou_shared::config::Source;
use kyukou_shared::{KyukouError, Result, Severity, TaskLogEntry, TaskOutcome};
use kyukou_storage::Storage;

use crate::runner::run_task;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Candidates persisted as new records.
    pub created: usize,
    /// Candidates that matched an already-stored record.
    pub known: usize,
    /// Rows that failed to parse.
    pub failed_rows: usize,
    /// Candidates rejected by persistence-time validation.
    pub rejected: usize,
}

/// Ingest one source: scrape its page and find-or-create every candidate.
///
/// Returns a typed outcome summarizing the run: warning when any row
/// failed or was rejected, informational otherwise.
#[instrument(skip_all, fields(source = %source.name))]
pub async fn ingest_source(
    scraper: &Scraper,
    source: &Source,
    storage: &Storage,
) -> Result<TaskOutcome> {
    let now = Utc::now();
    let results = scraper.scrape(source).await?;

    let mut stats = IngestStats::default();
    let mut failures: Vec<String> = Vec::new();

    for result in results {
        let candidate = match result {
            Ok(event) => event,
            Err(row_err) => {
                warn!(error = %row_err, "row parse failed");
                stats.failed_rows += 1;
                failures.push(row_err.to_string());
                continue;
            }
        };

        match storage.find_or_create(&candidate, now).await {
            Ok((_, true)) => stats.created += 1,
            Ok((_, false)) => stats.known += 1,
            Err(KyukouError::Validation { message }) => {
                warn!(%message, hash = %candidate.hash, "candidate rejected");
                stats.rejected += 1;
                failures.push(message);
            }
            // Storage failures are not row-isolated; fail the run.
            Err(e) => return Err(e),
        }
    }

    info!(
        created = stats.created,
        known = stats.known,
        failed_rows = stats.failed_rows,
        rejected = stats.rejected,
        "ingest finished"
    );

    Ok(summarize(source, &stats, &failures))
}

/// Run [`ingest_source`] through the task runner and persist the entry.
pub async fn run_and_log(
    scraper: &Scraper,
    source: &Source,
    storage: &Storage,
) -> Result<TaskLogEntry> {
    let entry = run_task(|| ingest_source(scraper, source, storage)).await;
    storage.insert_task_log(&entry).await?;
    Ok(entry)
}

fn summarize(source: &Source, stats: &IngestStats, failures: &[String]) -> TaskOutcome {
    let mut message = format!(
        "{}: {} new, {} known",
        source.name, stats.created, stats.known
    );

    if failures.is_empty() {
        return TaskOutcome::new(Severity::Notice, message);
    }

    message.push_str(&format!(
        ", {} failed ({})",
        failures.len(),
        failures.join("; ")
    ));
    TaskOutcome::new(Severity::Warning, message)
}
