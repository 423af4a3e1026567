use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::conflict::{fallback_conflicts, Conflict, Entropy};
use super::{parse_table, text_sha256, Table};
use crate::error::IngestError;
use crate::logging::{log_fallback, log_ingest_summary, log_row_rejected, log_sample, ProfileScope};
use crate::source::DataSource;

pub const DEFAULT_SAMPLE_SIZE: usize = 8;

/// What happened to the rows of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub sha256: String,
    pub columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub rows_read: usize,
    pub accepted: usize,
    /// Rejection counts keyed by `RowRejection::reason`.
    pub rejected: BTreeMap<String, usize>,
    pub sampled: usize,
}

impl IngestReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Result handed to the session: either the sample of the real dataset or
/// the built-in fallback with `failed` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub sample: Vec<Conflict>,
    pub failed: bool,
    pub error: Option<String>,
    pub report: Option<IngestReport>,
}

impl IngestOutcome {
    pub fn fallback(error: &IngestError) -> Self {
        log_fallback(&error.to_string());
        Self {
            sample: fallback_conflicts(),
            failed: true,
            error: Some(format!("Failed to load conflict data: {}", error)),
            report: None,
        }
    }
}

/// Validate every row in order, dropping the ones that cannot become a conflict.
pub fn process_rows<E: Entropy + ?Sized>(table: &Table, entropy: &mut E) -> (Vec<Conflict>, IngestReport) {
    let mut report = IngestReport {
        columns: table.columns.clone(),
        missing_columns: table.missing_columns(),
        rows_read: table.rows.len(),
        ..Default::default()
    };
    let mut accepted = Vec::with_capacity(table.rows.len());

    for (idx, row) in table.rows.iter().enumerate() {
        match Conflict::from_row(row, entropy) {
            Ok(conflict) => accepted.push(conflict),
            Err(rejection) => {
                // header is row 1
                log_row_rejected(idx + 2, rejection.reason(), &rejection.to_string());
                *report.rejected.entry(rejection.reason().to_string()).or_insert(0) += 1;
            }
        }
    }

    report.accepted = accepted.len();
    (accepted, report)
}

/// Highest bloodiness first; equal values keep their input order.
pub fn rank_by_bloodiness(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|a, b| b.bloodiness.cmp(&a.bloodiness));
}

pub fn stride_step(population: usize, sample_size: usize) -> usize {
    if sample_size == 0 {
        return 1;
    }
    (population / sample_size).max(1)
}

/// Every `step`-th element from the front, at most `sample_size` of them.
pub fn stride_sample(ranked: &[Conflict], sample_size: usize) -> Vec<Conflict> {
    if sample_size == 0 {
        return Vec::new();
    }
    let step = stride_step(ranked.len(), sample_size);
    let picked: Vec<Conflict> = ranked
        .iter()
        .step_by(step)
        .take(sample_size)
        .cloned()
        .collect();
    let ids: Vec<String> = picked.iter().map(|c| c.id.clone()).collect();
    log_sample(ranked.len(), step, &ids);
    picked
}

/// Parse, validate, rank and sample. Errors here mean the whole dataset is unusable.
pub fn try_ingest<E: Entropy + ?Sized>(
    raw_text: &str,
    sample_size: usize,
    entropy: &mut E,
) -> Result<(Vec<Conflict>, IngestReport), IngestError> {
    let _scope = ProfileScope::with_context("ingest", &[("bytes", serde_json::json!(raw_text.len()))]);
    let table = parse_table(raw_text)?;
    let (mut conflicts, mut report) = process_rows(&table, entropy);
    report.sha256 = text_sha256(raw_text);

    rank_by_bloodiness(&mut conflicts);
    let sample = stride_sample(&conflicts, sample_size);
    report.sampled = sample.len();

    log_ingest_summary(report.rows_read, report.accepted, report.rejected_total(), &report.sha256);
    Ok((sample, report))
}

/// Never fails: any pipeline error swaps in the fallback dataset.
pub fn ingest<E: Entropy + ?Sized>(raw_text: &str, sample_size: usize, entropy: &mut E) -> IngestOutcome {
    match try_ingest(raw_text, sample_size, entropy) {
        Ok((sample, report)) => IngestOutcome {
            sample,
            failed: false,
            error: None,
            report: Some(report),
        },
        Err(err) => IngestOutcome::fallback(&err),
    }
}

/// Fetch once and ingest. No retry; a fetch failure goes straight to the fallback.
pub async fn load<S, E>(source: &S, sample_size: usize, entropy: &mut E) -> IngestOutcome
where
    S: DataSource + ?Sized,
    E: Entropy + ?Sized,
{
    match source.fetch_text().await {
        Ok(text) => ingest(&text, sample_size, entropy),
        Err(err) => IngestOutcome::fallback(&IngestError::Fetch {
            source_name: source.describe(),
            message: format!("{:#}", err),
        }),
    }
}
