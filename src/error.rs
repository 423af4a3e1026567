use thiserror::Error;

/// Why a row was dropped during ingestion. Never surfaced to the session,
/// only counted in the ingest report and traced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a valid date: {value}")]
    InvalidDate { field: &'static str, value: String },
    #[error("total duration {0} days is not positive")]
    NonPositiveTotal(i64),
    #[error("interval `{field}` is negative ({days} days)")]
    NegativeInterval { field: &'static str, days: i64 },
}

impl RowRejection {
    /// Stable key used for counters and log records.
    pub fn reason(&self) -> &'static str {
        match self {
            RowRejection::MissingField(_) => "missing_field",
            RowRejection::InvalidDate { .. } => "invalid_date",
            RowRejection::NonPositiveTotal(_) => "non_positive_total",
            RowRejection::NegativeInterval { .. } => "negative_interval",
        }
    }
}

/// Failure of the pipeline as a whole; absorbed by the fallback dataset.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to fetch {source_name}: {message}")]
    Fetch { source_name: String, message: String },
    #[error("malformed table at line {line}: {message}")]
    MalformedTable { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("session is still loading")]
    NotReady,
    #[error("no conflicts available to select")]
    NoData,
    #[error("no conflict at index {index} (sample has {len})")]
    UnknownConflict { index: usize, len: usize },
    #[error("ingestion already completed for this session")]
    AlreadyLoaded,
    #[error("ingestion already started for this session")]
    AlreadyStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_stable_keys() {
        assert_eq!(RowRejection::MissingField("start_date").reason(), "missing_field");
        assert_eq!(RowRejection::NonPositiveTotal(0).reason(), "non_positive_total");
        assert_eq!(
            RowRejection::NegativeInterval { field: "peace_to_end_days", days: -3 }.reason(),
            "negative_interval"
        );
    }

    #[test]
    fn messages_name_the_field() {
        let err = RowRejection::InvalidDate { field: "peace_date", value: "soon".to_string() };
        assert_eq!(err.to_string(), "field `peace_date` is not a valid date: soon");
    }
}
