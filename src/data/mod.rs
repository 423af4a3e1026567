use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::IngestError;

pub mod conflict;
pub mod ingest;

/// Columns the pipeline reads; anything else in the header is ignored.
pub const EXPECTED_COLUMNS: [&str; 9] = [
    "paid",
    "conflict_name",
    "location",
    "side_a",
    "side_b",
    "intensity_level",
    "start_date",
    "peace_date",
    "end_date",
];

/// A row is only eligible when all of these are present and non-empty.
pub const REQUIRED_COLUMNS: [&str; 4] = ["start_date", "peace_date", "end_date", "conflict_name"];

/// One dynamically typed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Null,
}

static NULL: RawValue = RawValue::Null;

impl RawValue {
    /// Empty cells become `Null`, cells that are entirely a finite decimal
    /// number become `Number`, everything else stays text.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return RawValue::Null;
        }
        if looks_numeric(trimmed) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return RawValue::Number(n);
                }
            }
        }
        RawValue::Text(cell.to_string())
    }

    /// Truthiness: null, blank text and numeric zero are all absent.
    pub fn is_present(&self) -> bool {
        match self {
            RawValue::Null => false,
            RawValue::Text(s) => !s.trim().is_empty(),
            RawValue::Number(n) => *n != 0.0,
        }
    }

    /// Present values rendered as trimmed text; integral numbers lose the `.0`.
    pub fn as_text(&self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        match self {
            RawValue::Text(s) => Some(s.trim().to_string()),
            RawValue::Number(n) => Some(format_number(*n)),
            RawValue::Null => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Field-name to raw-value mapping for one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    values: HashMap<String, RawValue>,
}

impl RawRow {
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Missing columns read as `Null`.
    pub fn get(&self, column: &str) -> &RawValue {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parsed delimited text: the header row and the records under it.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn missing_columns(&self) -> Vec<String> {
        EXPECTED_COLUMNS
            .iter()
            .filter(|c| !self.columns.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect()
    }
}

/// Parse comma-delimited text with a header row. Blank lines are skipped,
/// short rows leave trailing columns absent, extra cells are dropped.
pub fn parse_table(text: &str) -> Result<Table, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)?
        .into_iter()
        .filter(|rec| !(rec.len() == 1 && rec[0].trim().is_empty()));

    let columns: Vec<String> = match records.next() {
        Some(header) => header.into_iter().map(|c| c.trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };

    let rows = records
        .map(|cells| {
            RawRow::from_pairs(
                columns
                    .iter()
                    .zip(cells.iter())
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, cell)| (name.clone(), RawValue::from_cell(cell))),
            )
        })
        .collect();

    Ok(Table { columns, rows })
}

fn split_records(text: &str) -> Result<Vec<Vec<String>>, IngestError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut quote_line = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(IngestError::MalformedTable {
            line: quote_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

pub fn text_sha256(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("conflicts.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}
