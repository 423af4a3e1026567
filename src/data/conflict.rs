use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{RawRow, RawValue};
use crate::error::RowRejection;

const SECS_PER_DAY: f64 = 86_400.0;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FALLBACK_ID_LEN: usize = 9;

/// Source of the randomized domain fields. Ingestion and layout never reach
/// for a global generator.
pub trait Entropy {
    /// Uniform in [1, 5].
    fn bloodiness(&mut self) -> u8;
    /// Uniform in [1, 3]; used when the row has no intensity level.
    fn intensity_level(&mut self) -> i64;
    /// Token used when the row has no `paid` identifier.
    fn fallback_id(&mut self) -> String;
    /// Uniform in [0, 1); layout jitter.
    fn unit(&mut self) -> f64;
}

/// `Entropy` backed by `StdRng`, optionally pinned by a seed.
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: StdRng,
}

impl SeededEntropy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Entropy for SeededEntropy {
    fn bloodiness(&mut self) -> u8 {
        self.rng.gen_range(1..=5)
    }

    fn intensity_level(&mut self) -> i64 {
        self.rng.gen_range(1..=3)
    }

    fn fallback_id(&mut self) -> String {
        (0..FALLBACK_ID_LEN)
            .map(|_| ID_ALPHABET[self.rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }

    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDates {
    pub start: NaiveDate,
    pub peace: NaiveDate,
    pub end: NaiveDate,
}

/// One conflict episode ready for display. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub name: String,
    pub location: String,
    pub sides: String,
    pub intensity_level: i64,
    /// `None` only for the built-in fallback records.
    pub dates: Option<EpisodeDates>,
    pub total_days: i64,
    pub war_to_peace_days: i64,
    pub peace_to_end_days: i64,
    pub start_year: i32,
    pub peace_year: i32,
    pub end_year: i32,
    pub bloodiness: u8,
}

impl Conflict {
    /// Validate and derive a conflict from one raw row.
    pub fn from_row<E: Entropy + ?Sized>(row: &RawRow, entropy: &mut E) -> Result<Self, RowRejection> {
        for field in super::REQUIRED_COLUMNS {
            if !row.get(field).is_present() {
                return Err(RowRejection::MissingField(field));
            }
        }

        let start = parse_instant("start_date", row.get("start_date"))?;
        let peace = parse_instant("peace_date", row.get("peace_date"))?;
        let end = parse_instant("end_date", row.get("end_date"))?;

        let war_to_peace_days = round_days(start, peace);
        let peace_to_end_days = round_days(peace, end);
        let total_days = war_to_peace_days + peace_to_end_days;

        if total_days <= 0 {
            return Err(RowRejection::NonPositiveTotal(total_days));
        }
        if war_to_peace_days < 0 {
            return Err(RowRejection::NegativeInterval {
                field: "war_to_peace_days",
                days: war_to_peace_days,
            });
        }
        if peace_to_end_days < 0 {
            return Err(RowRejection::NegativeInterval {
                field: "peace_to_end_days",
                days: peace_to_end_days,
            });
        }

        let id = row
            .get("paid")
            .as_text()
            .unwrap_or_else(|| entropy.fallback_id());
        let name = row.get("conflict_name").as_text().unwrap_or_default();
        let location = text_or_unknown(row.get("location"));
        let sides = format!(
            "{} vs {}",
            text_or_unknown(row.get("side_a")),
            text_or_unknown(row.get("side_b"))
        );
        let intensity_level = match row.get("intensity_level").as_number() {
            Some(n) if n != 0.0 => n.round() as i64,
            _ => entropy.intensity_level(),
        };

        let dates = EpisodeDates {
            start: start.date(),
            peace: peace.date(),
            end: end.date(),
        };

        Ok(Self {
            id,
            name,
            location,
            sides,
            intensity_level,
            dates: Some(dates),
            total_days,
            war_to_peace_days,
            peace_to_end_days,
            start_year: dates.start.year(),
            peace_year: dates.peace.year(),
            end_year: dates.end.year(),
            bloodiness: entropy.bloodiness(),
        })
    }
}

fn text_or_unknown(value: &RawValue) -> String {
    value.as_text().unwrap_or_else(|| "Unknown".to_string())
}

fn parse_instant(field: &'static str, value: &RawValue) -> Result<NaiveDateTime, RowRejection> {
    let invalid = || RowRejection::InvalidDate {
        field,
        value: value.as_text().unwrap_or_default(),
    };
    match value {
        RawValue::Text(s) => parse_date_text(s.trim()).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Accepts calendar dates and ISO-8601 timestamps; no locale-dependent forms
/// beyond the US `MM/DD/YYYY` slash order.
pub fn parse_date_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Some(dt);
        }
    }
    None
}

fn round_days(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    // Halves round toward +inf, so a -12h offset is zero days, not -1.
    let secs = (to - from).num_seconds() as f64;
    (secs / SECS_PER_DAY + 0.5).floor() as i64
}

/// Shown when the dataset cannot be loaded at all.
pub fn fallback_conflicts() -> Vec<Conflict> {
    vec![
        Conflict {
            id: "1".to_string(),
            name: "Colombian Civil War".to_string(),
            location: "Colombia".to_string(),
            sides: "Government vs FARC".to_string(),
            intensity_level: 3,
            dates: None,
            total_days: 18627,
            war_to_peace_days: 4018,
            peace_to_end_days: 14609,
            start_year: 1964,
            peace_year: 1975,
            end_year: 2015,
            bloodiness: 5,
        },
        Conflict {
            id: "2".to_string(),
            name: "Cambodian Civil War".to_string(),
            location: "Cambodia".to_string(),
            sides: "Government vs Khmer Rouge".to_string(),
            intensity_level: 4,
            dates: None,
            total_days: 11323,
            war_to_peace_days: 2832,
            peace_to_end_days: 8491,
            start_year: 1967,
            peace_year: 1975,
            end_year: 1998,
            bloodiness: 4,
        },
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Entropy;
    use std::collections::VecDeque;

    /// Deterministic entropy: bloodiness values are played back in order,
    /// everything else is fixed.
    #[derive(Debug, Default)]
    pub struct ScriptedEntropy {
        pub bloodiness: VecDeque<u8>,
        pub ids_issued: usize,
    }

    impl ScriptedEntropy {
        pub fn with_bloodiness(values: &[u8]) -> Self {
            Self {
                bloodiness: values.iter().copied().collect(),
                ids_issued: 0,
            }
        }
    }

    impl Entropy for ScriptedEntropy {
        fn bloodiness(&mut self) -> u8 {
            self.bloodiness.pop_front().unwrap_or(1)
        }

        fn intensity_level(&mut self) -> i64 {
            2
        }

        fn fallback_id(&mut self) -> String {
            self.ids_issued += 1;
            format!("gen{:06}", self.ids_issued)
        }

        fn unit(&mut self) -> f64 {
            0.5
        }
    }
}
