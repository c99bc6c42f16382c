//! CSV loading for the operative and usage tables.
//!
//! Both tables are semicolon separated with a header row. Loading is
//! fail-fast: a missing required column, an unparseable date or a
//! non-numeric identifier aborts the whole load with the row that caused it.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use permit_core::error::{AnalysisError, Result};
use permit_core::models::{
    Action, ApplicationRecord, Milestone, OperativeData, Role, Target, UsageEvent,
};
use permit_core::time_utils::parse_datetime;
use serde::Deserialize;
use tracing::debug;

/// Field delimiter shared by every input and output table.
pub const DELIMITER: u8 = b';';

const APPLICATION_ID: &str = "applicationId";
const USAGE_COLUMNS: [&str; 7] = [
    APPLICATION_ID,
    "userId",
    "municipalityId",
    "role",
    "action",
    "target",
    "datetime",
];

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
const I64_LOWER: f64 = i64::MIN as f64;
const I64_UPPER: f64 = i64::MAX as f64;

/// Cell spellings treated as missing values.
const NULL_CELLS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NaT", "null", "NULL"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the operative table, sorted by application id.
///
/// Every source cell is kept on the record so the summary output can carry
/// the source columns through. Empty milestone cells become `None`.
pub fn load_operative_data(path: &Path) -> Result<OperativeData> {
    let mut reader = csv_reader(open(path)?);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let id_idx = column_index(&headers, APPLICATION_ID, path)?;
    let milestone_idx: Vec<(Milestone, usize)> = Milestone::ALL
        .iter()
        .map(|m| column_index(&headers, m.column_name(), path).map(|idx| (*m, idx)))
        .collect::<Result<_>>()?;

    let mut records: Vec<ApplicationRecord> = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = line_of(&row);

        let mut record = ApplicationRecord {
            application_id: cell(&row, id_idx).to_string(),
            cells: row.iter().map(str::to_string).collect(),
            ..Default::default()
        };
        for (milestone, idx) in &milestone_idx {
            let value = parse_date_cell(cell(&row, *idx), milestone.column_name(), line)?;
            record.set_milestone(*milestone, value);
        }
        records.push(record);
    }

    records.sort_by(|a, b| a.application_id.cmp(&b.application_id));

    debug!(
        "Loaded {} operative records from {}",
        records.len(),
        path.display()
    );

    Ok(OperativeData { headers, records })
}

/// Load the usage table, sorted by application id and time.
///
/// Rows without a municipality id are dropped; user and municipality ids
/// are coerced to integers.
pub fn load_usage_data(path: &Path) -> Result<Vec<UsageEvent>> {
    let mut reader = csv_reader(open(path)?);

    let header_record = reader.headers()?.clone();
    let headers: Vec<String> = header_record.iter().map(str::to_string).collect();
    for column in USAGE_COLUMNS {
        column_index(&headers, column, path)?;
    }

    let mut events: Vec<UsageEvent> = Vec::new();
    let mut rows_read = 0u64;
    let mut rows_dropped = 0u64;

    for result in reader.records() {
        let row = result?;
        rows_read += 1;
        let raw: RawUsageRow = row.deserialize(Some(&header_record))?;

        match raw.into_event(line_of(&row))? {
            Some(event) => events.push(event),
            None => rows_dropped += 1,
        }
    }

    events.sort_by(|a, b| {
        a.application_id
            .cmp(&b.application_id)
            .then(a.timestamp.cmp(&b.timestamp))
    });

    debug!(
        "File {}: {} read, {} dropped without municipality, {} kept",
        path.display(),
        rows_read,
        rows_dropped,
        events.len(),
    );

    Ok(events)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// One usage row as it appears on disk, before coercion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUsageRow {
    application_id: String,
    user_id: Option<String>,
    municipality_id: Option<String>,
    role: String,
    action: String,
    target: String,
    datetime: String,
}

impl RawUsageRow {
    /// Coerce into a typed event; `Ok(None)` when the row must be dropped.
    fn into_event(self, line: u64) -> Result<Option<UsageEvent>> {
        let municipality = match self.municipality_id.as_deref() {
            Some(m) if !is_null(m) => m,
            _ => return Ok(None),
        };
        let municipality_id = parse_integer(municipality, "municipalityId", line)?;
        let user_id = parse_integer(self.user_id.as_deref().unwrap_or(""), "userId", line)?;

        let timestamp = parse_date_cell(&self.datetime, "datetime", line)?.ok_or_else(|| {
            AnalysisError::InvalidDate {
                column: "datetime".to_string(),
                value: self.datetime.clone(),
                row: line,
            }
        })?;

        Ok(Some(UsageEvent {
            application_id: self.application_id,
            user_id,
            municipality_id,
            role: Role::from(self.role),
            action: Action::from(self.action),
            target: Target::from(self.target),
            timestamp,
        }))
    }
}

/// Header names are trimmed so the column check and serde agree on them.
fn csv_reader(file: File) -> csv::Reader<File> {
    ReaderBuilder::new()
        .delimiter(DELIMITER)
        .trim(Trim::Headers)
        .from_reader(file)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| AnalysisError::FileOpen {
        path: path.to_path_buf(),
        source,
    })
}

fn column_index(headers: &[String], column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| AnalysisError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })
}

fn cell(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("")
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

fn is_null(value: &str) -> bool {
    NULL_CELLS.contains(&value.trim())
}

/// Parse a possibly-missing date cell; garbage is an error, blanks are `None`.
fn parse_date_cell(value: &str, column: &str, line: u64) -> Result<Option<chrono::NaiveDateTime>> {
    if is_null(value) {
        return Ok(None);
    }
    parse_datetime(value)
        .map(Some)
        .ok_or_else(|| AnalysisError::InvalidDate {
            column: column.to_string(),
            value: value.to_string(),
            row: line,
        })
}

/// Accept `"12"` as well as the float spelling `"12.0"`. Floats outside the
/// `i64` range are rejected.
fn parse_integer(value: &str, column: &str, line: u64) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&f) => Ok(f as i64),
        _ => Err(AnalysisError::InvalidNumber {
            column: column.to_string(),
            value: value.to_string(),
            row: line,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
