//! Output tables: application summary CSV, user summary CSV and the
//! comments-by-application JSON records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{Terminator, WriterBuilder};
use permit_core::error::{AnalysisError, Result};
use permit_core::models::{ApplicationSummary, UserSummary};
use tracing::info;

use crate::aggregator::JoinedRow;
use crate::reader::DELIMITER;

/// Summary columns appended after the operative columns.
pub const SUMMARY_COLUMNS: [&str; 13] = [
    "nEvents",
    "nUsers",
    "nUpdateDocs",
    "nApplicationComments",
    "nApplicationCommentsApplicant",
    "nApplicationCommentsAuthority",
    "sessionLength",
    "sessionLengthApplicant",
    "sessionLengthAuthority",
    "leadTime",
    "flowEfficiency",
    "nUsersApplicant",
    "nUsersAuthority",
];

pub const USER_COLUMNS: [&str; 3] = ["userId", "applicantRoles", "authorityRoles"];

// ── Path-based API ────────────────────────────────────────────────────────────

/// Write the joined application table to `path`.
pub fn write_application_summary(
    path: &Path,
    operative_headers: &[String],
    rows: &[JoinedRow<'_>],
) -> Result<()> {
    write_applications_to(create(path)?, operative_headers, rows)?;
    info!("Wrote {} application rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write the user summary table to `path`.
pub fn write_user_summary(path: &Path, users: &[UserSummary]) -> Result<()> {
    write_users_to(create(path)?, users)?;
    info!("Wrote {} user rows to {}", users.len(), path.display());
    Ok(())
}

/// Write one JSON record per joined application row to `path`.
pub fn write_comments_by_application(path: &Path, rows: &[JoinedRow<'_>]) -> Result<()> {
    let mut out = BufWriter::new(create(path)?);
    write_comments_to(&mut out, rows)?;
    out.flush()?;
    info!("Wrote {} comment records to {}", rows.len(), path.display());
    Ok(())
}

// ── Writer-based API ──────────────────────────────────────────────────────────

/// Semicolon CSV with a leading unnamed row index, the operative columns
/// and then [`SUMMARY_COLUMNS`]. Missing values are empty cells.
pub fn write_applications_to<W: Write>(
    out: W,
    operative_headers: &[String],
    rows: &[JoinedRow<'_>],
) -> Result<()> {
    let mut writer = csv_writer(out);

    let mut header: Vec<&str> =
        Vec::with_capacity(1 + operative_headers.len() + SUMMARY_COLUMNS.len());
    header.push("");
    header.extend(operative_headers.iter().map(String::as_str));
    header.extend(SUMMARY_COLUMNS);
    writer.write_record(&header)?;

    for (index, row) in rows.iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(index.to_string());
        for i in 0..operative_headers.len() {
            record.push(row.record.cells.get(i).cloned().unwrap_or_default());
        }
        record.extend(summary_cells(row.summary));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Semicolon CSV with a leading unnamed row index and [`USER_COLUMNS`].
pub fn write_users_to<W: Write>(out: W, users: &[UserSummary]) -> Result<()> {
    let mut writer = csv_writer(out);

    let mut header = vec![""];
    header.extend(USER_COLUMNS);
    writer.write_record(&header)?;

    for (index, user) in users.iter().enumerate() {
        writer.write_record([
            index.to_string(),
            user.user_id.to_string(),
            user.applicant_roles.to_string(),
            user.authority_roles.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// JSON array of application summaries, one object per row.
pub fn write_comments_to<W: Write>(out: W, rows: &[JoinedRow<'_>]) -> Result<()> {
    let records: Vec<&ApplicationSummary> = rows.iter().map(|r| r.summary).collect();
    serde_json::to_writer(out, &records)?;
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| AnalysisError::FileOpen {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_writer<W: Write>(out: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out)
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Cells in [`SUMMARY_COLUMNS`] order.
fn summary_cells(s: &ApplicationSummary) -> [String; 13] {
    [
        s.n_events.to_string(),
        s.n_users.to_string(),
        s.n_update_docs.to_string(),
        s.n_application_comments.to_string(),
        s.n_application_comments_applicant.to_string(),
        s.n_application_comments_authority.to_string(),
        s.session_length.to_string(),
        s.session_length_applicant.to_string(),
        s.session_length_authority.to_string(),
        optional(s.lead_time),
        optional(s.flow_efficiency),
        s.n_users_applicant.to_string(),
        s.n_users_authority.to_string(),
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
