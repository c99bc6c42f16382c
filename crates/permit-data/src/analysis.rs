//! Main analysis pipeline.
//!
//! Loads the operative and usage tables, aggregates per-application and
//! per-user summaries and writes whichever outputs were requested.

use std::time::Instant;

use permit_core::error::Result;
use permit_core::models::{OperativeData, UsageEvent, UserSummary};
use permit_core::settings::{AnalysisConfig, AnalysisPaths};
use tracing::{info, warn};

use crate::aggregator::{Aggregator, ApplicationAggregation};
use crate::reader::{load_operative_data, load_usage_data};
use crate::writer::{write_application_summary, write_comments_by_application, write_user_summary};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone)]
pub struct AnalysisMetadata {
    /// Operative records loaded, or 0 when no operative file was given.
    pub operative_records: usize,
    /// Usage events kept after dropping rows without a municipality.
    pub usage_events: usize,
    pub applications_summarized: usize,
    /// Applications with usage events but no operative record.
    pub applications_skipped: usize,
    /// Rows of the joined application table.
    pub application_rows: usize,
    pub users_summarized: usize,
    /// Wall-clock seconds spent loading both tables.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent aggregating.
    pub aggregate_time_seconds: f64,
}

/// Output of [`analyze`]: the summaries of one run, before joining.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    /// `None` when no operative data was available.
    pub applications: Option<ApplicationAggregation>,
    pub users: Vec<UserSummary>,
}

/// The complete output of [`run_analysis`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub output: AnalysisOutput,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Aggregate already-loaded data.
///
/// Application summaries need operative data; user summaries are always
/// produced.
pub fn analyze(
    operative: Option<&OperativeData>,
    events: &[UsageEvent],
    config: &AnalysisConfig,
) -> AnalysisOutput {
    let aggregator = Aggregator::new(config);

    let applications = match operative {
        Some(operative) => Some(aggregator.summarize_applications(operative, events)),
        None => {
            warn!("No operative data given; skipping application summary");
            None
        }
    };
    let users = aggregator.summarize_users(events);

    AnalysisOutput {
        applications,
        users,
    }
}

/// Run the full pipeline.
///
/// 1. Validate `config` and load both tables (fail-fast on bad input).
/// 2. Aggregate with [`analyze`].
/// 3. Join application summaries onto the operative table.
/// 4. Write every output whose path is set.
pub fn run_analysis(paths: &AnalysisPaths, config: &AnalysisConfig) -> Result<AnalysisResult> {
    config.validate()?;

    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = Instant::now();
    let operative = paths
        .operative
        .as_deref()
        .map(load_operative_data)
        .transpose()?;
    let events = load_usage_data(&paths.usage)?;
    let load_time = load_start.elapsed().as_secs_f64();

    if let Some(operative) = &operative {
        info!("Total number of apps: {}", operative.len());
    }
    log_event_range(&events);

    // ── Step 2: Aggregate ─────────────────────────────────────────────────────
    let aggregate_start = Instant::now();
    let output = analyze(operative.as_ref(), &events, config);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    // ── Step 3–4: Join and write ──────────────────────────────────────────────
    let mut application_rows = 0usize;
    if let (Some(operative), Some(applications)) = (&operative, &output.applications) {
        let rows = Aggregator::join(operative, &applications.summaries);
        application_rows = rows.len();

        if let Some(path) = &paths.applications_out {
            write_application_summary(path, &operative.headers, &rows)?;
        }
        if let Some(path) = &paths.comments_out {
            write_comments_by_application(path, &rows)?;
        }
    }
    if let Some(path) = &paths.users_out {
        write_user_summary(path, &output.users)?;
    }

    let (summarized, skipped) = output
        .applications
        .as_ref()
        .map(|a| (a.summaries.len(), a.skipped.len()))
        .unwrap_or((0, 0));

    let metadata = AnalysisMetadata {
        operative_records: operative.as_ref().map_or(0, OperativeData::len),
        usage_events: events.len(),
        applications_summarized: summarized,
        applications_skipped: skipped,
        application_rows,
        users_summarized: output.users.len(),
        load_time_seconds: load_time,
        aggregate_time_seconds: aggregate_time,
    };

    Ok(AnalysisResult { output, metadata })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn log_event_range(events: &[UsageEvent]) {
    let first = events.iter().map(|e| e.timestamp).min();
    let last = events.iter().map(|e| e.timestamp).max();
    match (first, last) {
        (Some(first), Some(last)) => info!(
            "Total number of events: {} with time range from {} to {}",
            events.len(),
            first,
            last
        ),
        _ => info!("Total number of events: 0"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
