//! Per-entity aggregation of usage events.
//!
//! Drives the [`MetricExtractor`] over every application found in the usage
//! data, joins the results back onto the operative table and builds the
//! per-user role summary.

use std::borrow::Cow;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use permit_core::models::{
    ApplicationRecord, ApplicationSummary, OperativeData, Role, UsageEvent, UserSummary,
};
use permit_core::settings::AnalysisConfig;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::extractor::MetricExtractor;

const APPLICATION_PROGRESS_INTERVAL: usize = 1000;
const USER_PROGRESS_INTERVAL: usize = 100;

// ── Result types ──────────────────────────────────────────────────────────────

/// Application summaries in first-appearance order, plus the ids that had
/// usage events but no operative record.
#[derive(Debug, Clone, Default)]
pub struct ApplicationAggregation {
    pub summaries: Vec<ApplicationSummary>,
    pub skipped: Vec<String>,
}

/// One row of the joined application table.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRow<'a> {
    pub record: &'a ApplicationRecord,
    pub summary: &'a ApplicationSummary,
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Groups events by entity and collects one summary per entity.
pub struct Aggregator {
    extractor: MetricExtractor,
    parallel: bool,
}

impl Aggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            extractor: MetricExtractor::new(config),
            parallel: config.parallel,
        }
    }

    /// Summarise every application that appears in `events`.
    ///
    /// Iteration is driven by the usage data: an application with an
    /// operative record but no events never appears, one with events but no
    /// operative record is skipped with a warning. When an id occurs on
    /// several operative rows the first one is used.
    pub fn summarize_applications(
        &self,
        operative: &OperativeData,
        events: &[UsageEvent],
    ) -> ApplicationAggregation {
        let events = sorted_by(events, |a, b| {
            a.application_id
                .cmp(&b.application_id)
                .then(a.timestamp.cmp(&b.timestamp))
        });

        let distinct_actions: HashSet<&str> = events.iter().map(|e| e.action.as_str()).collect();
        info!(
            "Analyzing {} usage events ({} unique actions)",
            events.len(),
            distinct_actions.len()
        );

        let mut by_id: HashMap<&str, &ApplicationRecord> = HashMap::new();
        for record in &operative.records {
            by_id.entry(record.application_id.as_str()).or_insert(record);
        }

        let groups: Vec<&[UsageEvent]> = events
            .chunk_by(|a, b| a.application_id == b.application_id)
            .collect();
        let progress = Progress::new("applications", groups.len(), APPLICATION_PROGRESS_INTERVAL);

        let extract = |group: &&[UsageEvent]| -> Result<ApplicationSummary, String> {
            let application_id = group[0].application_id.as_str();
            match by_id.get(application_id) {
                Some(record) => {
                    let summary = self.extractor.extract(record, group);
                    progress.tick();
                    Ok(summary)
                }
                None => {
                    warn!(
                        "Skipping application with no operative data: {}",
                        application_id
                    );
                    Err(application_id.to_string())
                }
            }
        };

        let outcomes: Vec<Result<ApplicationSummary, String>> = if self.parallel {
            groups.par_iter().map(extract).collect()
        } else {
            groups.iter().map(extract).collect()
        };

        let mut aggregation = ApplicationAggregation::default();
        for outcome in outcomes {
            match outcome {
                Ok(summary) => aggregation.summaries.push(summary),
                Err(id) => aggregation.skipped.push(id),
            }
        }
        progress.finish();
        aggregation
    }

    /// Summarise every user that appears in `events`, ordered by user id.
    pub fn summarize_users(&self, events: &[UsageEvent]) -> Vec<UserSummary> {
        let events = sorted_by(events, |a, b| {
            a.user_id.cmp(&b.user_id).then(a.timestamp.cmp(&b.timestamp))
        });
        let groups: Vec<&[UsageEvent]> = events.chunk_by(|a, b| a.user_id == b.user_id).collect();
        let progress = Progress::new("users", groups.len(), USER_PROGRESS_INTERVAL);

        let summarize = |group: &&[UsageEvent]| -> UserSummary {
            let summary = UserSummary {
                user_id: group[0].user_id,
                applicant_roles: distinct_applications(group, &Role::Applicant),
                authority_roles: distinct_applications(group, &Role::Authority),
            };
            progress.tick();
            summary
        };

        let summaries: Vec<UserSummary> = if self.parallel {
            groups.par_iter().map(summarize).collect()
        } else {
            groups.iter().map(summarize).collect()
        };
        progress.finish();
        summaries
    }

    /// Inner-join `summaries` onto the operative table by application id.
    ///
    /// Rows follow the operative table's order; operative rows without a
    /// summary are dropped, and every operative row sharing an id receives
    /// that id's summary.
    pub fn join<'a>(
        operative: &'a OperativeData,
        summaries: &'a [ApplicationSummary],
    ) -> Vec<JoinedRow<'a>> {
        let by_id: HashMap<&str, &ApplicationSummary> = summaries
            .iter()
            .map(|s| (s.application_id.as_str(), s))
            .collect();

        operative
            .records
            .iter()
            .filter_map(|record| {
                by_id
                    .get(record.application_id.as_str())
                    .copied()
                    .map(|summary| JoinedRow { record, summary })
            })
            .collect()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Borrow `events` when already ordered by `compare`, otherwise sort a copy.
fn sorted_by<F>(events: &[UsageEvent], compare: F) -> Cow<'_, [UsageEvent]>
where
    F: Fn(&UsageEvent, &UsageEvent) -> CmpOrdering,
{
    if events
        .windows(2)
        .all(|w| compare(&w[0], &w[1]) != CmpOrdering::Greater)
    {
        return Cow::Borrowed(events);
    }
    let mut owned = events.to_vec();
    owned.sort_by(|a, b| compare(a, b));
    Cow::Owned(owned)
}

fn distinct_applications(events: &[UsageEvent], role: &Role) -> usize {
    events
        .iter()
        .filter(|e| &e.role == role)
        .map(|e| e.application_id.as_str())
        .collect::<HashSet<&str>>()
        .len()
}

/// Coarse progress reporting that works from sequential and parallel loops.
struct Progress {
    label: &'static str,
    total: usize,
    interval: usize,
    done: AtomicUsize,
}

impl Progress {
    fn new(label: &'static str, total: usize, interval: usize) -> Self {
        Self {
            label,
            total,
            interval,
            done: AtomicUsize::new(0),
        }
    }

    fn tick(&self) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.interval == 0 {
            info!(
                "Processing {}... {}%",
                self.label,
                n * 100 / self.total.max(1)
            );
        }
    }

    fn finish(&self) {
        info!(
            "Processed {} of {} {}",
            self.done.load(Ordering::Relaxed),
            self.total,
            self.label
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
