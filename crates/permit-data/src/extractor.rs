//! Per-application metric extraction.
//!
//! Combines the event filter, the session segmenter and the static record's
//! milestone dates into one [`ApplicationSummary`].

use std::collections::HashSet;

use permit_core::calculations::{flow_efficiency, lead_time_days};
use permit_core::filter::EventFilter;
use permit_core::models::{
    Action, ApplicationRecord, ApplicationSummary, Milestone, Role, Target, UsageEvent,
};
use permit_core::session::SessionSegmenter;
use permit_core::settings::AnalysisConfig;

/// Stateless extractor configured once per run.
#[derive(Debug, Clone, Copy)]
pub struct MetricExtractor {
    segmenter: SessionSegmenter,
    lead_time_from: Milestone,
    lead_time_till: Milestone,
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl MetricExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            segmenter: SessionSegmenter::new(config.session_threshold()),
            lead_time_from: config.lead_time_from,
            lead_time_till: config.lead_time_till,
        }
    }

    /// Build the summary for one application.
    ///
    /// `events` must be that application's events only, sorted by time.
    /// Counts with no matching event are 0; lead time and flow efficiency
    /// are `None` when a milestone is missing.
    pub fn extract(&self, record: &ApplicationRecord, events: &[UsageEvent]) -> ApplicationSummary {
        let comments = EventFilter::new()
            .action(Action::AddComment)
            .target(Target::Application);

        let from = record.milestone(self.lead_time_from);
        let till = record.milestone(self.lead_time_till);

        ApplicationSummary {
            application_id: record.application_id.clone(),
            n_events: events.len(),
            n_users: distinct_users(events, &EventFilter::new()),
            n_update_docs: EventFilter::new().action(Action::UpdateDoc).count(events),
            n_application_comments: comments.count(events),
            n_application_comments_applicant: comments.clone().role(Role::Applicant).count(events),
            n_application_comments_authority: comments.role(Role::Authority).count(events),
            session_length: self
                .segmenter
                .active_minutes(events.iter().map(|e| e.timestamp)),
            session_length_applicant: self
                .segmenter
                .active_minutes_for_role(events, Role::Applicant),
            session_length_authority: self
                .segmenter
                .active_minutes_for_role(events, Role::Authority),
            lead_time: lead_time_days(from, till),
            flow_efficiency: flow_efficiency(from, till, events.iter().map(|e| e.timestamp)),
            n_users_applicant: distinct_users(events, &EventFilter::new().role(Role::Applicant)),
            n_users_authority: distinct_users(events, &EventFilter::new().role(Role::Authority)),
        }
    }
}

fn distinct_users(events: &[UsageEvent], filter: &EventFilter) -> usize {
    filter
        .apply(events)
        .into_iter()
        .map(|e| e.user_id)
        .collect::<HashSet<i64>>()
        .len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
