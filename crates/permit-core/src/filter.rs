//! Predicate-based slicing of usage events.

use crate::models::{Action, Role, Target, UsageEvent};

/// A conjunction of optional predicates over role, action and target.
///
/// An empty filter matches every event. Each predicate that is set must hold
/// for an event to pass; setting a predicate never replaces another one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    role: Option<Role>,
    action: Option<Action>,
    target: Option<Target>,
}

impl EventFilter {
    /// A filter with no predicates.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// `true` when no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.action.is_none() && self.target.is_none()
    }

    /// Whether `event` satisfies every predicate.
    pub fn matches(&self, event: &UsageEvent) -> bool {
        self.role.as_ref().map_or(true, |r| &event.role == r)
            && self.action.as_ref().map_or(true, |a| &event.action == a)
            && self.target.as_ref().map_or(true, |t| &event.target == t)
    }

    /// The matching events, in their original relative order.
    pub fn apply<'a>(&self, events: &'a [UsageEvent]) -> Vec<&'a UsageEvent> {
        events.iter().filter(|e| self.matches(e)).collect()
    }

    /// Number of matching events, without materialising the subset.
    pub fn count(&self, events: &[UsageEvent]) -> usize {
        events.iter().filter(|e| self.matches(e)).count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(minute: u32, role: &str, action: &str, target: &str) -> UsageEvent {
        UsageEvent {
            application_id: "LP-1".to_string(),
            user_id: 1,
            municipality_id: 91,
            role: Role::from(role),
            action: Action::from(action),
            target: Target::from(target),
            timestamp: NaiveDate::from_ymd_opt(2016, 1, 1)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
        }
    }

    fn sample() -> Vec<UsageEvent> {
        vec![
            event(0, "applicant", "add-comment", "application"),
            event(1, "authority", "add-comment", "application"),
            event(2, "applicant", "update-doc", "document"),
            event(3, "applicant", "add-comment", "document"),
            event(4, "authority", "update-doc", "application"),
        ]
    }

    #[test]
    fn test_empty_filter_returns_all_in_order() {
        let events = sample();
        let filter = EventFilter::new();
        assert!(filter.is_empty());
        let result = filter.apply(&events);
        assert_eq!(result.len(), events.len());
        for (got, expected) in result.iter().zip(events.iter()) {
            assert_eq!(*got, expected);
        }
    }

    #[test]
    fn test_single_predicate() {
        let events = sample();
        assert_eq!(EventFilter::new().role(Role::Applicant).count(&events), 3);
        assert_eq!(EventFilter::new().action(Action::UpdateDoc).count(&events), 2);
        assert_eq!(EventFilter::new().target(Target::Document).count(&events), 2);
    }

    #[test]
    fn test_action_and_target_is_conjunction() {
        let events = sample();
        let filter = EventFilter::new()
            .action(Action::AddComment)
            .target(Target::Application);
        assert_eq!(filter.count(&events), 2);
    }

    #[test]
    fn test_action_role_target_keeps_action_predicate() {
        let events = sample();
        let filter = EventFilter::new()
            .action(Action::AddComment)
            .role(Role::Authority)
            .target(Target::Application);
        let result = filter.apply(&events);
        // The authority update-doc on the application must not slip through.
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].action, Action::AddComment);
    }

    #[test]
    fn test_combined_filter_is_subset_of_each_predicate() {
        let events = sample();
        let by_action = EventFilter::new().action(Action::AddComment).apply(&events);
        let by_role = EventFilter::new().role(Role::Applicant).apply(&events);
        let both = EventFilter::new()
            .action(Action::AddComment)
            .role(Role::Applicant)
            .apply(&events);

        assert!(both.len() < by_action.len());
        assert!(both.len() < by_role.len());
        for e in &both {
            assert!(by_action.contains(e));
            assert!(by_role.contains(e));
        }
    }

    #[test]
    fn test_no_match_counts_zero() {
        let events = sample();
        let filter = EventFilter::new().role(Role::Other("guest".to_string()));
        assert_eq!(filter.count(&events), 0);
        assert!(filter.apply(&events).is_empty());
        assert_eq!(EventFilter::new().count(&[]), 0);
    }

    #[test]
    fn test_apply_preserves_relative_order() {
        let events = sample();
        let result = EventFilter::new().role(Role::Applicant).apply(&events);
        let minutes: Vec<_> = result.iter().map(|e| e.timestamp).collect();
        let mut sorted = minutes.clone();
        sorted.sort();
        assert_eq!(minutes, sorted);
    }
}
