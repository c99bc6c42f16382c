//! Inactivity-gap session segmentation.
//!
//! Splits a chronologically sorted run of event timestamps into sessions and
//! estimates the time a user (or group of users) spent actively working.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::trace;

use crate::calculations::round_half_even;
use crate::filter::EventFilter;
use crate::models::{Role, UsageEvent};

/// Default inactivity threshold in minutes.
pub const DEFAULT_SESSION_THRESHOLD_MINUTES: i64 = 15;

// ── Session ───────────────────────────────────────────────────────────────────

/// A contiguous run of events whose consecutive gaps stay below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Timestamp of the first event.
    pub start: NaiveDateTime,
    /// Timestamp of the last event.
    pub end: NaiveDateTime,
    /// Number of events in the session (at least 1).
    pub event_count: usize,
}

impl Session {
    fn open(at: NaiveDateTime) -> Self {
        Self {
            start: at,
            end: at,
            event_count: 1,
        }
    }

    /// Active time covered by the session.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

// ── SessionSegmenter ──────────────────────────────────────────────────────────

/// Groups sorted timestamps into sessions separated by inactivity gaps.
#[derive(Debug, Clone, Copy)]
pub struct SessionSegmenter {
    threshold: TimeDelta,
}

impl Default for SessionSegmenter {
    fn default() -> Self {
        Self::new(TimeDelta::minutes(DEFAULT_SESSION_THRESHOLD_MINUTES))
    }
}

impl SessionSegmenter {
    /// Create a segmenter that breaks sessions at gaps of `threshold` or more.
    pub fn new(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    /// Split `timestamps` into sessions.
    ///
    /// The input must be sorted ascending; the output for unsorted input is
    /// unspecified. A gap strictly below the threshold extends the current
    /// session, anything at or above it opens a new one.
    pub fn sessions<I>(&self, timestamps: I) -> Vec<Session>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut sessions: Vec<Session> = Vec::new();
        let mut current: Option<Session> = None;

        for ts in timestamps {
            if let Some(session) = current.as_mut() {
                if ts - session.end < self.threshold {
                    session.end = ts;
                    session.event_count += 1;
                    continue;
                }
            }
            if let Some(done) = current.replace(Session::open(ts)) {
                sessions.push(done);
            }
        }

        if let Some(done) = current {
            sessions.push(done);
        }
        sessions
    }

    /// Total active time in minutes, rounded to the nearest minute (ties to
    /// even).
    ///
    /// Sums every inter-event gap below the threshold, which equals the sum
    /// of the session spans. Fewer than two timestamps yield 0.
    pub fn active_minutes<I>(&self, timestamps: I) -> i64
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let sessions = self.sessions(timestamps);
        let total_ms: i64 = sessions
            .iter()
            .map(|s| s.duration().num_milliseconds())
            .sum();

        trace!(
            "SessionSegmenter: {} events in {} sessions, {} ms active",
            sessions.iter().map(|s| s.event_count).sum::<usize>(),
            sessions.len(),
            total_ms
        );

        let seconds = total_ms as f64 / 1000.0;
        round_half_even(seconds / 60.0) as i64
    }

    /// Active minutes of the events passing `filter`.
    pub fn active_minutes_filtered(&self, events: &[UsageEvent], filter: &EventFilter) -> i64 {
        self.active_minutes(filter.apply(events).into_iter().map(|e| e.timestamp))
    }

    /// Active minutes of the events logged in `role`.
    pub fn active_minutes_for_role(&self, events: &[UsageEvent], role: Role) -> i64 {
        self.active_minutes_filtered(events, &EventFilter::new().role(role))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
