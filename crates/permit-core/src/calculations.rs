use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::time_utils::{floor_days, normalize};

// ── Rounding ──────────────────────────────────────────────────────────────────

/// Round to the nearest integer, ties to even.
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

/// Round to `decimals` places based on the exact binary value of `value`.
///
/// `0.025` is stored slightly above the tie and so rounds to `0.03`. Scaling
/// first would turn it into an exact `2.5` and round it down.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value)
        .parse()
        .unwrap_or(value)
}

// ── Lead time ─────────────────────────────────────────────────────────────────

/// Inclusive day count between two milestones.
///
/// The whole-day part of `till - from` (floored) plus one, so two
/// milestones on the same day yield 1. Returns `None` when either
/// milestone is missing.
pub fn lead_time_days(from: Option<NaiveDateTime>, till: Option<NaiveDateTime>) -> Option<i64> {
    let (from, till) = (from?, till?);
    Some(floor_days(till - from) + 1)
}

// ── Flow efficiency ───────────────────────────────────────────────────────────

/// Share of lead-time days on which at least one event occurred, as an
/// integer percentage.
///
/// Event timestamps and both milestones are normalised to calendar dates;
/// distinct event dates inside `[from, till]` are divided by the lead time.
/// The ratio is rounded to two decimals before being scaled to a percentage
/// and truncated, so 0.29 reports 28 as the historical figures do.
///
/// Returns `None` when either milestone is missing or the lead time is not
/// positive. The result never exceeds 100.
pub fn flow_efficiency<I>(
    from: Option<NaiveDateTime>,
    till: Option<NaiveDateTime>,
    event_times: I,
) -> Option<i64>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let days = lead_time_days(from, till)?;
    if days <= 0 {
        return None;
    }
    let (start, end) = (normalize(from?), normalize(till?));

    let active_dates: BTreeSet<NaiveDate> = event_times
        .into_iter()
        .map(normalize)
        .filter(|d| *d >= start && *d <= end)
        .collect();

    let ratio = round_to(active_dates.len() as f64 / days as f64, 2);
    Some(((ratio * 100.0) as i64).min(100))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
