//! Human-readable countdown and due labels.
//!
//! # Invariants
//! - Remaining time is floored to whole minutes; it never rounds up.
//! - Labels are rendered in `now`'s offset on a 24-hour clock.

use crate::agenda::bucket::local_date;
use crate::model::item::{DatedItem, ItemDetail};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};

pub const DUE_NOW_LABEL: &str = "Due now!";
pub const IN_PROGRESS_LABEL: &str = "In Progress";
pub const COMPLETED_LABEL: &str = "Completed";

/// What a countdown counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTarget {
    /// A deadline, e.g. an assignment due date.
    Point(DateTime<Utc>),
    /// A time window, e.g. a study session.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl CountdownTarget {
    pub fn of(item: &DatedItem) -> Self {
        match &item.detail {
            ItemDetail::Assignment(detail) => Self::Point(detail.due),
            ItemDetail::StudySession(detail) => Self::Range {
                start: detail.start,
                end: detail.end,
            },
        }
    }
}

/// Countdown label for `target` as seen at `now`.
pub fn format_countdown(target: CountdownTarget, now: DateTime<FixedOffset>) -> String {
    let now = now.with_timezone(&Utc);
    match target {
        CountdownTarget::Point(due) => {
            let remaining = due.signed_duration_since(now);
            if remaining <= TimeDelta::zero() {
                return DUE_NOW_LABEL.to_string();
            }
            format_remaining(remaining)
        }
        CountdownTarget::Range { start, end } => {
            if now > end {
                return COMPLETED_LABEL.to_string();
            }
            if now >= start {
                return IN_PROGRESS_LABEL.to_string();
            }
            format_remaining(start.signed_duration_since(now))
        }
    }
}

pub fn countdown_label(item: &DatedItem, now: DateTime<FixedOffset>) -> String {
    format_countdown(CountdownTarget::of(item), now)
}

/// Renders a positive duration as `"{d}d {h}h {m}m remaining"`, dropping
/// leading zero units.
pub fn format_remaining(remaining: TimeDelta) -> String {
    let total_minutes = remaining.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m remaining")
    } else if hours > 0 {
        format!("{hours}h {minutes}m remaining")
    } else {
        format!("{minutes}m remaining")
    }
}

/// Short due label: `"Today, 14:30"`, `"Tomorrow, 09:00"` or `"May 7, 23:59"`.
pub fn due_label(instant: DateTime<Utc>, now: DateTime<FixedOffset>) -> String {
    let local = instant.with_timezone(now.offset());
    let days_ahead = (local_date(instant, now) - now.date_naive()).num_days();
    match days_ahead {
        0 => format!("Today, {}", local.format("%H:%M")),
        1 => format!("Tomorrow, {}", local.format("%H:%M")),
        _ => local.format("%b %-d, %H:%M").to_string(),
    }
}
