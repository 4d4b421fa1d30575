//! Temporal bucket classification.
//!
//! # Invariants
//! - Every item lands in exactly one bucket for a given `now`.
//! - Calendar comparisons use `now`'s offset, never the host timezone.
//! - `Tomorrow` is decided by calendar date, not by a 24h window.

use crate::model::item::{DatedItem, ItemDetail};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Temporal category of a dated item relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Today,
    Tomorrow,
    ThisWeek,
    Upcoming,
    Past,
    Overdue,
    Completed,
}

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Self::Today,
        Self::Tomorrow,
        Self::ThisWeek,
        Self::Upcoming,
        Self::Past,
        Self::Overdue,
        Self::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::ThisWeek => "this_week",
            Self::Upcoming => "upcoming",
            Self::Past => "past",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == normalized)
    }

    /// Buckets listed most-recent-first.
    pub fn sorts_descending(self) -> bool {
        matches!(self, Self::Past | Self::Completed)
    }
}

/// Classifies one item. First matching rule wins.
pub fn classify(item: &DatedItem, now: DateTime<FixedOffset>, week_start: Weekday) -> Bucket {
    let now_utc = now.with_timezone(&Utc);
    match &item.detail {
        ItemDetail::Assignment(detail) => {
            if detail.completed {
                return Bucket::Completed;
            }
            if detail.due < now_utc {
                return Bucket::Overdue;
            }
        }
        ItemDetail::StudySession(detail) => {
            if detail.end < now_utc {
                return Bucket::Past;
            }
            if detail.start <= now_utc {
                return Bucket::Today;
            }
        }
    }

    classify_future_date(local_date(item.start(), now), now.date_naive(), week_start)
}

fn classify_future_date(date: NaiveDate, today: NaiveDate, week_start: Weekday) -> Bucket {
    let days_ahead = (date - today).num_days();
    if days_ahead == 0 {
        return Bucket::Today;
    }
    if days_ahead == 1 {
        return Bucket::Tomorrow;
    }

    let days_into_week = i64::from(days_since_week_start(today.weekday(), week_start));
    if days_ahead >= -days_into_week && days_ahead <= 6 - days_into_week {
        return Bucket::ThisWeek;
    }
    Bucket::Upcoming
}

/// Calendar date of `instant` in `now`'s offset.
pub(crate) fn local_date(instant: DateTime<Utc>, now: DateTime<FixedOffset>) -> NaiveDate {
    instant.with_timezone(now.offset()).date_naive()
}

/// Zero-based position of `day` within a week starting at `week_start`.
pub fn days_since_week_start(day: Weekday, week_start: Weekday) -> u32 {
    (day.num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    // Wednesday 2025-05-07 10:00 UTC.
    fn now() -> DateTime<FixedOffset> {
        utc_offset().with_ymd_and_hms(2025, 5, 7, 10, 0, 0).unwrap()
    }

    fn assignment_due(due: DateTime<FixedOffset>) -> DatedItem {
        DatedItem::assignment("Problem Set", Uuid::new_v4(), due.with_timezone(&Utc))
    }

    fn session(start: DateTime<FixedOffset>, minutes: i64) -> DatedItem {
        DatedItem::study_session(
            "Review",
            Uuid::new_v4(),
            start.with_timezone(&Utc),
            (start + Duration::minutes(minutes)).with_timezone(&Utc),
        )
    }

    #[test]
    fn every_bucket_is_reachable_and_exclusive() {
        let mut done = assignment_due(now() + Duration::days(3));
        if let Some(detail) = done.as_assignment_mut() {
            detail.completed = true;
        }
        let items = vec![
            assignment_due(now() + Duration::hours(2)),
            assignment_due(now() + Duration::hours(25)),
            assignment_due(now() + Duration::days(3)),
            assignment_due(now() + Duration::days(20)),
            session(now() - Duration::hours(3), 60),
            assignment_due(now() - Duration::minutes(1)),
            done,
        ];

        let buckets: Vec<Bucket> = items
            .iter()
            .map(|item| classify(item, now(), Weekday::Sun))
            .collect();
        assert_eq!(buckets, Bucket::ALL.to_vec());
    }

    #[test]
    fn one_minute_ago_is_overdue_or_past() {
        let due = now() - Duration::minutes(1);
        assert_eq!(
            classify(&assignment_due(due), now(), Weekday::Sun),
            Bucket::Overdue
        );
        let ended = session(now() - Duration::minutes(61), 60);
        assert_eq!(classify(&ended, now(), Weekday::Sun), Bucket::Past);
    }

    #[test]
    fn completed_wins_over_overdue() {
        let mut item = assignment_due(now() - Duration::days(2));
        if let Some(detail) = item.as_assignment_mut() {
            detail.completed = true;
        }
        assert_eq!(classify(&item, now(), Weekday::Sun), Bucket::Completed);
    }

    #[test]
    fn tomorrow_is_decided_by_calendar_date() {
        let item = assignment_due(now() + Duration::hours(25));
        assert_eq!(classify(&item, now(), Weekday::Sun), Bucket::Tomorrow);

        // 23:30 tonight is less than a day away but still today.
        let late = utc_offset().with_ymd_and_hms(2025, 5, 7, 23, 30, 0).unwrap();
        assert_eq!(
            classify(&assignment_due(late), now(), Weekday::Sun),
            Bucket::Today
        );
    }

    #[test]
    fn session_in_progress_is_today() {
        let running = session(now() - Duration::minutes(30), 60);
        assert_eq!(classify(&running, now(), Weekday::Sun), Bucket::Today);
    }

    #[test]
    fn this_week_respects_week_start() {
        // Saturday 2025-05-10 is inside the Sunday-started week of Wed 05-07.
        let saturday = utc_offset().with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap();
        assert_eq!(
            classify(&assignment_due(saturday), now(), Weekday::Sun),
            Bucket::ThisWeek
        );

        // Sunday 2025-05-11 starts the next week when weeks start on Sunday,
        // but is the last day of the current week when they start on Monday.
        let sunday = utc_offset().with_ymd_and_hms(2025, 5, 11, 9, 0, 0).unwrap();
        assert_eq!(
            classify(&assignment_due(sunday), now(), Weekday::Sun),
            Bucket::Upcoming
        );
        assert_eq!(
            classify(&assignment_due(sunday), now(), Weekday::Mon),
            Bucket::ThisWeek
        );
    }

    #[test]
    fn dates_follow_now_offset() {
        // 2025-05-08 02:00 UTC is still May 7 at UTC-05:00.
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let now_local = eastern.with_ymd_and_hms(2025, 5, 7, 18, 0, 0).unwrap();
        let due = Utc.with_ymd_and_hms(2025, 5, 8, 2, 0, 0).unwrap();
        let item = DatedItem::assignment("Essay", Uuid::new_v4(), due);
        assert_eq!(classify(&item, now_local, Weekday::Sun), Bucket::Today);
    }

    #[test]
    fn parse_accepts_display_variants() {
        assert_eq!(Bucket::parse("This Week"), Some(Bucket::ThisWeek));
        assert_eq!(Bucket::parse("this-week"), Some(Bucket::ThisWeek));
        assert_eq!(Bucket::parse("later"), None);
    }
}
