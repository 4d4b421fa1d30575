//! Per-date grouping for the study calendar.

use crate::agenda::bucket::local_date;
use crate::model::item::DatedItem;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::BTreeMap;

/// Items whose `start` falls on `date` in `now`'s offset, ordered by start.
pub fn items_on_date<'a, I>(
    items: I,
    date: NaiveDate,
    now: DateTime<FixedOffset>,
) -> Vec<&'a DatedItem>
where
    I: IntoIterator<Item = &'a DatedItem>,
{
    let mut on_date: Vec<&DatedItem> = items
        .into_iter()
        .filter(|item| local_date(item.start(), now) == date)
        .collect();
    on_date.sort_by_key(|item| item.start());
    on_date
}

/// Item count per local calendar date; dates without items are absent.
pub fn count_by_date<'a, I>(items: I, now: DateTime<FixedOffset>) -> BTreeMap<NaiveDate, usize>
where
    I: IntoIterator<Item = &'a DatedItem>,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(local_date(item.start(), now)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn groups_by_local_date() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2025, 5, 7, 8, 0, 0).unwrap();
        let course = Uuid::new_v4();
        // 2025-05-07 16:00 UTC is 2025-05-08 01:00 at UTC+09:00.
        let late = Utc.with_ymd_and_hms(2025, 5, 7, 16, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 5, 7, 1, 0, 0).unwrap();
        let items = vec![
            DatedItem::study_session("Late", course, late, late + chrono::Duration::hours(1)),
            DatedItem::assignment("Early", course, early),
        ];

        let may_8 = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let on_8th = items_on_date(&items, may_8, now);
        assert_eq!(on_8th.len(), 1);
        assert_eq!(on_8th[0].title, "Late");

        let counts = count_by_date(&items, now);
        assert_eq!(counts.get(&may_8), Some(&1));
        assert_eq!(counts.get(&NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()), Some(&1));
    }
}
