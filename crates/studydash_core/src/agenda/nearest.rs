//! Nearest pending item selection.
//!
//! # Invariants
//! - Completed items are never selected.
//! - Ties on `start` resolve to the earliest item in input order.

use crate::model::item::DatedItem;
use chrono::{DateTime, FixedOffset, Utc};

/// Not-completed item with the smallest `start >= now`.
pub fn nearest_pending<'a, I>(items: I, now: DateTime<FixedOffset>) -> Option<&'a DatedItem>
where
    I: IntoIterator<Item = &'a DatedItem>,
{
    let now = now.with_timezone(&Utc);
    items
        .into_iter()
        .filter(|item| !item.completed() && item.start() >= now)
        .fold(None, |best: Option<&DatedItem>, item| match best {
            Some(current) if current.start() <= item.start() => Some(current),
            _ => Some(item),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 7, 10, 0, 0)
            .unwrap()
    }

    fn due_in(title: &str, minutes: i64) -> DatedItem {
        DatedItem::assignment(
            title,
            Uuid::new_v4(),
            (now() + Duration::minutes(minutes)).with_timezone(&Utc),
        )
    }

    #[test]
    fn empty_or_all_completed_yields_none() {
        let empty: Vec<DatedItem> = Vec::new();
        assert!(nearest_pending(&empty, now()).is_none());

        let mut done = due_in("done", 30);
        if let Some(detail) = done.as_assignment_mut() {
            detail.completed = true;
        }
        let past = due_in("past", -30);
        assert!(nearest_pending(&[done, past], now()).is_none());
    }

    #[test]
    fn picks_soonest_future_item() {
        let items = vec![due_in("later", 120), due_in("soon", 15), due_in("late", -1)];
        let picked = nearest_pending(&items, now()).unwrap();
        assert_eq!(picked.title, "soon");
    }

    #[test]
    fn ties_resolve_to_input_order() {
        let due = (now() + Duration::minutes(60)).with_timezone(&Utc);
        let course = Uuid::new_v4();
        let items = vec![
            DatedItem::assignment("first", course, due),
            DatedItem::assignment("second", course, due),
        ];
        assert_eq!(nearest_pending(&items, now()).unwrap().title, "first");
    }

    #[test]
    fn item_due_exactly_now_is_pending() {
        let items = vec![due_in("now", 0)];
        assert!(nearest_pending(&items, now()).is_some());
    }
}
