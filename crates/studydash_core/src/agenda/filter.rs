//! Filter pipeline producing ordered dashboard views.
//!
//! # Responsibility
//! - Compose bucket selection, text search, course/priority filters,
//!   ordering and truncation into one view.
//!
//! # Invariants
//! - Stage order is fixed: bucket, search, exact filters, sort, limit.
//! - The pipeline is pure; re-filtering its output with the same config
//!   yields the same list.
//! - Sorting is stable, so equal `start` values keep input order.

use crate::agenda::bucket::{classify, Bucket};
use crate::agenda::countdown::due_label;
use crate::model::course::CourseId;
use crate::model::item::{DatedItem, Priority};
use chrono::{DateTime, FixedOffset, Weekday};
use serde::Serialize;

/// User-selected view options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// `None` shows every bucket.
    pub bucket: Option<Bucket>,
    pub search_term: String,
    pub course_id: Option<CourseId>,
    pub priority: Option<Priority>,
    pub limit: Option<usize>,
}

impl FilterConfig {
    pub fn bucket(bucket: Bucket) -> Self {
        Self {
            bucket: Some(bucket),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_course(mut self, course_id: CourseId) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One display row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub item: DatedItem,
    pub bucket: Bucket,
    pub due_label: String,
}

/// Runs the pipeline over `items`, keeping their relative order on ties.
pub fn filter_items<'a, I>(
    items: I,
    config: &FilterConfig,
    now: DateTime<FixedOffset>,
    week_start: Weekday,
) -> Vec<ItemView>
where
    I: IntoIterator<Item = &'a DatedItem>,
{
    let needle = config.search_term.trim().to_lowercase();

    let mut views: Vec<ItemView> = items
        .into_iter()
        .map(|item| (item, classify(item, now, week_start)))
        .filter(|(_, bucket)| config.bucket.map_or(true, |wanted| wanted == *bucket))
        .filter(|(item, _)| matches_search(item, &needle))
        .filter(|(item, _)| config.course_id.map_or(true, |id| item.course_id == id))
        .filter(|(item, _)| {
            config
                .priority
                .map_or(true, |wanted| item.priority() == Some(wanted))
        })
        .map(|(item, bucket)| ItemView {
            item: item.clone(),
            bucket,
            due_label: due_label(item.start(), now),
        })
        .collect();

    if config.bucket.is_some_and(Bucket::sorts_descending) {
        views.sort_by(|left, right| right.item.start().cmp(&left.item.start()));
    } else {
        views.sort_by_key(|view| view.item.start());
    }

    if let Some(limit) = config.limit {
        views.truncate(limit);
    }
    views
}

/// Case-insensitive substring match over title, description and course
/// code/name. `needle` must already be trimmed and lowercased.
fn matches_search(item: &DatedItem, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        Some(item.title.as_str()),
        item.description.as_deref(),
        item.course_code(),
        item.course_name(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::course::{CourseColor, CourseInfo};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 7, 10, 0, 0)
            .unwrap()
    }

    fn cs101() -> CourseInfo {
        CourseInfo {
            code: "CS 101".to_string(),
            name: "Intro to Computer Science".to_string(),
            color: CourseColor::Blue,
        }
    }

    fn due_in(title: &str, hours: i64) -> DatedItem {
        DatedItem::assignment(
            title,
            Uuid::new_v4(),
            (now() + Duration::hours(hours)).with_timezone(&Utc),
        )
    }

    #[test]
    fn search_matches_course_code_case_insensitively() {
        let tagged = due_in("Problem Set 3", 2).with_course_info(cs101());
        let other = due_in("Essay draft", 3);
        let items = vec![tagged.clone(), other];

        let views = filter_items(
            &items,
            &FilterConfig::default().with_search("  cs "),
            now(),
            Weekday::Sun,
        );
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].item.id, tagged.id);
    }

    #[test]
    fn blank_search_matches_everything() {
        let items = vec![due_in("A", 2), due_in("B", 30)];
        let views = filter_items(
            &items,
            &FilterConfig::default().with_search("   "),
            now(),
            Weekday::Sun,
        );
        assert_eq!(views.len(), 2);
    }

    #[test]
    fn priority_filter_excludes_sessions() {
        let start = (now() + Duration::hours(1)).with_timezone(&Utc);
        let session =
            DatedItem::study_session("Review", Uuid::new_v4(), start, start + Duration::hours(1));
        let urgent = due_in("Lab report", 5).with_priority(Priority::High);
        let items = vec![session, urgent.clone()];

        let views = filter_items(
            &items,
            &FilterConfig::default().with_priority(Priority::High),
            now(),
            Weekday::Sun,
        );
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].item.id, urgent.id);
    }

    #[test]
    fn overdue_bucket_sorts_ascending_and_completed_descending() {
        let older = due_in("older", -48);
        let newer = due_in("newer", -2);
        let items = vec![newer.clone(), older.clone()];

        let overdue = filter_items(
            &items,
            &FilterConfig::bucket(Bucket::Overdue),
            now(),
            Weekday::Sun,
        );
        let ids: Vec<_> = overdue.iter().map(|view| view.item.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);

        let completed: Vec<DatedItem> = items
            .iter()
            .cloned()
            .map(|mut item| {
                if let Some(detail) = item.as_assignment_mut() {
                    detail.completed = true;
                }
                item
            })
            .collect();
        let views = filter_items(
            &completed,
            &FilterConfig::bucket(Bucket::Completed),
            now(),
            Weekday::Sun,
        );
        let ids: Vec<_> = views.iter().map(|view| view.item.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn ties_keep_input_order_and_limit_truncates() {
        let due = (now() + Duration::hours(4)).with_timezone(&Utc);
        let course = Uuid::new_v4();
        let first = DatedItem::assignment("first", course, due);
        let second = DatedItem::assignment("second", course, due);
        let third = due_in("third", 1);
        let items = vec![first.clone(), second.clone(), third.clone()];

        let views = filter_items(&items, &FilterConfig::default(), now(), Weekday::Sun);
        let ids: Vec<_> = views.iter().map(|view| view.item.id).collect();
        assert_eq!(ids, vec![third.id, first.id, second.id]);

        let limited = filter_items(
            &items,
            &FilterConfig::default().with_limit(2),
            now(),
            Weekday::Sun,
        );
        let ids: Vec<_> = limited.iter().map(|view| view.item.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[test]
    fn refiltering_output_is_idempotent() {
        let items = vec![
            due_in("CS homework", 30).with_course_info(cs101()),
            due_in("CS quiz", 2).with_course_info(cs101()),
            due_in("History essay", 50),
            due_in("CS project", -5).with_course_info(cs101()),
        ];
        let config = FilterConfig::default().with_search("cs").with_limit(2);

        let once = filter_items(&items, &config, now(), Weekday::Sun);
        let again_items: Vec<DatedItem> = once.iter().map(|view| view.item.clone()).collect();
        let twice = filter_items(&again_items, &config, now(), Weekday::Sun);
        assert_eq!(once, twice);
    }

    #[test]
    fn views_carry_due_labels() {
        let items = vec![due_in("Essay", 4)];
        let views = filter_items(&items, &FilterConfig::default(), now(), Weekday::Sun);
        assert_eq!(views[0].due_label, "Today, 14:00");
        assert_eq!(views[0].bucket, Bucket::Today);
    }
}
