//! Assignment and study session use-cases.
//!
//! # Responsibility
//! - Build dated items from form input (calendar date plus `HH:MM` times).
//! - Toggle completion, reschedule, patch and delete items.
//!
//! # Invariants
//! - Form input is validated before any store call.
//! - New assignments fall due at 23:59:59 local time on the chosen date.
//! - Study sessions end strictly after they start.

use crate::model::course::CourseId;
use crate::model::item::{
    Collection, DatedItem, ItemId, ItemKind, ItemPatch, ItemValidationError, Priority,
};
use crate::model::user::UserContext;
use crate::repo::store::{ItemListQuery, RecordStore};
use crate::service::course_service::non_blank;
use crate::service::{ServiceError, ServiceResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("valid time-of-day regex"));

/// Assignment form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub title: String,
    pub description: Option<String>,
    pub course_id: CourseId,
    pub due_date: NaiveDate,
    pub priority: Priority,
}

/// Study session form input; times are `"HH:MM"` on `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudySession {
    pub title: String,
    pub description: Option<String>,
    pub course_id: CourseId,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub location: Option<String>,
}

pub struct ItemService<S: RecordStore> {
    store: S,
    ctx: UserContext,
    offset: FixedOffset,
}

impl<S: RecordStore> ItemService<S> {
    /// `offset` is the timezone form dates and times are entered in.
    pub fn new(store: S, ctx: UserContext, offset: FixedOffset) -> Self {
        Self { store, ctx, offset }
    }

    pub fn create_assignment(&self, input: &NewAssignment) -> ServiceResult<DatedItem> {
        check_required(&input.title, input.course_id)?;
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
            .ok_or_else(|| ServiceError::validation("due_date", "invalid end of day"))?;
        let due = self.local_instant("due_date", input.due_date, end_of_day)?;

        let mut item = DatedItem::assignment(input.title.trim(), input.course_id, due)
            .with_priority(input.priority);
        item.description = non_blank(input.description.as_deref());
        item.validate()?;

        self.store.insert_item(&self.ctx, &item)?;
        Ok(item)
    }

    pub fn create_study_session(&self, input: &NewStudySession) -> ServiceResult<DatedItem> {
        check_required(&input.title, input.course_id)?;
        let start_time = parse_time_of_day("start_time", &input.start_time)?;
        let end_time = parse_time_of_day("end_time", &input.end_time)?;
        let start = self.local_instant("start_time", input.date, start_time)?;
        let end = self.local_instant("end_time", input.date, end_time)?;

        let mut item = DatedItem::study_session(input.title.trim(), input.course_id, start, end);
        item.description = non_blank(input.description.as_deref());
        if let Some(location) = non_blank(input.location.as_deref()) {
            item = item.with_location(location);
        }
        item.validate()?;

        self.store.insert_item(&self.ctx, &item)?;
        Ok(item)
    }

    pub fn set_completed(&self, id: ItemId, completed: bool) -> ServiceResult<()> {
        self.update_item(Collection::Assignments, id, &ItemPatch::completed(completed))
    }

    /// Moves an item to `start`.
    ///
    /// Assignments take `start` as the new due date and reject `end`.
    /// Study sessions keep their duration when `end` is `None`.
    pub fn reschedule(
        &self,
        collection: Collection,
        id: ItemId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> ServiceResult<()> {
        let patch = match collection.kind() {
            ItemKind::Assignment => {
                if end.is_some() {
                    return Err(ItemValidationError::UnsupportedField {
                        field: "end",
                        kind: ItemKind::Assignment,
                    }
                    .into());
                }
                ItemPatch {
                    due: Some(start),
                    ..ItemPatch::default()
                }
            }
            ItemKind::StudySession => {
                let end = match end {
                    Some(end) => end,
                    None => {
                        let current = self.get_item(collection, id)?;
                        let duration = current
                            .end()
                            .map(|end| end - current.start())
                            .unwrap_or_else(TimeDelta::zero);
                        start + duration
                    }
                };
                if end <= start {
                    return Err(
                        ItemValidationError::InvalidSessionWindow { start, end }.into()
                    );
                }
                ItemPatch {
                    start: Some(start),
                    end: Some(end),
                    ..ItemPatch::default()
                }
            }
        };
        self.update_item(collection, id, &patch)
    }

    pub fn update_item(
        &self,
        collection: Collection,
        id: ItemId,
        patch: &ItemPatch,
    ) -> ServiceResult<()> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(ItemValidationError::MissingTitle.into());
            }
        }
        if patch.course_id.is_some_and(|course_id| course_id.is_nil()) {
            return Err(ItemValidationError::MissingCourse.into());
        }
        self.store.update_item(&self.ctx, collection, id, patch)?;
        Ok(())
    }

    pub fn delete_item(&self, collection: Collection, id: ItemId) -> ServiceResult<()> {
        self.store.delete_item(&self.ctx, collection, id)?;
        Ok(())
    }

    pub fn get_item(&self, collection: Collection, id: ItemId) -> ServiceResult<DatedItem> {
        self.store
            .get_item(&self.ctx, collection, id)?
            .ok_or(ServiceError::NotFound(id))
    }

    pub fn list_items(&self, query: &ItemListQuery) -> ServiceResult<Vec<DatedItem>> {
        Ok(self.store.list_items(&self.ctx, query)?)
    }

    fn local_instant(
        &self,
        field: &'static str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| ServiceError::validation(field, "date is out of range"))
    }
}

/// Parses `"HH:MM"` (24-hour clock) form input.
pub fn parse_time_of_day(field: &'static str, value: &str) -> ServiceResult<NaiveTime> {
    let invalid = || ItemValidationError::InvalidTimeOfDay {
        field,
        value: value.to_string(),
    };
    let captures = TIME_OF_DAY_RE.captures(value.trim()).ok_or_else(invalid)?;
    let hour = captures[1].parse::<u32>().map_err(|_| invalid())?;
    let minute = captures[2].parse::<u32>().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| invalid().into())
}

fn check_required(title: &str, course_id: CourseId) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ItemValidationError::MissingTitle.into());
    }
    if course_id.is_nil() {
        return Err(ItemValidationError::MissingCourse.into());
    }
    Ok(())
}
