//! In-memory implementation of `RecordStore`.
//!
//! # Responsibility
//! - Mirror the SQLite store semantics without a database file.
//! - Allow tests to inject transient read/write failures.
//!
//! # Invariants
//! - Records are partitioned by owner; one owner never sees another's data.
//! - Stored items never carry embedded course info; it is resolved on read.
//! - Text fields are trimmed on write, as the SQLite store does.
//! - Lists sort stably, so ties keep insertion order.

use crate::model::course::{Course, CourseId};
use crate::model::item::{Collection, DatedItem, ItemId, ItemPatch};
use crate::model::meeting::{ClassMeeting, MeetingId};
use crate::model::user::{OwnerId, UserContext};
use crate::repo::store::{ItemListQuery, RecordStore, RepoError, RepoResult, SortOrder};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct OwnerRecords {
    courses: Vec<Course>,
    assignments: Vec<DatedItem>,
    study_sessions: Vec<DatedItem>,
    meetings: Vec<ClassMeeting>,
}

impl OwnerRecords {
    fn items(&self, collection: Collection) -> &Vec<DatedItem> {
        match collection {
            Collection::Assignments => &self.assignments,
            Collection::StudySessions => &self.study_sessions,
        }
    }

    fn items_mut(&mut self, collection: Collection) -> &mut Vec<DatedItem> {
        match collection {
            Collection::Assignments => &mut self.assignments,
            Collection::StudySessions => &mut self.study_sessions,
        }
    }

    fn has_course(&self, id: CourseId) -> bool {
        self.courses.iter().any(|course| course.id == id)
    }

    fn resolve(&self, item: &DatedItem) -> DatedItem {
        let mut resolved = item.clone();
        resolved.course = self
            .courses
            .iter()
            .find(|course| course.id == item.course_id)
            .map(Course::info);
        resolved
    }
}

fn stored_course(course: &Course) -> Course {
    Course {
        code: course.code.trim().to_string(),
        name: course.name.trim().to_string(),
        instructor: course.instructor.trim().to_string(),
        schedule: course.schedule.trim().to_string(),
        ..course.clone()
    }
}

fn stored_item(item: &DatedItem) -> DatedItem {
    DatedItem {
        title: item.title.trim().to_string(),
        course: None,
        ..item.clone()
    }
}

/// Thread-safe in-memory record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    owners: RwLock<HashMap<OwnerId, OwnerRecords>>,
    failing_reads: AtomicUsize,
    failing_writes: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` read calls fail with `RepoError::Unavailable`.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` write calls fail with `RepoError::Unavailable`.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, HashMap<OwnerId, OwnerRecords>>> {
        if take_failure(&self.failing_reads) {
            return Err(RepoError::Unavailable("injected read failure".to_string()));
        }
        self.owners
            .read()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, HashMap<OwnerId, OwnerRecords>>> {
        if take_failure(&self.failing_writes) {
            return Err(RepoError::Unavailable("injected write failure".to_string()));
        }
        self.owners
            .write()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
            remaining.checked_sub(1)
        })
        .is_ok()
}

impl RecordStore for MemoryRecordStore {
    fn list_courses(&self, ctx: &UserContext) -> RepoResult<Vec<Course>> {
        let owners = self.read()?;
        let mut courses = owners
            .get(&ctx.owner_id())
            .map(|records| records.courses.clone())
            .unwrap_or_default();
        courses.sort_by(|left, right| left.code.cmp(&right.code));

        debug!(
            "event=store_list module=repo status=ok backend=memory collection=courses count={}",
            courses.len()
        );
        Ok(courses)
    }

    fn get_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<Option<Course>> {
        let owners = self.read()?;
        Ok(owners
            .get(&ctx.owner_id())
            .and_then(|records| records.courses.iter().find(|course| course.id == id))
            .cloned())
    }

    fn insert_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<CourseId> {
        course.validate()?;
        let mut owners = self.write()?;
        let records = owners.entry(ctx.owner_id()).or_default();
        if records.has_course(course.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate course id {}",
                course.id
            )));
        }
        records.courses.push(stored_course(course));
        Ok(course.id)
    }

    fn update_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<()> {
        course.validate()?;
        let mut owners = self.write()?;
        let slot = owners
            .get_mut(&ctx.owner_id())
            .and_then(|records| records.courses.iter_mut().find(|c| c.id == course.id))
            .ok_or(RepoError::NotFound(course.id))?;
        *slot = stored_course(course);
        Ok(())
    }

    fn delete_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<()> {
        let mut owners = self.write()?;
        let records = owners
            .get_mut(&ctx.owner_id())
            .filter(|records| records.has_course(id))
            .ok_or(RepoError::NotFound(id))?;
        records.courses.retain(|course| course.id != id);
        records.meetings.retain(|meeting| meeting.course_id != id);
        Ok(())
    }

    fn list_items(&self, ctx: &UserContext, query: &ItemListQuery) -> RepoResult<Vec<DatedItem>> {
        let owners = self.read()?;
        let mut items: Vec<DatedItem> = match owners.get(&ctx.owner_id()) {
            Some(records) => records
                .items(query.collection)
                .iter()
                .filter(|item| query.course_id.map_or(true, |id| item.course_id == id))
                .map(|item| records.resolve(item))
                .collect(),
            None => Vec::new(),
        };
        match query.order {
            SortOrder::Ascending => items.sort_by_key(DatedItem::start),
            SortOrder::Descending => items.sort_by(|left, right| right.start().cmp(&left.start())),
        }

        debug!(
            "event=store_list module=repo status=ok backend=memory collection={} count={}",
            query.collection.as_str(),
            items.len()
        );
        Ok(items)
    }

    fn get_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
    ) -> RepoResult<Option<DatedItem>> {
        let owners = self.read()?;
        Ok(owners.get(&ctx.owner_id()).and_then(|records| {
            records
                .items(collection)
                .iter()
                .find(|item| item.id == id)
                .map(|item| records.resolve(item))
        }))
    }

    fn insert_item(&self, ctx: &UserContext, item: &DatedItem) -> RepoResult<ItemId> {
        item.validate()?;
        let mut owners = self.write()?;
        let records = owners.entry(ctx.owner_id()).or_default();
        if !records.has_course(item.course_id) {
            return Err(RepoError::UnknownCourse(item.course_id));
        }
        let items = records.items_mut(item.collection());
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(RepoError::InvalidData(format!("duplicate item id {}", item.id)));
        }
        items.push(stored_item(item));
        Ok(item.id)
    }

    fn update_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
        patch: &ItemPatch,
    ) -> RepoResult<()> {
        let mut owners = self.write()?;
        let records = owners
            .get_mut(&ctx.owner_id())
            .ok_or(RepoError::NotFound(id))?;
        let current = records
            .items(collection)
            .iter()
            .find(|item| item.id == id)
            .ok_or(RepoError::NotFound(id))?;

        let mut next = current.clone();
        patch.apply_to(&mut next)?;
        if next.course_id != current.course_id && !records.has_course(next.course_id) {
            return Err(RepoError::UnknownCourse(next.course_id));
        }

        if let Some(slot) = records
            .items_mut(collection)
            .iter_mut()
            .find(|item| item.id == id)
        {
            *slot = stored_item(&next);
        }
        Ok(())
    }

    fn delete_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
    ) -> RepoResult<()> {
        let mut owners = self.write()?;
        let items = owners
            .get_mut(&ctx.owner_id())
            .map(|records| records.items_mut(collection))
            .ok_or(RepoError::NotFound(id))?;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_meetings(&self, ctx: &UserContext) -> RepoResult<Vec<ClassMeeting>> {
        let owners = self.read()?;
        let mut meetings = owners
            .get(&ctx.owner_id())
            .map(|records| records.meetings.clone())
            .unwrap_or_default();
        meetings.sort_by_key(|meeting| (meeting.weekday.num_days_from_monday(), meeting.start));
        Ok(meetings)
    }

    fn insert_meeting(&self, ctx: &UserContext, meeting: &ClassMeeting) -> RepoResult<MeetingId> {
        meeting.validate()?;
        let mut owners = self.write()?;
        let records = owners.entry(ctx.owner_id()).or_default();
        if !records.has_course(meeting.course_id) {
            return Err(RepoError::UnknownCourse(meeting.course_id));
        }
        records.meetings.push(meeting.clone());
        Ok(meeting.id)
    }

    fn delete_meeting(&self, ctx: &UserContext, id: MeetingId) -> RepoResult<()> {
        let mut owners = self.write()?;
        let meetings = owners
            .get_mut(&ctx.owner_id())
            .map(|records| &mut records.meetings)
            .ok_or(RepoError::NotFound(id))?;
        let before = meetings.len();
        meetings.retain(|meeting| meeting.id != id);
        if meetings.len() == before {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn ctx() -> UserContext {
        UserContext::new(Uuid::new_v4())
    }

    #[test]
    fn injected_read_failure_is_consumed_once() {
        let store = MemoryRecordStore::new();
        let ctx = ctx();
        store.fail_next_reads(1);
        assert!(matches!(
            store.list_courses(&ctx),
            Err(RepoError::Unavailable(_))
        ));
        assert!(store.list_courses(&ctx).unwrap().is_empty());
    }

    #[test]
    fn items_resolve_course_info_on_read() {
        let store = MemoryRecordStore::new();
        let ctx = ctx();
        let course = Course::new("CS 101", "Intro to CS", "Dr. Smith", "Mon 9:00");
        store.insert_course(&ctx, &course).unwrap();
        let due = Utc.with_ymd_and_hms(2025, 5, 7, 23, 59, 59).unwrap();
        let item = DatedItem::assignment("Problem Set", course.id, due);
        store.insert_item(&ctx, &item).unwrap();

        let listed = store
            .list_items(&ctx, &ItemListQuery::new(Collection::Assignments))
            .unwrap();
        assert_eq!(listed[0].course_code(), Some("CS 101"));

        store.delete_course(&ctx, course.id).unwrap();
        let listed = store
            .list_items(&ctx, &ItemListQuery::new(Collection::Assignments))
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].course.is_none());
    }
}
