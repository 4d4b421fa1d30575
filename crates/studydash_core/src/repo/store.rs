//! Record store contract shared by every backend.
//!
//! # Responsibility
//! - Define owner-scoped CRUD over courses, dated items and class meetings.
//! - Define the semantic error surface (`NotFound`, validation, transport).
//!
//! # Invariants
//! - Every call is scoped by a `UserContext`; no call reads across owners.
//! - Write paths validate records before any mutation.
//! - Item inserts require the referenced course to exist for the owner.
//! - Item reads embed `CourseInfo` when the course exists and tolerate
//!   dangling references (`course = None`).
//! - List ordering is stable: ties on `start` keep insertion order.

use crate::db::DbError;
use crate::model::course::{Course, CourseId, CourseValidationError};
use crate::model::item::{
    Collection, DatedItem, ItemId, ItemPatch, ItemValidationError,
};
use crate::model::meeting::{ClassMeeting, MeetingId, MeetingValidationError};
use crate::model::user::UserContext;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    InvalidItem(ItemValidationError),
    InvalidCourse(CourseValidationError),
    InvalidMeeting(MeetingValidationError),
    /// Referenced course does not exist for the owner.
    UnknownCourse(CourseId),
    /// Target record does not exist for the owner.
    NotFound(Uuid),
    Db(DbError),
    InvalidData(String),
    /// Backend could not serve the request (transport or availability).
    Unavailable(String),
}

impl RepoError {
    /// Form field for validation failures; `None` for other errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidItem(err) => Some(err.field()),
            Self::InvalidCourse(err) => Some(err.field()),
            Self::InvalidMeeting(err) => Some(err.field()),
            Self::UnknownCourse(_) => Some("course_id"),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidItem(err) => write!(f, "{err}"),
            Self::InvalidCourse(err) => write!(f, "{err}"),
            Self::InvalidMeeting(err) => write!(f, "{err}"),
            Self::UnknownCourse(id) => write!(f, "course not found: {id}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidItem(err) => Some(err),
            Self::InvalidCourse(err) => Some(err),
            Self::InvalidMeeting(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::InvalidItem(value)
    }
}

impl From<CourseValidationError> for RepoError {
    fn from(value: CourseValidationError) -> Self {
        Self::InvalidCourse(value)
    }
}

impl From<MeetingValidationError> for RepoError {
    fn from(value: MeetingValidationError) -> Self {
        Self::InvalidMeeting(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Ordering hint for item lists, keyed on `DatedItem::start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Query options for listing items of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListQuery {
    pub collection: Collection,
    pub course_id: Option<CourseId>,
    pub order: SortOrder,
}

impl ItemListQuery {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            course_id: None,
            order: SortOrder::Ascending,
        }
    }

    pub fn for_course(mut self, course_id: CourseId) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Owner-scoped record store.
pub trait RecordStore {
    fn list_courses(&self, ctx: &UserContext) -> RepoResult<Vec<Course>>;
    fn get_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<Option<Course>>;
    fn insert_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<CourseId>;
    fn update_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<()>;
    fn delete_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<()>;

    fn list_items(&self, ctx: &UserContext, query: &ItemListQuery) -> RepoResult<Vec<DatedItem>>;
    fn get_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
    ) -> RepoResult<Option<DatedItem>>;
    fn insert_item(&self, ctx: &UserContext, item: &DatedItem) -> RepoResult<ItemId>;
    fn update_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
        patch: &ItemPatch,
    ) -> RepoResult<()>;
    fn delete_item(&self, ctx: &UserContext, collection: Collection, id: ItemId)
        -> RepoResult<()>;

    fn list_meetings(&self, ctx: &UserContext) -> RepoResult<Vec<ClassMeeting>>;
    fn insert_meeting(&self, ctx: &UserContext, meeting: &ClassMeeting) -> RepoResult<MeetingId>;
    fn delete_meeting(&self, ctx: &UserContext, id: MeetingId) -> RepoResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn list_courses(&self, ctx: &UserContext) -> RepoResult<Vec<Course>> {
        (**self).list_courses(ctx)
    }

    fn get_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<Option<Course>> {
        (**self).get_course(ctx, id)
    }

    fn insert_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<CourseId> {
        (**self).insert_course(ctx, course)
    }

    fn update_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<()> {
        (**self).update_course(ctx, course)
    }

    fn delete_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<()> {
        (**self).delete_course(ctx, id)
    }

    fn list_items(&self, ctx: &UserContext, query: &ItemListQuery) -> RepoResult<Vec<DatedItem>> {
        (**self).list_items(ctx, query)
    }

    fn get_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
    ) -> RepoResult<Option<DatedItem>> {
        (**self).get_item(ctx, collection, id)
    }

    fn insert_item(&self, ctx: &UserContext, item: &DatedItem) -> RepoResult<ItemId> {
        (**self).insert_item(ctx, item)
    }

    fn update_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
        patch: &ItemPatch,
    ) -> RepoResult<()> {
        (**self).update_item(ctx, collection, id, patch)
    }

    fn delete_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
    ) -> RepoResult<()> {
        (**self).delete_item(ctx, collection, id)
    }

    fn list_meetings(&self, ctx: &UserContext) -> RepoResult<Vec<ClassMeeting>> {
        (**self).list_meetings(ctx)
    }

    fn insert_meeting(&self, ctx: &UserContext, meeting: &ClassMeeting) -> RepoResult<MeetingId> {
        (**self).insert_meeting(ctx, meeting)
    }

    fn delete_meeting(&self, ctx: &UserContext, id: MeetingId) -> RepoResult<()> {
        (**self).delete_meeting(ctx, id)
    }
}
