//! Dated item domain model.
//!
//! # Responsibility
//! - Define the shared shape of assignments and study sessions.
//! - Provide capability accessors so callers never match on kind-specific
//!   fields they do not need.
//! - Validate item invariants before persistence and on decode.
//!
//! # Invariants
//! - `id` is stable and never nil.
//! - `title` is non-blank.
//! - Study sessions always satisfy `end > start`.
//! - `course` is display data embedded by the store at read time; it may be
//!   `None` when the referenced course no longer exists.

use crate::model::course::{CourseId, CourseInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for assignments and study sessions.
pub type ItemId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Assignment,
    StudySession,
}

/// Store collection holding one item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Assignments,
    StudySessions,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Self::Assignments, Self::StudySessions];

    pub fn of(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Assignment => Self::Assignments,
            ItemKind::StudySession => Self::StudySessions,
        }
    }

    pub fn kind(self) -> ItemKind {
        match self {
            Self::Assignments => ItemKind::Assignment,
            Self::StudySessions => ItemKind::StudySession,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assignments => "assignments",
            Self::StudySessions => "study_sessions",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignments" | "assignment" => Some(Self::Assignments),
            "study_sessions" | "study_session" | "sessions" | "session" => {
                Some(Self::StudySessions)
            }
            _ => None,
        }
    }
}

/// Assignment urgency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Fields only assignments carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDetail {
    pub due: DateTime<Utc>,
    pub completed: bool,
    pub priority: Priority,
}

/// Fields only study sessions carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySessionDetail {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
}

/// Kind-specific part of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDetail {
    Assignment(AssignmentDetail),
    StudySession(StudySessionDetail),
}

/// Validation error for dated items and item form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    NilId,
    MissingTitle,
    MissingCourse,
    /// Study session end is not strictly after its start.
    InvalidSessionWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Form time input is not a valid `HH:MM` value.
    InvalidTimeOfDay {
        field: &'static str,
        value: String,
    },
    /// A patch touched a field the item kind does not have.
    UnsupportedField {
        field: &'static str,
        kind: ItemKind,
    },
}

impl ItemValidationError {
    /// Name of the form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NilId => "id",
            Self::MissingTitle => "title",
            Self::MissingCourse => "course_id",
            Self::InvalidSessionWindow { .. } => "end_time",
            Self::InvalidTimeOfDay { field, .. } => *field,
            Self::UnsupportedField { field, .. } => *field,
        }
    }
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "item id must not be nil"),
            Self::MissingTitle => write!(f, "title is required"),
            Self::MissingCourse => write!(f, "course is required"),
            Self::InvalidSessionWindow { start, end } => write!(
                f,
                "end time ({}) must be after start time ({})",
                end.to_rfc3339(),
                start.to_rfc3339()
            ),
            Self::InvalidTimeOfDay { field, value } => {
                write!(f, "invalid {field} `{value}`; expected HH:MM")
            }
            Self::UnsupportedField { field, kind } => {
                write!(f, "field `{field}` is not supported for {kind:?} items")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical record for assignments and study sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DatedItemWire")]
pub struct DatedItem {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub course_id: CourseId,
    pub course: Option<CourseInfo>,
    pub detail: ItemDetail,
}

#[derive(Deserialize)]
struct DatedItemWire {
    id: ItemId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    course_id: CourseId,
    #[serde(default)]
    course: Option<CourseInfo>,
    detail: ItemDetail,
}

impl TryFrom<DatedItemWire> for DatedItem {
    type Error = ItemValidationError;

    fn try_from(wire: DatedItemWire) -> Result<Self, Self::Error> {
        let item = Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            course_id: wire.course_id,
            course: wire.course,
            detail: wire.detail,
        };
        item.validate()?;
        Ok(item)
    }
}

impl DatedItem {
    /// Creates a pending medium-priority assignment with a generated ID.
    pub fn assignment(
        title: impl Into<String>,
        course_id: CourseId,
        due: DateTime<Utc>,
    ) -> Self {
        Self::with_detail(
            title,
            course_id,
            ItemDetail::Assignment(AssignmentDetail {
                due,
                completed: false,
                priority: Priority::default(),
            }),
        )
    }

    /// Creates a study session with a generated ID.
    ///
    /// This constructor does not validate the window; call `validate()`.
    pub fn study_session(
        title: impl Into<String>,
        course_id: CourseId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self::with_detail(
            title,
            course_id,
            ItemDetail::StudySession(StudySessionDetail {
                start,
                end,
                location: None,
            }),
        )
    }

    fn with_detail(title: impl Into<String>, course_id: CourseId, detail: ItemDetail) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            course_id,
            course: None,
            detail,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets priority; no-op for study sessions.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        if let ItemDetail::Assignment(detail) = &mut self.detail {
            detail.priority = priority;
        }
        self
    }

    /// Sets location; no-op for assignments.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        if let ItemDetail::StudySession(detail) = &mut self.detail {
            detail.location = Some(location.into());
        }
        self
    }

    pub fn with_course_info(mut self, course: CourseInfo) -> Self {
        self.course = Some(course);
        self
    }

    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.id.is_nil() {
            return Err(ItemValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ItemValidationError::MissingTitle);
        }
        if self.course_id.is_nil() {
            return Err(ItemValidationError::MissingCourse);
        }
        if let ItemDetail::StudySession(detail) = &self.detail {
            if detail.end <= detail.start {
                return Err(ItemValidationError::InvalidSessionWindow {
                    start: detail.start,
                    end: detail.end,
                });
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> ItemKind {
        match self.detail {
            ItemDetail::Assignment(_) => ItemKind::Assignment,
            ItemDetail::StudySession(_) => ItemKind::StudySession,
        }
    }

    pub fn collection(&self) -> Collection {
        Collection::of(self.kind())
    }

    /// The instant the item is keyed on: due date or session start.
    pub fn start(&self) -> DateTime<Utc> {
        match &self.detail {
            ItemDetail::Assignment(detail) => detail.due,
            ItemDetail::StudySession(detail) => detail.start,
        }
    }

    /// Session end; `None` for point-in-time items.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        match &self.detail {
            ItemDetail::Assignment(_) => None,
            ItemDetail::StudySession(detail) => Some(detail.end),
        }
    }

    /// Always `false` for study sessions.
    pub fn completed(&self) -> bool {
        match &self.detail {
            ItemDetail::Assignment(detail) => detail.completed,
            ItemDetail::StudySession(_) => false,
        }
    }

    pub fn priority(&self) -> Option<Priority> {
        self.as_assignment().map(|detail| detail.priority)
    }

    pub fn location(&self) -> Option<&str> {
        self.as_study_session()
            .and_then(|detail| detail.location.as_deref())
    }

    pub fn as_assignment(&self) -> Option<&AssignmentDetail> {
        match &self.detail {
            ItemDetail::Assignment(detail) => Some(detail),
            ItemDetail::StudySession(_) => None,
        }
    }

    pub fn as_assignment_mut(&mut self) -> Option<&mut AssignmentDetail> {
        match &mut self.detail {
            ItemDetail::Assignment(detail) => Some(detail),
            ItemDetail::StudySession(_) => None,
        }
    }

    pub fn as_study_session(&self) -> Option<&StudySessionDetail> {
        match &self.detail {
            ItemDetail::Assignment(_) => None,
            ItemDetail::StudySession(detail) => Some(detail),
        }
    }

    pub fn course_code(&self) -> Option<&str> {
        self.course.as_ref().map(|course| course.code.as_str())
    }

    pub fn course_name(&self) -> Option<&str> {
        self.course.as_ref().map(|course| course.name.as_str())
    }
}

/// Partial update applied by `RecordStore::update_item`.
///
/// `None` leaves a field untouched. For nullable fields the inner option is
/// the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub course_id: Option<CourseId>,
    pub due: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<Option<String>>,
}

impl ItemPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the patch in place and re-validates the result.
    ///
    /// On error `item` may be partially modified; callers apply patches to a
    /// scratch copy.
    pub fn apply_to(&self, item: &mut DatedItem) -> Result<(), ItemValidationError> {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(course_id) = self.course_id {
            if course_id != item.course_id {
                item.course_id = course_id;
                item.course = None;
            }
        }

        let kind = item.kind();
        match &mut item.detail {
            ItemDetail::Assignment(detail) => {
                reject_field(self.start.is_some(), "start", kind)?;
                reject_field(self.end.is_some(), "end", kind)?;
                reject_field(self.location.is_some(), "location", kind)?;
                if let Some(due) = self.due {
                    detail.due = due;
                }
                if let Some(completed) = self.completed {
                    detail.completed = completed;
                }
                if let Some(priority) = self.priority {
                    detail.priority = priority;
                }
            }
            ItemDetail::StudySession(detail) => {
                reject_field(self.due.is_some(), "due", kind)?;
                reject_field(self.completed.is_some(), "completed", kind)?;
                reject_field(self.priority.is_some(), "priority", kind)?;
                if let Some(start) = self.start {
                    detail.start = start;
                }
                if let Some(end) = self.end {
                    detail.end = end;
                }
                if let Some(location) = &self.location {
                    detail.location = location.clone();
                }
            }
        }

        item.validate()
    }
}

fn reject_field(
    present: bool,
    field: &'static str,
    kind: ItemKind,
) -> Result<(), ItemValidationError> {
    if present {
        return Err(ItemValidationError::UnsupportedField { field, kind });
    }
    Ok(())
}
