//! Weekly class meeting model backing the timetable.
//!
//! # Invariants
//! - `end` is strictly after `start` on the same day.

use crate::model::course::CourseId;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type MeetingId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingValidationError {
    NilId,
    MissingCourse,
    InvalidWindow { start: NaiveTime, end: NaiveTime },
}

impl MeetingValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::NilId => "id",
            Self::MissingCourse => "course_id",
            Self::InvalidWindow { .. } => "end_time",
        }
    }
}

impl Display for MeetingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "meeting id must not be nil"),
            Self::MissingCourse => write!(f, "course is required"),
            Self::InvalidWindow { start, end } => write!(
                f,
                "end time ({}) must be after start time ({})",
                end.format("%H:%M"),
                start.format("%H:%M")
            ),
        }
    }
}

impl Error for MeetingValidationError {}

/// One recurring weekly class slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMeeting {
    pub id: MeetingId,
    pub course_id: CourseId,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub location: Option<String>,
}

impl ClassMeeting {
    pub fn new(course_id: CourseId, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            weekday,
            start,
            end,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        if self.id.is_nil() {
            return Err(MeetingValidationError::NilId);
        }
        if self.course_id.is_nil() {
            return Err(MeetingValidationError::MissingCourse);
        }
        if self.end <= self.start {
            return Err(MeetingValidationError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
