//! Course domain model.
//!
//! # Responsibility
//! - Define the grouping entity that assignments and sessions point at.
//! - Enforce the course form rules before anything is persisted.
//!
//! # Invariants
//! - `code` has at least 2 characters, `name`, `instructor` and `schedule`
//!   at least 3 (after trimming).
//! - `credits` stays within `1..=6`.
//! - `color` is always one of the fixed palette entries.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a course.
pub type CourseId = Uuid;

pub const COURSE_CODE_MIN_CHARS: usize = 2;
pub const COURSE_TEXT_MIN_CHARS: usize = 3;
pub const COURSE_CREDITS_MIN: u8 = 1;
pub const COURSE_CREDITS_MAX: u8 = 6;
pub const COURSE_CREDITS_DEFAULT: u8 = 3;

/// Display color tag for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseColor {
    #[default]
    Blue,
    Green,
    Purple,
    Orange,
    Red,
    Yellow,
    Pink,
    Indigo,
}

impl CourseColor {
    pub const ALL: [CourseColor; 8] = [
        Self::Blue,
        Self::Green,
        Self::Purple,
        Self::Orange,
        Self::Red,
        Self::Yellow,
        Self::Pink,
        Self::Indigo,
    ];

    /// Stable string id used in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Pink => "pink",
            Self::Indigo => "indigo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str() == normalized)
    }
}

/// Course fields a store embeds into items for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub code: String,
    pub name: String,
    pub color: CourseColor,
}

/// Validation error for course records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseValidationError {
    NilId,
    TooShort {
        field: &'static str,
        min: usize,
        actual: usize,
    },
    CreditsOutOfRange(u8),
}

impl CourseValidationError {
    /// Name of the form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NilId => "id",
            Self::TooShort { field, .. } => *field,
            Self::CreditsOutOfRange(_) => "credits",
        }
    }
}

impl Display for CourseValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "course id must not be nil"),
            Self::TooShort { field, min, actual } => write!(
                f,
                "{field} must be at least {min} characters (got {actual})"
            ),
            Self::CreditsOutOfRange(value) => write!(
                f,
                "credits must be between {COURSE_CREDITS_MIN} and {COURSE_CREDITS_MAX} (got {value})"
            ),
        }
    }
}

impl Error for CourseValidationError {}

/// A course owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
    pub instructor: String,
    pub schedule: String,
    pub credits: u8,
    pub color: CourseColor,
}

impl Course {
    /// Creates a course with a generated ID, default credits and color.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        instructor: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            instructor: instructor.into(),
            schedule: schedule.into(),
            credits: COURSE_CREDITS_DEFAULT,
            color: CourseColor::default(),
        }
    }

    pub fn with_credits(mut self, credits: u8) -> Self {
        self.credits = credits;
        self
    }

    pub fn with_color(mut self, color: CourseColor) -> Self {
        self.color = color;
        self
    }

    /// Validates the course form rules.
    ///
    /// Checks run in form order, so the first failing field is reported.
    pub fn validate(&self) -> Result<(), CourseValidationError> {
        if self.id.is_nil() {
            return Err(CourseValidationError::NilId);
        }
        check_min_chars("code", &self.code, COURSE_CODE_MIN_CHARS)?;
        check_min_chars("name", &self.name, COURSE_TEXT_MIN_CHARS)?;
        check_min_chars("instructor", &self.instructor, COURSE_TEXT_MIN_CHARS)?;
        check_min_chars("schedule", &self.schedule, COURSE_TEXT_MIN_CHARS)?;
        if !(COURSE_CREDITS_MIN..=COURSE_CREDITS_MAX).contains(&self.credits) {
            return Err(CourseValidationError::CreditsOutOfRange(self.credits));
        }
        Ok(())
    }

    /// Display projection embedded into items.
    pub fn info(&self) -> CourseInfo {
        CourseInfo {
            code: self.code.clone(),
            name: self.name.clone(),
            color: self.color,
        }
    }
}

fn check_min_chars(
    field: &'static str,
    value: &str,
    min: usize,
) -> Result<(), CourseValidationError> {
    let actual = value.trim().chars().count();
    if actual < min {
        return Err(CourseValidationError::TooShort { field, min, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_course_uses_form_defaults() {
        let course = Course::new("CS 101", "Intro to CS", "Dr. Smith", "Mon, Wed 9:00");
        assert_eq!(course.credits, COURSE_CREDITS_DEFAULT);
        assert_eq!(course.color, CourseColor::Blue);
        assert!(course.validate().is_ok());
    }

    #[test]
    fn validate_reports_first_short_field() {
        let course = Course::new("C", "Intro", "Dr", "Mon");
        let err = course.validate().unwrap_err();
        assert_eq!(err.field(), "code");

        let course = Course::new("CS 101", "Intro", "Dr", "Mon");
        let err = course.validate().unwrap_err();
        assert_eq!(
            err,
            CourseValidationError::TooShort {
                field: "instructor",
                min: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn validate_rejects_credits_outside_range() {
        let course = Course::new("CS 101", "Intro", "Dr. Smith", "Mon").with_credits(7);
        assert_eq!(
            course.validate().unwrap_err(),
            CourseValidationError::CreditsOutOfRange(7)
        );
    }

    #[test]
    fn color_parse_is_case_insensitive() {
        assert_eq!(CourseColor::parse(" Indigo "), Some(CourseColor::Indigo));
        assert_eq!(CourseColor::parse("teal"), None);
    }
}
