//! Course and timetable use-cases.
//!
//! # Responsibility
//! - Create, update, delete and list courses for one owner.
//! - Manage the weekly class meetings shown in the timetable.

use crate::model::course::{Course, CourseColor, CourseId, COURSE_CREDITS_DEFAULT};
use crate::model::meeting::{ClassMeeting, MeetingId};
use crate::model::user::UserContext;
use crate::repo::store::RecordStore;
use crate::service::item_service::parse_time_of_day;
use crate::service::{ServiceError, ServiceResult};
use chrono::Weekday;

/// Course form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub code: String,
    pub name: String,
    pub instructor: String,
    pub schedule: String,
    pub credits: u8,
    pub color: CourseColor,
}

impl NewCourse {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        instructor: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            instructor: instructor.into(),
            schedule: schedule.into(),
            credits: COURSE_CREDITS_DEFAULT,
            color: CourseColor::default(),
        }
    }
}

/// Weekly meeting form input; times are `"HH:MM"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeeting {
    pub course_id: CourseId,
    pub weekday: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub location: Option<String>,
}

pub struct CourseService<S: RecordStore> {
    store: S,
    ctx: UserContext,
}

impl<S: RecordStore> CourseService<S> {
    pub fn new(store: S, ctx: UserContext) -> Self {
        Self { store, ctx }
    }

    pub fn create_course(&self, input: NewCourse) -> ServiceResult<Course> {
        let course = Course::new(
            input.code.trim(),
            input.name.trim(),
            input.instructor.trim(),
            input.schedule.trim(),
        )
        .with_credits(input.credits)
        .with_color(input.color);
        course.validate()?;

        self.store.insert_course(&self.ctx, &course)?;
        Ok(course)
    }

    /// Replaces every editable field of an existing course.
    pub fn update_course(&self, course: &Course) -> ServiceResult<()> {
        course.validate()?;
        self.store.update_course(&self.ctx, course)?;
        Ok(())
    }

    /// Deletes a course and its weekly meetings. Items that referenced it
    /// keep the dangling reference and read back without course info.
    pub fn delete_course(&self, id: CourseId) -> ServiceResult<()> {
        self.store.delete_course(&self.ctx, id)?;
        Ok(())
    }

    pub fn get_course(&self, id: CourseId) -> ServiceResult<Course> {
        self.store
            .get_course(&self.ctx, id)?
            .ok_or(ServiceError::NotFound(id))
    }

    pub fn list_courses(&self) -> ServiceResult<Vec<Course>> {
        Ok(self.store.list_courses(&self.ctx)?)
    }

    pub fn add_meeting(&self, input: &NewMeeting) -> ServiceResult<ClassMeeting> {
        if input.course_id.is_nil() {
            return Err(ServiceError::validation("course_id", "course is required"));
        }
        let start = parse_time_of_day("start_time", &input.start_time)?;
        let end = parse_time_of_day("end_time", &input.end_time)?;

        let mut meeting = ClassMeeting::new(input.course_id, input.weekday, start, end);
        meeting.location = non_blank(input.location.as_deref());
        meeting.validate()?;

        self.store.insert_meeting(&self.ctx, &meeting)?;
        Ok(meeting)
    }

    pub fn delete_meeting(&self, id: MeetingId) -> ServiceResult<()> {
        self.store.delete_meeting(&self.ctx, id)?;
        Ok(())
    }

    pub fn list_meetings(&self) -> ServiceResult<Vec<ClassMeeting>> {
        Ok(self.store.list_meetings(&self.ctx)?)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
