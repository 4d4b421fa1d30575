//! Dashboard state: one owner's snapshot plus derived views.
//!
//! # Responsibility
//! - Fetch a consistent snapshot of courses, items and meetings.
//! - Serve filtered views, nearest pending item, countdown and summary.
//! - Route mutations through the services and refresh afterwards.
//!
//! # Invariants
//! - A refresh swaps the snapshot only when every fetch succeeded.
//! - Derived views are recomputed from the snapshot on every call.
//! - Store failures become a `Notice`; the previous snapshot is kept.
//! - A mutation whose follow-up refresh failed marks the snapshot stale;
//!   no nearest item or countdown is offered until a refresh succeeds.
//! - Single writer: a dashboard is driven from one logical thread.

use crate::agenda::bucket::{days_since_week_start, local_date};
use crate::agenda::countdown::{countdown_label, due_label};
use crate::agenda::filter::{filter_items, FilterConfig, ItemView};
use crate::agenda::nearest::nearest_pending;
use crate::config::DashboardConfig;
use crate::model::course::{Course, CourseId};
use crate::model::item::{Collection, DatedItem, ItemId, ItemPatch};
use crate::model::meeting::{ClassMeeting, MeetingId};
use crate::model::user::UserContext;
use crate::repo::store::{ItemListQuery, RecordStore};
use crate::service::course_service::{CourseService, NewCourse, NewMeeting};
use crate::service::item_service::{ItemService, NewAssignment, NewStudySession};
use crate::service::{ServiceError, ServiceResult};
use crate::timetable;
use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};
use log::{info, warn};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing message about the last operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Last successfully fetched record set.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub courses: Vec<Course>,
    pub assignments: Vec<DatedItem>,
    pub study_sessions: Vec<DatedItem>,
    pub meetings: Vec<ClassMeeting>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn items(&self, collection: Collection) -> &[DatedItem] {
        match collection {
            Collection::Assignments => &self.assignments,
            Collection::StudySessions => &self.study_sessions,
        }
    }

    /// Assignments first, then study sessions, each in fetch order.
    pub fn all_items(&self) -> impl Iterator<Item = &DatedItem> {
        self.assignments.iter().chain(self.study_sessions.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextClass {
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub start: NaiveTime,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextDue {
    pub id: ItemId,
    pub title: String,
    pub due_label: String,
}

/// Headline figures for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub classes_today: usize,
    pub next_class: Option<NextClass>,
    pub pending_assignments: usize,
    pub completed_assignments: usize,
    pub next_due: Option<NextDue>,
    pub total_courses: usize,
    pub total_credits: u32,
    /// Weekly class minutes plus this week's study session minutes.
    pub scheduled_minutes_this_week: i64,
    pub busiest_day: Option<Weekday>,
}

pub struct Dashboard<S: RecordStore> {
    store: S,
    ctx: UserContext,
    config: DashboardConfig,
    snapshot: Snapshot,
    stale: bool,
    notice: Option<Notice>,
}

impl<S: RecordStore> Dashboard<S> {
    /// Creates a dashboard with an empty snapshot; call `refresh()` to load.
    pub fn new(store: S, ctx: UserContext, config: DashboardConfig) -> Self {
        Self {
            store,
            ctx,
            config,
            snapshot: Snapshot::default(),
            stale: false,
            notice: None,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Whether a write succeeded that the snapshot does not reflect yet.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Current instant in the configured offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.config.utc_offset)
    }

    /// Re-fetches everything; keeps the previous snapshot on any failure.
    pub fn refresh(&mut self) -> ServiceResult<()> {
        let started_at = Instant::now();
        match self.fetch_snapshot() {
            Ok(snapshot) => {
                info!(
                    "event=dashboard_refresh module=service status=ok courses={} assignments={} study_sessions={} meetings={} duration_ms={}",
                    snapshot.courses.len(),
                    snapshot.assignments.len(),
                    snapshot.study_sessions.len(),
                    snapshot.meetings.len(),
                    started_at.elapsed().as_millis()
                );
                self.snapshot = snapshot;
                self.stale = false;
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=dashboard_refresh module=service status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                self.notice = Some(Notice::error(format!("Failed to load dashboard: {err}")));
                Err(err)
            }
        }
    }

    fn fetch_snapshot(&self) -> ServiceResult<Snapshot> {
        let courses = self.store.list_courses(&self.ctx)?;
        let assignments = self
            .store
            .list_items(&self.ctx, &ItemListQuery::new(Collection::Assignments))?;
        let study_sessions = self
            .store
            .list_items(&self.ctx, &ItemListQuery::new(Collection::StudySessions))?;
        let meetings = self.store.list_meetings(&self.ctx)?;

        Ok(Snapshot {
            courses,
            assignments,
            study_sessions,
            meetings,
            refreshed_at: Some(Utc::now()),
        })
    }

    /// Filtered view across both collections.
    pub fn view(&self, filter: &FilterConfig, now: DateTime<FixedOffset>) -> Vec<ItemView> {
        filter_items(
            self.snapshot.all_items(),
            &self.effective_filter(filter),
            now,
            self.config.week_start,
        )
    }

    /// Filtered view over one collection.
    pub fn view_collection(
        &self,
        collection: Collection,
        filter: &FilterConfig,
        now: DateTime<FixedOffset>,
    ) -> Vec<ItemView> {
        filter_items(
            self.snapshot.items(collection),
            &self.effective_filter(filter),
            now,
            self.config.week_start,
        )
    }

    fn effective_filter(&self, filter: &FilterConfig) -> FilterConfig {
        let mut effective = filter.clone();
        if effective.limit.is_none() {
            effective.limit = self.config.default_limit;
        }
        effective
    }

    /// `None` while the snapshot is stale.
    pub fn nearest_pending(&self, now: DateTime<FixedOffset>) -> Option<&DatedItem> {
        if self.stale {
            return None;
        }
        nearest_pending(self.snapshot.all_items(), now)
    }

    /// Countdown to the nearest pending item, if any.
    pub fn countdown_label(&self, now: DateTime<FixedOffset>) -> Option<String> {
        self.nearest_pending(now)
            .map(|item| countdown_label(item, now))
    }

    pub fn timetable(&self) -> Vec<timetable::TimetableRow<'_>> {
        timetable::grid(&self.snapshot.meetings, self.config.week_start)
    }

    pub fn summary(&self, now: DateTime<FixedOffset>) -> DashboardSummary {
        let snapshot = &self.snapshot;
        let today = now.weekday();
        let classes_today = timetable::classes_on(&snapshot.meetings, today);
        let next_class = timetable::next_class_on(&snapshot.meetings, today, now.time()).map(
            |meeting| {
                let course = snapshot
                    .courses
                    .iter()
                    .find(|course| course.id == meeting.course_id);
                NextClass {
                    course_code: course.map(|course| course.code.clone()),
                    course_name: course.map(|course| course.name.clone()),
                    start: meeting.start,
                    location: meeting.location.clone(),
                }
            },
        );

        let pending = snapshot
            .assignments
            .iter()
            .filter(|item| !item.completed())
            .count();
        let next_due = nearest_pending(&snapshot.assignments, now).map(|item| NextDue {
            id: item.id,
            title: item.title.clone(),
            due_label: due_label(item.start(), now),
        });

        let (scheduled_minutes_this_week, busiest_day) = self.week_load(now);

        DashboardSummary {
            classes_today: classes_today.len(),
            next_class,
            pending_assignments: pending,
            completed_assignments: snapshot.assignments.len() - pending,
            next_due,
            total_courses: snapshot.courses.len(),
            total_credits: snapshot
                .courses
                .iter()
                .map(|course| u32::from(course.credits))
                .sum(),
            scheduled_minutes_this_week,
            busiest_day,
        }
    }

    /// Minutes per weekday for the week containing `now`, in week order.
    fn week_load(&self, now: DateTime<FixedOffset>) -> (i64, Option<Weekday>) {
        let week_start = self.config.week_start;
        let days = timetable::week_days(week_start);
        let mut minutes = [0_i64; 7];

        for meeting in &self.snapshot.meetings {
            minutes[days_since_week_start(meeting.weekday, week_start) as usize] +=
                meeting.duration_minutes();
        }

        let today = now.date_naive();
        let days_into_week = i64::from(days_since_week_start(today.weekday(), week_start));
        for session in &self.snapshot.study_sessions {
            let offset_days = (local_date(session.start(), now) - today).num_days();
            let index = offset_days + days_into_week;
            if !(0..7).contains(&index) {
                continue;
            }
            let length = session
                .end()
                .map(|end| (end - session.start()).num_minutes())
                .unwrap_or(0);
            minutes[index as usize] += length;
        }

        let total = minutes.iter().sum();
        // Ties go to the earlier day of the week.
        let busiest = minutes
            .iter()
            .enumerate()
            .filter(|(_, value)| **value > 0)
            .fold(None, |best: Option<(usize, i64)>, (index, value)| match best {
                Some((_, top)) if top >= *value => best,
                _ => Some((index, *value)),
            })
            .map(|(index, _)| days[index]);
        (total, busiest)
    }

    fn courses(&self) -> CourseService<&S> {
        CourseService::new(&self.store, self.ctx)
    }

    fn items(&self) -> ItemService<&S> {
        ItemService::new(&self.store, self.ctx, self.config.utc_offset)
    }

    /// Runs a mutation, then refreshes. Store and not-found failures also
    /// surface as an error notice; validation failures are left to the form.
    ///
    /// When the write lands but the refresh fails, the refresh error is
    /// returned and the snapshot stays stale until the next good refresh.
    fn mutate<T>(
        &mut self,
        success: &str,
        op: impl FnOnce(&Self) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        match op(self) {
            Ok(value) => {
                if let Err(err) = self.refresh() {
                    self.stale = true;
                    return Err(err);
                }
                self.notice = Some(Notice::success(success));
                Ok(value)
            }
            Err(err) => {
                if !matches!(err, ServiceError::Validation { .. }) {
                    self.notice = Some(Notice::error(err.to_string()));
                }
                Err(err)
            }
        }
    }

    pub fn add_course(&mut self, input: NewCourse) -> ServiceResult<Course> {
        self.mutate("Course added successfully", |dash| {
            dash.courses().create_course(input)
        })
    }

    pub fn update_course(&mut self, course: &Course) -> ServiceResult<()> {
        self.mutate("Course updated successfully", |dash| {
            dash.courses().update_course(course)
        })
    }

    pub fn delete_course(&mut self, id: CourseId) -> ServiceResult<()> {
        self.mutate("Course deleted successfully", |dash| {
            dash.courses().delete_course(id)
        })
    }

    pub fn add_meeting(&mut self, input: &NewMeeting) -> ServiceResult<ClassMeeting> {
        self.mutate("Class added to timetable", |dash| {
            dash.courses().add_meeting(input)
        })
    }

    pub fn delete_meeting(&mut self, id: MeetingId) -> ServiceResult<()> {
        self.mutate("Class removed from timetable", |dash| {
            dash.courses().delete_meeting(id)
        })
    }

    pub fn add_assignment(&mut self, input: &NewAssignment) -> ServiceResult<DatedItem> {
        self.mutate("Assignment created successfully", |dash| {
            dash.items().create_assignment(input)
        })
    }

    pub fn add_study_session(&mut self, input: &NewStudySession) -> ServiceResult<DatedItem> {
        self.mutate("Study session created successfully", |dash| {
            dash.items().create_study_session(input)
        })
    }

    pub fn set_completed(&mut self, id: ItemId, completed: bool) -> ServiceResult<()> {
        let message = if completed {
            "Assignment marked as completed"
        } else {
            "Assignment marked as pending"
        };
        self.mutate(message, |dash| dash.items().set_completed(id, completed))
    }

    pub fn reschedule(
        &mut self,
        collection: Collection,
        id: ItemId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> ServiceResult<()> {
        self.mutate("Item rescheduled", |dash| {
            dash.items().reschedule(collection, id, start, end)
        })
    }

    pub fn update_item(
        &mut self,
        collection: Collection,
        id: ItemId,
        patch: &ItemPatch,
    ) -> ServiceResult<()> {
        self.mutate("Item updated successfully", |dash| {
            dash.items().update_item(collection, id, patch)
        })
    }

    pub fn delete_item(&mut self, collection: Collection, id: ItemId) -> ServiceResult<()> {
        let message = match collection {
            Collection::Assignments => "Assignment deleted successfully",
            Collection::StudySessions => "Study session deleted successfully",
        };
        self.mutate(message, |dash| dash.items().delete_item(collection, id))
    }
}
