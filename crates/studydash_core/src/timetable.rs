//! Weekly timetable layout over class meetings.
//!
//! # Invariants
//! - A meeting occupies an hour slot when it starts in that hour or spans it.
//! - Grid columns follow the configured week start.

use crate::model::meeting::ClassMeeting;
use chrono::{NaiveTime, Timelike, Weekday};

pub const FIRST_HOUR: u32 = 8;
pub const LAST_HOUR: u32 = 18;

/// One hour row of the weekly grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableRow<'a> {
    pub hour: u32,
    /// One cell per day, in `week_days` order.
    pub cells: Vec<Vec<&'a ClassMeeting>>,
}

/// The seven weekdays starting at `week_start`.
pub fn week_days(week_start: Weekday) -> [Weekday; 7] {
    let mut days = [week_start; 7];
    for index in 1..days.len() {
        days[index] = days[index - 1].succ();
    }
    days
}

/// Whether `meeting` shows in the `hour` slot of `weekday`.
pub fn occupies_slot(meeting: &ClassMeeting, weekday: Weekday, hour: u32) -> bool {
    if meeting.weekday != weekday {
        return false;
    }
    let start_hour = meeting.start.hour();
    let end_hour = meeting.end.hour();
    start_hour == hour || (start_hour < hour && end_hour > hour)
}

pub fn classes_for_slot(
    meetings: &[ClassMeeting],
    weekday: Weekday,
    hour: u32,
) -> Vec<&ClassMeeting> {
    meetings
        .iter()
        .filter(|meeting| occupies_slot(meeting, weekday, hour))
        .collect()
}

/// Meetings on `weekday`, earliest first.
pub fn classes_on(meetings: &[ClassMeeting], weekday: Weekday) -> Vec<&ClassMeeting> {
    let mut on_day: Vec<&ClassMeeting> = meetings
        .iter()
        .filter(|meeting| meeting.weekday == weekday)
        .collect();
    on_day.sort_by_key(|meeting| meeting.start);
    on_day
}

/// First meeting on `weekday` starting at or after `after`.
pub fn next_class_on(
    meetings: &[ClassMeeting],
    weekday: Weekday,
    after: NaiveTime,
) -> Option<&ClassMeeting> {
    classes_on(meetings, weekday)
        .into_iter()
        .find(|meeting| meeting.start >= after)
}

/// Rows for hours `FIRST_HOUR..=LAST_HOUR`, columns per `week_days`.
pub fn grid(meetings: &[ClassMeeting], week_start: Weekday) -> Vec<TimetableRow<'_>> {
    let days = week_days(week_start);
    (FIRST_HOUR..=LAST_HOUR)
        .map(|hour| TimetableRow {
            hour,
            cells: days
                .iter()
                .map(|day| classes_for_slot(meetings, *day, hour))
                .collect(),
        })
        .collect()
}
