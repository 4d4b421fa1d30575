use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use studydash_core::{
    open_db_in_memory, Bucket, ClassMeeting, Collection, Course, Dashboard, DashboardConfig,
    DatedItem, FilterConfig, ItemPatch, MemoryRecordStore, NewAssignment, NewCourse, NoticeLevel,
    Priority, RecordStore, ServiceError, SqliteRecordStore, UserContext,
};
use uuid::Uuid;

// Wednesday, 10:00 UTC.
fn now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 13, 10, 0, 0)
        .unwrap()
}

fn utc(now: DateTime<FixedOffset>) -> DateTime<Utc> {
    now.with_timezone(&Utc)
}

fn config() -> DashboardConfig {
    DashboardConfig {
        week_start: Weekday::Sun,
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        ..DashboardConfig::default()
    }
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

struct Seeded {
    ctx: UserContext,
    cs: Course,
    soon: DatedItem,
    later: DatedItem,
}

fn seed(store: &impl RecordStore) -> Seeded {
    let ctx = UserContext::new(Uuid::new_v4());
    let cs = Course::new("CS 101", "Intro to CS", "Dr. Smith", "Mon/Wed").with_credits(4);
    let math = Course::new("MATH 200", "Linear Algebra", "Dr. Jones", "Wed 14:00");
    store.insert_course(&ctx, &cs).unwrap();
    store.insert_course(&ctx, &math).unwrap();

    let soon = DatedItem::assignment("Problem set", cs.id, utc(now() + Duration::minutes(90)))
        .with_priority(Priority::High);
    let later = DatedItem::assignment("Essay", math.id, utc(now() + Duration::days(2)));
    let done = DatedItem::assignment("Quiz prep", cs.id, utc(now() + Duration::hours(1)));
    let overdue = DatedItem::assignment("Lab report", cs.id, utc(now() - Duration::hours(3)));
    for item in [&soon, &later, &done, &overdue] {
        store.insert_item(&ctx, item).unwrap();
    }
    store
        .update_item(
            &ctx,
            Collection::Assignments,
            done.id,
            &ItemPatch::completed(true),
        )
        .unwrap();

    // Thursday afternoon, inside the current week.
    let review = DatedItem::study_session(
        "Review",
        cs.id,
        utc(now() + Duration::hours(28)),
        utc(now() + Duration::hours(30)),
    )
    .with_location("Library");
    // Next Monday, outside the current week.
    let next_week = DatedItem::study_session(
        "Next week",
        math.id,
        utc(now() + Duration::days(5)),
        utc(now() + Duration::days(5) + Duration::hours(1)),
    );
    store.insert_item(&ctx, &review).unwrap();
    store.insert_item(&ctx, &next_week).unwrap();

    store
        .insert_meeting(
            &ctx,
            &ClassMeeting::new(cs.id, Weekday::Mon, time(9, 0), time(10, 30)),
        )
        .unwrap();
    store
        .insert_meeting(
            &ctx,
            &ClassMeeting::new(math.id, Weekday::Wed, time(14, 0), time(15, 0))
                .with_location("Room 12"),
        )
        .unwrap();

    Seeded {
        ctx,
        cs,
        soon,
        later,
    }
}

#[test]
fn refresh_loads_a_full_snapshot() {
    let store = MemoryRecordStore::new();
    let seeded = seed(&store);
    let mut dashboard = Dashboard::new(&store, seeded.ctx, config());
    assert!(dashboard.snapshot().refreshed_at.is_none());

    dashboard.refresh().unwrap();

    let snapshot = dashboard.snapshot();
    assert_eq!(snapshot.courses.len(), 2);
    assert_eq!(snapshot.assignments.len(), 4);
    assert_eq!(snapshot.study_sessions.len(), 2);
    assert_eq!(snapshot.meetings.len(), 2);
    assert!(snapshot.refreshed_at.is_some());
    assert!(dashboard.notice().is_none());
}

#[test]
fn failed_refresh_keeps_previous_snapshot_and_sets_notice() {
    let store = MemoryRecordStore::new();
    let seeded = seed(&store);
    let mut dashboard = Dashboard::new(&store, seeded.ctx, config());
    dashboard.refresh().unwrap();
    let before = dashboard.snapshot().assignments.clone();

    store
        .delete_item(&seeded.ctx, Collection::Assignments, seeded.later.id)
        .unwrap();
    // The first fetch of the next refresh fails.
    store.fail_next_reads(1);
    let err = dashboard.refresh().unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));

    assert_eq!(dashboard.snapshot().assignments, before);
    let notice = dashboard.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.starts_with("Failed to load dashboard"));
    assert!(dashboard.notice().is_none());

    dashboard.refresh().unwrap();
    assert_eq!(dashboard.snapshot().assignments.len(), 3);
}

#[test]
fn nearest_pending_moves_on_when_completed() {
    let store = MemoryRecordStore::new();
    let seeded = seed(&store);
    let mut dashboard = Dashboard::new(&store, seeded.ctx, config());
    dashboard.refresh().unwrap();

    assert_eq!(dashboard.nearest_pending(now()).unwrap().id, seeded.soon.id);
    assert_eq!(
        dashboard.countdown_label(now()).as_deref(),
        Some("1h 30m remaining")
    );

    dashboard.set_completed(seeded.soon.id, true).unwrap();
    let notice = dashboard.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Assignment marked as completed");

    // The Thursday study session is next once the problem set is done.
    let next = dashboard.nearest_pending(now()).unwrap();
    assert_eq!(next.title, "Review");
    assert_eq!(
        dashboard.countdown_label(now()).as_deref(),
        Some("1d 4h 0m remaining")
    );
}

#[test]
fn completion_with_failed_refresh_withholds_selection() {
    let store = MemoryRecordStore::new();
    let seeded = seed(&store);
    let mut dashboard = Dashboard::new(&store, seeded.ctx, config());
    dashboard.refresh().unwrap();

    store.fail_next_reads(1);
    let err = dashboard.set_completed(seeded.soon.id, true).unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    let notice = dashboard.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.starts_with("Failed to load dashboard"));

    // The write landed but the snapshot still shows the problem set pending.
    assert!(dashboard.is_stale());
    assert!(dashboard.nearest_pending(now()).is_none());
    assert!(dashboard.countdown_label(now()).is_none());

    dashboard.refresh().unwrap();
    assert!(!dashboard.is_stale());
    let next = dashboard.nearest_pending(now()).unwrap();
    assert_ne!(next.id, seeded.soon.id);
    assert_eq!(next.title, "Review");
}

#[test]
fn views_apply_filters_and_default_limit() {
    let store = MemoryRecordStore::new();
    let seeded = seed(&store);
    let mut config = config();
    config.default_limit = Some(2);
    let mut dashboard = Dashboard::new(&store, seeded.ctx, config);
    dashboard.refresh().unwrap();

    let all = dashboard.view(&FilterConfig::default(), now());
    assert_eq!(all.len(), 2);

    let unlimited = FilterConfig::default().with_limit(usize::MAX);
    assert_eq!(dashboard.view(&unlimited, now()).len(), 6);

    let overdue = dashboard.view(&FilterConfig::bucket(Bucket::Overdue), now());
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].item.title, "Lab report");

    let today = dashboard.view_collection(
        Collection::Assignments,
        &FilterConfig::bucket(Bucket::Today),
        now(),
    );
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].item.id, seeded.soon.id);
    assert_eq!(today[0].due_label, "Today, 11:30");

    let by_course = dashboard.view(
        &FilterConfig::default()
            .with_course(seeded.cs.id)
            .with_search("review")
            .with_limit(10),
        now(),
    );
    assert_eq!(by_course.len(), 1);
    assert_eq!(by_course[0].item.location(), Some("Library"));
}

#[test]
fn summary_reports_headline_figures() {
    let store = MemoryRecordStore::new();
    let seeded = seed(&store);
    let mut dashboard = Dashboard::new(&store, seeded.ctx, config());
    dashboard.refresh().unwrap();

    let summary = dashboard.summary(now());
    assert_eq!(summary.classes_today, 1);
    let next_class = summary.next_class.unwrap();
    assert_eq!(next_class.course_code.as_deref(), Some("MATH 200"));
    assert_eq!(next_class.start, time(14, 0));
    assert_eq!(next_class.location.as_deref(), Some("Room 12"));

    assert_eq!(summary.pending_assignments, 3);
    assert_eq!(summary.completed_assignments, 1);
    let next_due = summary.next_due.unwrap();
    assert_eq!(next_due.id, seeded.soon.id);
    assert_eq!(next_due.due_label, "Today, 11:30");

    assert_eq!(summary.total_courses, 2);
    assert_eq!(summary.total_credits, 7);
    // 90 + 60 minutes of classes plus the 2h Thursday session.
    assert_eq!(summary.scheduled_minutes_this_week, 270);
    assert_eq!(summary.busiest_day, Some(Weekday::Thu));
}

#[test]
fn empty_dashboard_has_no_selection() {
    let store = MemoryRecordStore::new();
    let mut dashboard = Dashboard::new(&store, UserContext::new(Uuid::new_v4()), config());
    dashboard.refresh().unwrap();

    assert!(dashboard.nearest_pending(now()).is_none());
    assert!(dashboard.countdown_label(now()).is_none());
    let summary = dashboard.summary(now());
    assert_eq!(summary.pending_assignments, 0);
    assert_eq!(summary.busiest_day, None);
    assert_eq!(dashboard.timetable().len(), 11);
}

#[test]
fn validation_failures_leave_no_notice() {
    let store = MemoryRecordStore::new();
    let mut dashboard = Dashboard::new(&store, UserContext::new(Uuid::new_v4()), config());

    let err = dashboard
        .add_course(NewCourse::new("C", "Intro", "Dr. Smith", "Mon"))
        .unwrap_err();
    assert_eq!(err.field(), Some("code"));
    assert!(dashboard.notice().is_none());
}

#[test]
fn store_failures_surface_as_error_notice() {
    let store = MemoryRecordStore::new();
    let mut dashboard = Dashboard::new(&store, UserContext::new(Uuid::new_v4()), config());
    dashboard.refresh().unwrap();

    store.fail_next_writes(1);
    let err = dashboard
        .add_course(NewCourse::new("CS 101", "Intro", "Dr. Smith", "Mon"))
        .unwrap_err();
    assert!(err.is_recoverable());
    let notice = dashboard.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(dashboard.snapshot().courses.is_empty());

    let err = dashboard
        .delete_item(Collection::StudySessions, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(dashboard.take_notice().unwrap().level, NoticeLevel::Error);
}

#[test]
fn mutations_refresh_the_sqlite_backed_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let mut dashboard = Dashboard::new(store, UserContext::new(Uuid::new_v4()), config());

    let course = dashboard
        .add_course(NewCourse::new("CS 101", "Intro to CS", "Dr. Smith", "Mon 9:00"))
        .unwrap();
    assert_eq!(
        dashboard.take_notice().unwrap().message,
        "Course added successfully"
    );

    let due_date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let essay = dashboard
        .add_assignment(&NewAssignment {
            title: "Essay".to_string(),
            description: None,
            course_id: course.id,
            due_date,
            priority: Priority::Low,
        })
        .unwrap();
    assert_eq!(
        dashboard.take_notice().unwrap().message,
        "Assignment created successfully"
    );

    let stored = &dashboard.snapshot().assignments;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, essay.id);
    assert_eq!(stored[0].course_code(), Some("CS 101"));
    assert_eq!(
        stored[0].start(),
        Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap()
    );

    dashboard.delete_course(course.id).unwrap();
    let snapshot = dashboard.snapshot();
    assert!(snapshot.courses.is_empty());
    assert_eq!(snapshot.assignments.len(), 1);
    assert_eq!(snapshot.assignments[0].course, None);

    dashboard
        .delete_item(Collection::Assignments, essay.id)
        .unwrap();
    assert_eq!(
        dashboard.take_notice().unwrap().message,
        "Assignment deleted successfully"
    );
    assert!(dashboard.snapshot().assignments.is_empty());
}
