//! Command-line front end for the studydash core.
//!
//! # Responsibility
//! - Parse commands, open the configured database and drive a `Dashboard`.
//! - Render views, summaries, countdowns and the timetable as plain text.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use studydash_core::config::parse_weekday;
use studydash_core::{
    init_logging, open_db, Bucket, Collection, CountdownTicker, CourseColor, Dashboard,
    DashboardConfig, FilterConfig, NewAssignment, NewCourse, NewMeeting, NewStudySession,
    NoticeLevel, Priority, SqliteRecordStore, UserContext,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "studydash", about = "Student dashboard: assignments, study sessions, timetable")]
struct Opts {
    /// SQLite database path (overrides STUDYDASH_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Owner id scoping every read and write (overrides STUDYDASH_OWNER)
    #[arg(long, global = true)]
    owner: Option<Uuid>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List assignments and study sessions
    List {
        #[arg(long, value_parser = parse_bucket)]
        bucket: Option<Bucket>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        course: Option<Uuid>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_collection)]
        collection: Option<Collection>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the dashboard summary cards
    Summary,
    /// Count down to the nearest pending item
    Countdown {
        /// Number of refreshes before exiting
        #[arg(long, default_value_t = 0)]
        ticks: u32,
    },
    /// Print the weekly timetable
    Timetable,
    /// List courses
    Courses,
    AddCourse {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        instructor: String,
        #[arg(long)]
        schedule: String,
        #[arg(long, default_value_t = 3)]
        credits: u8,
        #[arg(long, value_parser = parse_color, default_value = "blue")]
        color: CourseColor,
    },
    AddAssignment {
        #[arg(long)]
        title: String,
        #[arg(long)]
        course: Uuid,
        /// Due date (YYYY-MM-DD); due at 23:59:59 local time
        #[arg(long)]
        due: NaiveDate,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        description: Option<String>,
    },
    AddSession {
        #[arg(long)]
        title: String,
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        date: NaiveDate,
        /// Start time (HH:MM)
        #[arg(long)]
        start: String,
        /// End time (HH:MM)
        #[arg(long)]
        end: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a weekly class meeting to the timetable
    AddClass {
        #[arg(long)]
        course: Uuid,
        #[arg(long, value_parser = parse_day)]
        day: Weekday,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Mark an assignment as completed
    Complete {
        id: Uuid,
        /// Mark as pending again
        #[arg(long)]
        undo: bool,
    },
    Delete {
        #[arg(long, value_parser = parse_collection)]
        collection: Collection,
        id: Uuid,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Summary => "summary",
            Self::Countdown { .. } => "countdown",
            Self::Timetable => "timetable",
            Self::Courses => "courses",
            Self::AddCourse { .. } => "add-course",
            Self::AddAssignment { .. } => "add-assignment",
            Self::AddSession { .. } => "add-session",
            Self::AddClass { .. } => "add-class",
            Self::Complete { .. } => "complete",
            Self::Delete { .. } => "delete",
        }
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: Opts) -> Result<()> {
    let mut config = DashboardConfig::from_env();
    if let Some(db) = opts.db {
        config.db_path = db;
    }
    if let Some(owner) = opts.owner {
        config.owner_id = owner;
    }
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }

    info!(
        "event=cli_start module=cli status=ok command={} db={}",
        opts.command.name(),
        config.db_path.display()
    );

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let store = SqliteRecordStore::try_new(&conn)?;
    let ctx = UserContext::new(config.owner_id);
    let cadence = config.countdown_cadence;
    let mut dashboard = Dashboard::new(store, ctx, config);
    dashboard.refresh()?;

    match opts.command {
        Command::List {
            bucket,
            search,
            course,
            priority,
            collection,
            limit,
        } => {
            let filter = FilterConfig {
                bucket,
                search_term: search.unwrap_or_default(),
                course_id: course,
                priority,
                limit,
            };
            let now = dashboard.now();
            let views = match collection {
                Some(collection) => dashboard.view_collection(collection, &filter, now),
                None => dashboard.view(&filter, now),
            };
            if views.is_empty() {
                println!("No items found");
            }
            for view in views {
                let item = &view.item;
                let course = item.course_code().unwrap_or("-");
                let mut line = format!(
                    "{}  [{}] {} ({course}) {}",
                    item.id,
                    view.bucket.as_str(),
                    item.title,
                    view.due_label
                );
                if let Some(priority) = item.priority() {
                    line.push_str(&format!(" priority={}", priority.as_str()));
                }
                if let Some(location) = item.location() {
                    line.push_str(&format!(" @ {location}"));
                }
                println!("{line}");
            }
        }
        Command::Summary => {
            let summary = dashboard.summary(dashboard.now());
            println!("Today's classes: {}", summary.classes_today);
            if let Some(next) = &summary.next_class {
                println!(
                    "  Next: {} at {}",
                    next.course_name.as_deref().unwrap_or("Unknown course"),
                    next.start.format("%H:%M")
                );
            }
            println!("Assignments due: {}", summary.pending_assignments);
            if let Some(next) = &summary.next_due {
                println!("  Next: {} ({})", next.title, next.due_label);
            }
            println!(
                "Courses: {} ({} credits)",
                summary.total_courses, summary.total_credits
            );
            println!(
                "Week overview: {}h {}m",
                summary.scheduled_minutes_this_week / 60,
                summary.scheduled_minutes_this_week % 60
            );
            if let Some(day) = summary.busiest_day {
                println!("  Busiest day: {day}");
            }
        }
        Command::Countdown { ticks } => {
            print_countdown(&dashboard);
            if ticks > 0 {
                let (tx, rx) = mpsc::channel();
                let mut ticker = CountdownTicker::start(cadence, move || {
                    let _ = tx.send(());
                })?;
                for _ in 0..ticks {
                    rx.recv().map_err(|_| anyhow!("countdown ticker stopped"))?;
                    if dashboard.refresh().is_err() {
                        report_notice(&mut dashboard);
                    }
                    print_countdown(&dashboard);
                }
                ticker.stop();
            }
        }
        Command::Timetable => {
            let days = studydash_core::timetable::week_days(dashboard.config().week_start);
            let header: Vec<String> = days
                .iter()
                .map(|day| format!("{:<12}", day.to_string()))
                .collect();
            println!("      {}", header.join(""));
            let snapshot = dashboard.snapshot();
            for row in dashboard.timetable() {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .map(|cell| {
                        let label = cell
                            .iter()
                            .map(|meeting| {
                                snapshot
                                    .courses
                                    .iter()
                                    .find(|course| course.id == meeting.course_id)
                                    .map_or("?", |course| course.code.as_str())
                            })
                            .collect::<Vec<_>>()
                            .join(",");
                        format!("{label:<12}")
                    })
                    .collect();
                println!("{:02}:00 {}", row.hour, cells.join(""));
            }
        }
        Command::Courses => {
            for course in &dashboard.snapshot().courses {
                println!(
                    "{}  {} {} ({}, {} credits, {})",
                    course.id,
                    course.code,
                    course.name,
                    course.instructor,
                    course.credits,
                    course.color.as_str()
                );
            }
        }
        Command::AddCourse {
            code,
            name,
            instructor,
            schedule,
            credits,
            color,
        } => {
            let mut input = NewCourse::new(code, name, instructor, schedule);
            input.credits = credits;
            input.color = color;
            let course = dashboard.add_course(input)?;
            println!("{}", course.id);
        }
        Command::AddAssignment {
            title,
            course,
            due,
            priority,
            description,
        } => {
            let item = dashboard.add_assignment(&NewAssignment {
                title,
                description,
                course_id: course,
                due_date: due,
                priority,
            })?;
            println!("{}", item.id);
        }
        Command::AddSession {
            title,
            course,
            date,
            start,
            end,
            location,
            description,
        } => {
            let item = dashboard.add_study_session(&NewStudySession {
                title,
                description,
                course_id: course,
                date,
                start_time: start,
                end_time: end,
                location,
            })?;
            println!("{}", item.id);
        }
        Command::AddClass {
            course,
            day,
            start,
            end,
            location,
        } => {
            let meeting = dashboard.add_meeting(&NewMeeting {
                course_id: course,
                weekday: day,
                start_time: start,
                end_time: end,
                location,
            })?;
            println!("{}", meeting.id);
        }
        Command::Complete { id, undo } => {
            dashboard.set_completed(id, !undo)?;
        }
        Command::Delete { collection, id } => {
            dashboard.delete_item(collection, id)?;
        }
    }

    report_notice(&mut dashboard);
    Ok(())
}

fn print_countdown(dashboard: &Dashboard<SqliteRecordStore<'_>>) {
    let now = dashboard.now();
    match dashboard.nearest_pending(now) {
        Some(item) => println!(
            "{}: {}",
            item.title,
            studydash_core::countdown_label(item, now)
        ),
        None => println!("Nothing pending"),
    }
}

fn report_notice(dashboard: &mut Dashboard<SqliteRecordStore<'_>>) {
    if let Some(notice) = dashboard.take_notice() {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Error => eprintln!("{}", notice.message),
        }
    }
}

fn parse_bucket(value: &str) -> Result<Bucket> {
    Bucket::parse(value).ok_or_else(|| anyhow!("unknown bucket `{value}`"))
}

fn parse_priority(value: &str) -> Result<Priority> {
    Priority::parse(value).ok_or_else(|| anyhow!("expected low|medium|high, got `{value}`"))
}

fn parse_collection(value: &str) -> Result<Collection> {
    Collection::parse(value)
        .ok_or_else(|| anyhow!("expected assignments|study_sessions, got `{value}`"))
}

fn parse_color(value: &str) -> Result<CourseColor> {
    CourseColor::parse(value).ok_or_else(|| anyhow!("unknown color `{value}`"))
}

fn parse_day(value: &str) -> Result<Weekday> {
    match parse_weekday(value) {
        Some(day) => Ok(day),
        None => bail!("unknown weekday `{value}`"),
    }
}
