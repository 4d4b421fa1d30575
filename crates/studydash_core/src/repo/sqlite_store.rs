//! SQLite implementation of `RecordStore`.
//!
//! # Responsibility
//! - Map courses, dated items and class meetings onto their tables.
//! - Embed course display info into items with a `LEFT JOIN`.
//!
//! # Invariants
//! - Every statement is constrained by `owner_id`.
//! - Instants are stored as epoch milliseconds (UTC).
//! - Read paths reject invalid persisted state instead of masking it.
//! - Ties on the ordering key fall back to `rowid`, i.e. insertion order.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::course::{Course, CourseColor, CourseId, CourseInfo};
use crate::model::item::{
    AssignmentDetail, Collection, DatedItem, ItemDetail, ItemId, ItemPatch, Priority,
    StudySessionDetail,
};
use crate::model::meeting::{ClassMeeting, MeetingId};
use crate::model::user::UserContext;
use crate::repo::store::{
    ItemListQuery, RecordStore, RepoError, RepoResult, SortOrder,
};
use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const COURSE_SELECT_SQL: &str = "SELECT
    id,
    code,
    name,
    instructor,
    schedule,
    credits,
    color
FROM courses";

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    a.id AS id,
    a.course_id AS course_id,
    a.title AS title,
    a.description AS description,
    a.due_at AS due_at,
    a.priority AS priority,
    a.completed AS completed,
    c.code AS course_code,
    c.name AS course_name,
    c.color AS course_color
FROM assignments a
LEFT JOIN courses c ON c.id = a.course_id AND c.owner_id = a.owner_id";

const SESSION_SELECT_SQL: &str = "SELECT
    s.id AS id,
    s.course_id AS course_id,
    s.title AS title,
    s.description AS description,
    s.start_at AS start_at,
    s.end_at AS end_at,
    s.location AS location,
    c.code AS course_code,
    c.name AS course_name,
    c.color AS course_color
FROM study_sessions s
LEFT JOIN courses c ON c.id = s.course_id AND c.owner_id = s.owner_id";

const MEETING_SELECT_SQL: &str = "SELECT
    id,
    course_id,
    weekday,
    start_minute,
    end_minute,
    location
FROM class_meetings";

/// SQLite-backed record store borrowing a migrated connection.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Wraps a connection after checking its schema is fully migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let db_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        let latest = latest_version();
        if db_version > latest {
            return Err(RepoError::Db(DbError::UnsupportedSchemaVersion {
                db_version,
                latest_supported: latest,
            }));
        }
        if db_version < latest {
            return Err(RepoError::InvalidData(format!(
                "schema version {db_version} is older than required {latest}; open the database with open_db"
            )));
        }
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn list_courses(&self, ctx: &UserContext) -> RepoResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COURSE_SELECT_SQL} WHERE owner_id = ?1 ORDER BY code ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([ctx.owner_id().to_string()])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }

        debug!(
            "event=store_list module=repo status=ok collection=courses count={}",
            courses.len()
        );
        Ok(courses)
    }

    fn get_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<Option<Course>> {
        find_course(self.conn, ctx, id)
    }

    fn insert_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<CourseId> {
        course.validate()?;

        self.conn.execute(
            "INSERT INTO courses (
                id,
                owner_id,
                code,
                name,
                instructor,
                schedule,
                credits,
                color
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                course.id.to_string(),
                ctx.owner_id().to_string(),
                course.code.trim(),
                course.name.trim(),
                course.instructor.trim(),
                course.schedule.trim(),
                i64::from(course.credits),
                course.color.as_str(),
            ],
        )?;

        debug!(
            "event=store_write module=repo status=ok op=insert collection=courses id={}",
            course.id
        );
        Ok(course.id)
    }

    fn update_course(&self, ctx: &UserContext, course: &Course) -> RepoResult<()> {
        course.validate()?;

        let changed = self.conn.execute(
            "UPDATE courses
             SET
                code = ?1,
                name = ?2,
                instructor = ?3,
                schedule = ?4,
                credits = ?5,
                color = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7 AND owner_id = ?8;",
            params![
                course.code.trim(),
                course.name.trim(),
                course.instructor.trim(),
                course.schedule.trim(),
                i64::from(course.credits),
                course.color.as_str(),
                course.id.to_string(),
                ctx.owner_id().to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(course.id));
        }

        debug!(
            "event=store_write module=repo status=ok op=update collection=courses id={}",
            course.id
        );
        Ok(())
    }

    fn delete_course(&self, ctx: &UserContext, id: CourseId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let owner = ctx.owner_id().to_string();
        let changed = tx.execute(
            "DELETE FROM courses WHERE id = ?1 AND owner_id = ?2;",
            params![id.to_string(), owner],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        // Items keep their dangling course_id; weekly meetings go with the course.
        tx.execute(
            "DELETE FROM class_meetings WHERE course_id = ?1 AND owner_id = ?2;",
            params![id.to_string(), owner],
        )?;
        tx.commit()?;

        debug!("event=store_write module=repo status=ok op=delete collection=courses id={id}");
        Ok(())
    }

    fn list_items(&self, ctx: &UserContext, query: &ItemListQuery) -> RepoResult<Vec<DatedItem>> {
        let (select, alias, key) = match query.collection {
            Collection::Assignments => (ASSIGNMENT_SELECT_SQL, "a", "due_at"),
            Collection::StudySessions => (SESSION_SELECT_SQL, "s", "start_at"),
        };
        let mut sql = format!("{select} WHERE {alias}.owner_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(ctx.owner_id().to_string())];

        if let Some(course_id) = query.course_id {
            sql.push_str(&format!(" AND {alias}.course_id = ?"));
            bind_values.push(Value::Text(course_id.to_string()));
        }

        let direction = match query.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY {alias}.{key} {direction}, {alias}.rowid ASC"
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(query.collection, row)?);
        }

        debug!(
            "event=store_list module=repo status=ok collection={} count={}",
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
        find_item(self.conn, ctx, collection, id)
    }

    fn insert_item(&self, ctx: &UserContext, item: &DatedItem) -> RepoResult<ItemId> {
        item.validate()?;
        ensure_course_exists(self.conn, ctx, item.course_id)?;

        match &item.detail {
            ItemDetail::Assignment(detail) => {
                self.conn.execute(
                    "INSERT INTO assignments (
                        id,
                        owner_id,
                        course_id,
                        title,
                        description,
                        due_at,
                        priority,
                        completed
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                    params![
                        item.id.to_string(),
                        ctx.owner_id().to_string(),
                        item.course_id.to_string(),
                        item.title.trim(),
                        item.description.as_deref(),
                        detail.due.timestamp_millis(),
                        detail.priority.as_str(),
                        bool_to_int(detail.completed),
                    ],
                )?;
            }
            ItemDetail::StudySession(detail) => {
                self.conn.execute(
                    "INSERT INTO study_sessions (
                        id,
                        owner_id,
                        course_id,
                        title,
                        description,
                        start_at,
                        end_at,
                        location
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                    params![
                        item.id.to_string(),
                        ctx.owner_id().to_string(),
                        item.course_id.to_string(),
                        item.title.trim(),
                        item.description.as_deref(),
                        detail.start.timestamp_millis(),
                        detail.end.timestamp_millis(),
                        detail.location.as_deref(),
                    ],
                )?;
            }
        }

        debug!(
            "event=store_write module=repo status=ok op=insert collection={} id={}",
            item.collection().as_str(),
            item.id
        );
        Ok(item.id)
    }

    fn update_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
        patch: &ItemPatch,
    ) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let mut item = find_item(&tx, ctx, collection, id)?.ok_or(RepoError::NotFound(id))?;
        let previous_course = item.course_id;
        patch.apply_to(&mut item)?;
        if item.course_id != previous_course {
            ensure_course_exists(&tx, ctx, item.course_id)?;
        }

        let owner = ctx.owner_id().to_string();
        match &item.detail {
            ItemDetail::Assignment(detail) => {
                tx.execute(
                    "UPDATE assignments
                     SET
                        course_id = ?1,
                        title = ?2,
                        description = ?3,
                        due_at = ?4,
                        priority = ?5,
                        completed = ?6,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?7 AND owner_id = ?8;",
                    params![
                        item.course_id.to_string(),
                        item.title.trim(),
                        item.description.as_deref(),
                        detail.due.timestamp_millis(),
                        detail.priority.as_str(),
                        bool_to_int(detail.completed),
                        id.to_string(),
                        owner,
                    ],
                )?;
            }
            ItemDetail::StudySession(detail) => {
                tx.execute(
                    "UPDATE study_sessions
                     SET
                        course_id = ?1,
                        title = ?2,
                        description = ?3,
                        start_at = ?4,
                        end_at = ?5,
                        location = ?6,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?7 AND owner_id = ?8;",
                    params![
                        item.course_id.to_string(),
                        item.title.trim(),
                        item.description.as_deref(),
                        detail.start.timestamp_millis(),
                        detail.end.timestamp_millis(),
                        detail.location.as_deref(),
                        id.to_string(),
                        owner,
                    ],
                )?;
            }
        }
        tx.commit()?;

        debug!(
            "event=store_write module=repo status=ok op=update collection={} id={id}",
            collection.as_str()
        );
        Ok(())
    }

    fn delete_item(
        &self,
        ctx: &UserContext,
        collection: Collection,
        id: ItemId,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND owner_id = ?2;",
                collection.as_str()
            ),
            params![id.to_string(), ctx.owner_id().to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        debug!(
            "event=store_write module=repo status=ok op=delete collection={} id={id}",
            collection.as_str()
        );
        Ok(())
    }

    fn list_meetings(&self, ctx: &UserContext) -> RepoResult<Vec<ClassMeeting>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEETING_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY weekday ASC, start_minute ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([ctx.owner_id().to_string()])?;
        let mut meetings = Vec::new();
        while let Some(row) = rows.next()? {
            meetings.push(parse_meeting_row(row)?);
        }

        debug!(
            "event=store_list module=repo status=ok collection=class_meetings count={}",
            meetings.len()
        );
        Ok(meetings)
    }

    fn insert_meeting(&self, ctx: &UserContext, meeting: &ClassMeeting) -> RepoResult<MeetingId> {
        meeting.validate()?;
        ensure_course_exists(self.conn, ctx, meeting.course_id)?;

        self.conn.execute(
            "INSERT INTO class_meetings (
                id,
                owner_id,
                course_id,
                weekday,
                start_minute,
                end_minute,
                location
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                meeting.id.to_string(),
                ctx.owner_id().to_string(),
                meeting.course_id.to_string(),
                i64::from(meeting.weekday.num_days_from_monday()),
                minute_of_day(meeting.start),
                minute_of_day(meeting.end),
                meeting.location.as_deref(),
            ],
        )?;

        debug!(
            "event=store_write module=repo status=ok op=insert collection=class_meetings id={}",
            meeting.id
        );
        Ok(meeting.id)
    }

    fn delete_meeting(&self, ctx: &UserContext, id: MeetingId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM class_meetings WHERE id = ?1 AND owner_id = ?2;",
            params![id.to_string(), ctx.owner_id().to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        debug!(
            "event=store_write module=repo status=ok op=delete collection=class_meetings id={id}"
        );
        Ok(())
    }
}

fn find_course(conn: &Connection, ctx: &UserContext, id: CourseId) -> RepoResult<Option<Course>> {
    let mut stmt = conn.prepare(&format!(
        "{COURSE_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), ctx.owner_id().to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_course_row(row)?));
    }

    Ok(None)
}

fn ensure_course_exists(conn: &Connection, ctx: &UserContext, id: CourseId) -> RepoResult<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM courses WHERE id = ?1 AND owner_id = ?2;",
            params![id.to_string(), ctx.owner_id().to_string()],
            |_| Ok(()),
        )
        .optional()?;

    match found {
        Some(()) => Ok(()),
        None => Err(RepoError::UnknownCourse(id)),
    }
}

fn find_item(
    conn: &Connection,
    ctx: &UserContext,
    collection: Collection,
    id: ItemId,
) -> RepoResult<Option<DatedItem>> {
    let (select, alias) = match collection {
        Collection::Assignments => (ASSIGNMENT_SELECT_SQL, "a"),
        Collection::StudySessions => (SESSION_SELECT_SQL, "s"),
    };
    let mut stmt = conn.prepare(&format!(
        "{select} WHERE {alias}.id = ?1 AND {alias}.owner_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), ctx.owner_id().to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(collection, row)?));
    }

    Ok(None)
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let color_text: String = row.get("color")?;
    let color = CourseColor::parse(&color_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid color `{color_text}` in courses.color"))
    })?;

    let credits_value: i64 = row.get("credits")?;
    let credits = u8::try_from(credits_value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid credits value `{credits_value}` in courses.credits"
        ))
    })?;

    let course = Course {
        id: parse_uuid(row, "id", "courses.id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        instructor: row.get("instructor")?,
        schedule: row.get("schedule")?,
        credits,
        color,
    };
    course.validate()?;
    Ok(course)
}

fn parse_item_row(collection: Collection, row: &Row<'_>) -> RepoResult<DatedItem> {
    let table = collection.as_str();
    let detail = match collection {
        Collection::Assignments => {
            let priority_text: String = row.get("priority")?;
            let priority = Priority::parse(&priority_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid priority `{priority_text}` in assignments.priority"
                ))
            })?;
            let completed = match row.get::<_, i64>("completed")? {
                0 => false,
                1 => true,
                other => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid completed value `{other}` in assignments.completed"
                    )));
                }
            };
            ItemDetail::Assignment(AssignmentDetail {
                due: parse_instant(row, "due_at", "assignments.due_at")?,
                completed,
                priority,
            })
        }
        Collection::StudySessions => ItemDetail::StudySession(StudySessionDetail {
            start: parse_instant(row, "start_at", "study_sessions.start_at")?,
            end: parse_instant(row, "end_at", "study_sessions.end_at")?,
            location: row.get("location")?,
        }),
    };

    let course = match row.get::<_, Option<String>>("course_code")? {
        Some(code) => {
            let color_text: String = row.get("course_color")?;
            let color = CourseColor::parse(&color_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid color `{color_text}` in courses.color"))
            })?;
            Some(CourseInfo {
                code,
                name: row.get("course_name")?,
                color,
            })
        }
        None => None,
    };

    let item = DatedItem {
        id: parse_uuid(row, "id", &format!("{table}.id"))?,
        title: row.get("title")?,
        description: row.get("description")?,
        course_id: parse_uuid(row, "course_id", &format!("{table}.course_id"))?,
        course,
        detail,
    };
    item.validate()?;
    Ok(item)
}

fn parse_meeting_row(row: &Row<'_>) -> RepoResult<ClassMeeting> {
    let weekday_value: i64 = row.get("weekday")?;
    let weekday = weekday_from_db(weekday_value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid weekday `{weekday_value}` in class_meetings.weekday"
        ))
    })?;

    let meeting = ClassMeeting {
        id: parse_uuid(row, "id", "class_meetings.id")?,
        course_id: parse_uuid(row, "course_id", "class_meetings.course_id")?,
        weekday,
        start: parse_minute(row, "start_minute")?,
        end: parse_minute(row, "end_minute")?,
        location: row.get("location")?,
    };
    meeting.validate()?;
    Ok(meeting)
}

fn parse_uuid(row: &Row<'_>, column: &str, label: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {label}")))
}

fn parse_instant(row: &Row<'_>, column: &str, label: &str) -> RepoResult<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{millis}` in {label}"))
    })
}

fn parse_minute(row: &Row<'_>, column: &str) -> RepoResult<NaiveTime> {
    let minute: i64 = row.get(column)?;
    u32::try_from(minute)
        .ok()
        .and_then(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid minute `{minute}` in class_meetings.{column}"
            ))
        })
}

fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour() * 60 + time.minute())
}

fn weekday_from_db(value: i64) -> Option<Weekday> {
    match value {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
