//! Core domain logic for the studydash student dashboard.
//! This crate is the single source of truth for item invariants and the
//! temporal aggregation (buckets, countdowns, filters) built on them.

pub mod agenda;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod timetable;

pub use agenda::{
    classify, countdown_label, due_label, filter_items, nearest_pending, Bucket,
    CountdownTicker, FilterConfig, ItemView,
};
pub use config::DashboardConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::course::{Course, CourseColor, CourseId, CourseInfo};
pub use model::item::{Collection, DatedItem, ItemDetail, ItemId, ItemKind, ItemPatch, Priority};
pub use model::meeting::{ClassMeeting, MeetingId};
pub use model::user::{OwnerId, UserContext};
pub use repo::{
    ItemListQuery, MemoryRecordStore, RecordStore, RepoError, RepoResult, SortOrder,
    SqliteRecordStore,
};
pub use service::course_service::{CourseService, NewCourse, NewMeeting};
pub use service::dashboard::{Dashboard, DashboardSummary, Notice, NoticeLevel};
pub use service::item_service::{ItemService, NewAssignment, NewStudySession};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
