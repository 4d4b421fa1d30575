//! Record store contract and its backends.
//!
//! # Responsibility
//! - Define the owner-scoped data access contract (`RecordStore`).
//! - Isolate SQLite query details from services and the dashboard.
//! - Provide an in-memory backend for tests and offline use.
//!
//! # Invariants
//! - Store writes enforce model `validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`, `UnknownCourse`) in
//!   addition to transport errors.

pub mod memory_store;
pub mod sqlite_store;
pub mod store;

pub use memory_store::MemoryRecordStore;
pub use sqlite_store::SqliteRecordStore;
pub use store::{ItemListQuery, RecordStore, RepoError, RepoResult, SortOrder};
