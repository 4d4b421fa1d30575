//! Domain model for courses, dated items and timetable slots.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep assignments and study sessions behind one shared item shape.
//!
//! # Invariants
//! - Every record is identified by a stable, non-nil UUID.
//! - Ownership is never stored on the model; stores scope it via `UserContext`.

pub mod course;
pub mod item;
pub mod meeting;
pub mod user;
