//! Use-case services over the record store.
//!
//! # Responsibility
//! - Turn form input into validated records and store calls.
//! - Own the dashboard state and its derived views.
//! - Map store failures onto the `ServiceError` taxonomy.
//!
//! # Invariants
//! - Validation errors are raised before any store call.
//! - Every `ServiceError` is recoverable; callers keep their prior state.

use crate::model::course::CourseValidationError;
use crate::model::item::ItemValidationError;
use crate::model::meeting::MeetingValidationError;
use crate::repo::store::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod course_service;
pub mod dashboard;
pub mod item_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before it reached the store.
    Validation {
        field: &'static str,
        message: String,
    },
    /// The store failed to serve the request.
    Store(RepoError),
    /// Target record does not exist for the current owner.
    NotFound(Uuid),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// No service error is fatal; the caller may retry or correct input.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { field, message } => write!(f, "invalid {field}: {message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::InvalidItem(err) => err.into(),
            RepoError::InvalidCourse(err) => err.into(),
            RepoError::InvalidMeeting(err) => err.into(),
            RepoError::UnknownCourse(id) => {
                Self::validation("course_id", format!("course not found: {id}"))
            }
            other => Self::Store(other),
        }
    }
}

impl From<ItemValidationError> for ServiceError {
    fn from(value: ItemValidationError) -> Self {
        Self::validation(value.field(), value.to_string())
    }
}

impl From<CourseValidationError> for ServiceError {
    fn from(value: CourseValidationError) -> Self {
        Self::validation(value.field(), value.to_string())
    }
}

impl From<MeetingValidationError> for ServiceError {
    fn from(value: MeetingValidationError) -> Self {
        Self::validation(value.field(), value.to_string())
    }
}
