//! Core use-case services.
//!
//! # Responsibility
//! - Expose the public operations of the venue registry, active event state
//!   machine, identity resolver and participation ledger.
//! - Validate input before any repository call.
//! - Convert repository failures into one tagged error type.
//!
//! # Invariants
//! - Every public operation returns `Result<_, ServiceError>`; failures are
//!   never reported as a successful value with a flag.
//! - Validation failures leave storage untouched.

use crate::model::event::EventValidationError;
use crate::model::person::PersonValidationError;
use crate::model::venue::VenueValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod event_service;
pub mod identity_service;
pub mod ledger_service;
pub mod venue_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Category of a `ServiceError`, for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Duplicate,
    NotFound,
    ReferentialConflict,
    InvalidArgument,
    Storage,
}

/// Failure returned across the service boundary.
#[derive(Debug)]
pub enum ServiceError {
    /// Bad input shape, length or format. Message tells the user what to fix.
    Validation(String),
    /// Name collides with an existing record.
    Duplicate(String),
    /// Referenced id does not exist.
    NotFound(String),
    /// Delete blocked by a live reference.
    ReferentialConflict(String),
    /// Programmer-supplied argument is out of range (e.g. non-positive id).
    InvalidArgument(String),
    /// Storage collaborator failed.
    Storage(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ReferentialConflict(_) => ErrorKind::ReferentialConflict,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Log-safe error code.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ReferentialConflict => "referential_conflict",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Storage => "storage",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message)
            | Self::Duplicate(message)
            | Self::NotFound(message)
            | Self::ReferentialConflict(message)
            | Self::InvalidArgument(message) => write!(f, "{message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            RepoError::Duplicate(message) => Self::Duplicate(format!("{message} already exists")),
            other => Self::Storage(other),
        }
    }
}

impl From<PersonValidationError> for ServiceError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<VenueValidationError> for ServiceError {
    fn from(value: VenueValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<EventValidationError> for ServiceError {
    fn from(value: EventValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::db::DbError;
    use crate::model::person::PersonValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_to_service_kinds() {
        let not_found: ServiceError = RepoError::NotFound {
            entity: "venue",
            id: 4,
        }
        .into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.to_string(), "venue not found: 4");

        let duplicate: ServiceError = RepoError::Duplicate("venue `Hall`".to_string()).into();
        assert_eq!(duplicate.kind(), ErrorKind::Duplicate);

        let storage: ServiceError =
            RepoError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery)).into();
        assert_eq!(storage.kind(), ErrorKind::Storage);
        assert_eq!(storage.code(), "storage");
    }

    #[test]
    fn validation_errors_keep_their_message() {
        let err: ServiceError = PersonValidationError::MissingSurname.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("surname"));
    }
}
