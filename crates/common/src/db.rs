//! Shared database types for Carebase
//!
//! This module provides common database-related types used across domain repositories.

use crate::error::Error;
use thiserror::Error;

/// Database-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Roster changed concurrently: {0}")]
    RosterConflict(String),

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Error::NotFound("Record not found".to_string()),
            // Constraint violations are storage internals; the detail stays in
            // the error for the server-side log, the status maps to 500.
            RepositoryError::UniqueViolation(detail) => {
                Error::Internal(format!("unique constraint violated: {}", detail))
            }
            RepositoryError::RosterConflict(msg) => Error::Conflict(msg),
            RepositoryError::Connection(e) => Error::Database(e),
            RepositoryError::InvalidData(msg) => Error::Validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_not_found_maps_to_404() {
        let err: Error = RepositoryError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unique_violation_maps_to_500() {
        let err: Error = RepositoryError::UniqueViolation("teams_team_name_key".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_roster_conflict_maps_to_409() {
        let err: Error = RepositoryError::RosterConflict("lost the race".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
