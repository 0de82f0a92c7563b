use std::fmt::Display;

use serde::Serialize;

use super::chat::PublishError;
use super::domain::{ApplicantId, JobId};
use super::repository::RepositoryError;

/// Error raised by the marketplace services.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },
    #[error("applicant {applicant} has already applied to job {job}")]
    Duplicate { applicant: ApplicantId, job: JobId },
    #[error("email {0} is already registered")]
    EmailTaken(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Coarse classification so callers branch on kind rather than message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    Unauthorized,
    Conflict,
    Internal,
}

impl MarketplaceError {
    pub fn not_found(resource: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketplaceError::NotFound { .. } => ErrorKind::NotFound,
            MarketplaceError::Duplicate { .. } | MarketplaceError::EmailTaken(_) => {
                ErrorKind::Duplicate
            }
            MarketplaceError::Unauthorized(_) => ErrorKind::Unauthorized,
            MarketplaceError::Conflict(_) => ErrorKind::Conflict,
            MarketplaceError::Repository(_) | MarketplaceError::Publish(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_internal() {
        let err = MarketplaceError::from(RepositoryError::Unavailable("offline".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = MarketplaceError::not_found("chat room", 42);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "chat room 42 not found");
    }
}
