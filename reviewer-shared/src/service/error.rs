//! Domain errors raised by the assignment engine.

use crate::repository::StorageError;

/// Category of a [`ServiceError`], used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    PreconditionFailed,
    NoCandidate,
    Internal,
}

/// Error returned by every service operation
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("team already exists: {0}")]
    TeamExists(String),

    #[error("team not found: {0}")]
    TeamNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("author not found: {0}")]
    AuthorNotFound(String),

    #[error("pull request already exists: {0}")]
    PullRequestExists(String),

    #[error("pull request not found: {0}")]
    PullRequestNotFound(String),

    #[error("cannot reassign on merged pull request: {0}")]
    PullRequestMerged(String),

    #[error("reviewer {reviewer_id} is not assigned to pull request {pr_id}")]
    NotAssigned { pr_id: String, reviewer_id: String },

    #[error("no active replacement candidate in team")]
    NoCandidate,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::TeamNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::AuthorNotFound(_)
            | ServiceError::PullRequestNotFound(_) => ErrorKind::NotFound,
            ServiceError::TeamExists(_) | ServiceError::PullRequestExists(_) => {
                ErrorKind::AlreadyExists
            }
            ServiceError::PullRequestMerged(_) => ErrorKind::InvalidState,
            ServiceError::NotAssigned { .. } => ErrorKind::PreconditionFailed,
            ServiceError::NoCandidate => ErrorKind::NoCandidate,
            ServiceError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code (e.g. "pr_merged")
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::TeamExists(_) => "team_exists",
            ServiceError::TeamNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::AuthorNotFound(_)
            | ServiceError::PullRequestNotFound(_) => "not_found",
            ServiceError::PullRequestExists(_) => "pr_exists",
            ServiceError::PullRequestMerged(_) => "pr_merged",
            ServiceError::NotAssigned { .. } => "not_assigned",
            ServiceError::NoCandidate => "no_candidate",
            ServiceError::Storage(_) => "internal_error",
        }
    }
}

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ServiceError::TeamExists("a".into()).kind(), ErrorKind::AlreadyExists);
        assert_eq!(ServiceError::PullRequestExists("p".into()).kind(), ErrorKind::AlreadyExists);
        assert_eq!(ServiceError::AuthorNotFound("u".into()).kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::PullRequestMerged("p".into()).kind(), ErrorKind::InvalidState);
        assert_eq!(ServiceError::NoCandidate.kind(), ErrorKind::NoCandidate);
        assert_eq!(
            ServiceError::NotAssigned {
                pr_id: "p".into(),
                reviewer_id: "u".into()
            }
            .kind(),
            ErrorKind::PreconditionFailed
        );

        let storage = ServiceError::from(StorageError::Unavailable("down".into()));
        assert_eq!(storage.kind(), ErrorKind::Internal);
        assert_eq!(storage.code(), "internal_error");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ServiceError::NoCandidate.to_string(),
            "no active replacement candidate in team"
        );
        assert_eq!(
            ServiceError::NotAssigned {
                pr_id: "pr-1".into(),
                reviewer_id: "u3".into()
            }
            .to_string(),
            "reviewer u3 is not assigned to pull request pr-1"
        );
    }
}
