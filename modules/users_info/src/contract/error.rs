use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsersInfoError {
    #[error("User {id} doesn't exist")]
    NotFound { id: u64 },

    #[error("Internal error")]
    Internal,
}

impl UsersInfoError {
    pub fn not_found(id: u64) -> Self {
        Self::NotFound { id }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for UsersInfoError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            UserNotFound { id } => Self::not_found(id),
            Storage { .. } => Self::internal(),
        }
    }
}
