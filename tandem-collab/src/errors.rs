use std::fmt::Display;

use thiserror::Error;

use crate::{AlreadyEnded, DatabaseError, InvalidTransition, PrimaryKey};

pub type CollabResult<T> = Result<T, CollabError>;

/// Everything that can go wrong when interacting with invitations, sessions, and playback
#[derive(Debug, Error)]
pub enum CollabError {
    /// There is no authenticated caller
    #[error("Missing or invalid caller identity")]
    Unauthorized,
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// The caller is known, but not allowed to do this
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invitation expired")]
    Expired,
    #[error("Users cannot invite themselves")]
    SelfInvite,
    #[error("Users must be friends to start a session")]
    FriendshipRequired,
    #[error("A pending invitation to this user already exists")]
    DuplicatePending,
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The store could not be reached or the deadline passed
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    /// The session exists, but not every member points at it.
    /// This is fatal and should never be swallowed.
    #[error("Session {session_id} created but membership registration incomplete: {reason}")]
    MembershipIncomplete {
        session_id: PrimaryKey,
        reason: String,
    },
}

/// A stable, machine readable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    Forbidden,
    InvalidState,
    Expired,
    SelfInvite,
    FriendshipRequired,
    DuplicatePending,
    Validation,
    Unavailable,
    MembershipIncomplete,
}

impl CollabError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Expired => ErrorKind::Expired,
            Self::SelfInvite => ErrorKind::SelfInvite,
            Self::FriendshipRequired => ErrorKind::FriendshipRequired,
            Self::DuplicatePending => ErrorKind::DuplicatePending,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::MembershipIncomplete { .. } => ErrorKind::MembershipIncomplete,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidState => "invalid_state",
            Self::Expired => "expired",
            Self::SelfInvite => "self_invite",
            Self::FriendshipRequired => "friendship_required",
            Self::DuplicatePending => "duplicate_pending",
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
            Self::MembershipIncomplete => "membership_incomplete",
        }
    }

    /// Only an unreachable store is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DatabaseError> for CollabError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            // Invitations and sessions never use caller chosen keys,
            // so a conflict means the store and the caller disagree about state.
            DatabaseError::Conflict { .. } => Self::InvalidState(value.to_string()),
            DatabaseError::Internal(e) => Self::Unavailable(e.to_string()),
        }
    }
}

impl From<InvalidTransition> for CollabError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidState(value.to_string())
    }
}

impl From<AlreadyEnded> for CollabError {
    fn from(value: AlreadyEnded) -> Self {
        Self::InvalidState(value.to_string())
    }
}
