use std::fmt::Display;

use thiserror::Error;

use crate::PrimaryKey;

/// The lifecycle of an invitation.
/// Only [InvitationStatus::Pending] can transition, every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationStatus {
    Pending,
    /// The invitation was accepted and turned into a session
    Accepted {
        session_id: PrimaryKey,
    },
    Declined,
    Expired,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invitation cannot go from {from} to {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

impl InvitationStatus {
    pub fn accept(self, session_id: PrimaryKey) -> Result<Self, InvalidTransition> {
        self.transition(Self::Accepted { session_id })
    }

    pub fn decline(self) -> Result<Self, InvalidTransition> {
        self.transition(Self::Declined)
    }

    pub fn expire(self) -> Result<Self, InvalidTransition> {
        self.transition(Self::Expired)
    }

    fn transition(self, to: Self) -> Result<Self, InvalidTransition> {
        match self {
            Self::Pending => Ok(to),
            from => Err(InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The session created from this invitation, if it was accepted
    pub fn session_id(&self) -> Option<PrimaryKey> {
        match self {
            Self::Accepted { session_id } => Some(*session_id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted { .. } => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }

    /// Rebuilds a status from its stored columns.
    /// Returns None if the columns don't describe a valid status.
    pub fn from_columns(status: &str, session_id: Option<PrimaryKey>) -> Option<Self> {
        match (status, session_id) {
            ("pending", None) => Some(Self::Pending),
            ("accepted", Some(session_id)) => Some(Self::Accepted { session_id }),
            ("declined", None) => Some(Self::Declined),
            ("expired", None) => Some(Self::Expired),
            _ => None,
        }
    }
}

impl Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
