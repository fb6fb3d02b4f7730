use chrono::{DateTime, Utc};
use thiserror::Error;

/// Whether a session is live. Sessions are single use, once ended they stay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Active,
    Ended {
        ended_at: DateTime<Utc>,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Session already ended at {0}")]
pub struct AlreadyEnded(pub DateTime<Utc>);

impl SessionState {
    pub fn end(self, now: DateTime<Utc>) -> Result<Self, AlreadyEnded> {
        match self {
            Self::Active => Ok(Self::Ended { ended_at: now }),
            Self::Ended { ended_at } => Err(AlreadyEnded(ended_at)),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Ended { ended_at } => Some(*ended_at),
        }
    }

    /// Rebuilds the state from its stored columns
    pub fn from_columns(is_active: bool, ended_at: Option<DateTime<Utc>>) -> Option<Self> {
        match (is_active, ended_at) {
            (true, None) => Some(Self::Active),
            (false, Some(ended_at)) => Some(Self::Ended { ended_at }),
            _ => None,
        }
    }
}
