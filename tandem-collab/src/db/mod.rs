use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

use crate::{InvitationStatus, PlaybackState, SessionState, Track};

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Represents the user directory and record store tandem reads and writes.
///
/// Every mutation is atomic for the single record it touches, nothing more.
/// Concurrent writers to the same record resolve last-write-wins.
#[async_trait]
pub trait Database: Send + Sync {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    /// Makes two users friends with each other
    async fn create_friendship(&self, user_id: PrimaryKey, friend_id: PrimaryKey) -> Result<()>;
    async fn set_active_session(
        &self,
        user_id: PrimaryKey,
        session_id: Option<PrimaryKey>,
    ) -> Result<UserData>;
    async fn add_inbound_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<()>;
    /// Removes the invitation from the user's inbound set, doing nothing if it isn't there
    async fn remove_inbound_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<()>;

    async fn invitation_by_id(&self, invitation_id: PrimaryKey) -> Result<InvitationData>;
    async fn create_invitation(&self, new_invitation: NewInvitation) -> Result<InvitationData>;
    /// Returns the newest invitation stored as pending from one user to another
    async fn pending_invitation_between(
        &self,
        from_id: PrimaryKey,
        to_id: PrimaryKey,
    ) -> Result<InvitationData>;
    /// Returns every invitation stored as pending addressed to a user, in no particular order.
    /// Some of these may be past their deadline.
    async fn pending_invitations_to(&self, to_id: PrimaryKey) -> Result<Vec<InvitationData>>;
    async fn update_invitation_status(
        &self,
        invitation_id: PrimaryKey,
        status: InvitationStatus,
    ) -> Result<InvitationData>;
    /// Purges every invitation whose deadline is before the given time, returning how many were removed
    async fn clear_expired_invitations(&self, before: DateTime<Utc>) -> Result<u64>;

    async fn session_by_id(&self, session_id: PrimaryKey) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn update_session(&self, updated_session: UpdatedSession) -> Result<SessionData>;

    async fn is_friend(&self, user_id: PrimaryKey, other_id: PrimaryKey) -> Result<bool> {
        let user = self.user_by_id(user_id).await?;
        Ok(user.is_friend_of(other_id))
    }
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug)]
pub struct NewInvitation {
    pub from_id: PrimaryKey,
    pub to_id: PrimaryKey,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewSession {
    /// The host of the new session, who is also a participant
    pub host_id: PrimaryKey,
    pub participant_ids: BTreeSet<PrimaryKey>,
    pub playback: PlaybackState,
    pub created_at: DateTime<Utc>,
}

/// A partial update of a session, fields that are None are left alone
#[derive(Debug, Default)]
pub struct UpdatedSession {
    pub id: PrimaryKey,
    pub participant_ids: Option<BTreeSet<PrimaryKey>>,
    pub current_track: Option<Track>,
    pub queue: Option<Vec<Track>>,
    pub playback: Option<PlaybackState>,
    pub state: Option<SessionState>,
}

impl UpdatedSession {
    pub fn new(id: PrimaryKey) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Applies the update to an in memory copy of the record
    pub fn apply_to(self, session: &mut SessionData) {
        if let Some(participant_ids) = self.participant_ids {
            session.participant_ids = participant_ids;
        }

        if let Some(track) = self.current_track {
            session.current_track = Some(track);
        }

        if let Some(queue) = self.queue {
            session.queue = queue;
        }

        if let Some(playback) = self.playback {
            session.playback = playback;
        }

        if let Some(state) = self.state {
            session.state = state;
        }
    }
}
