use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{InvitationStatus, PlaybackState, SessionState, Track};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A tandem account, as seen through the user directory
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub display_name: String,
    pub friend_ids: BTreeSet<PrimaryKey>,
    /// The session this user believes they are part of.
    /// This is a cached pointer and may be stale, see [crate::SessionManager::active].
    pub active_session_id: Option<PrimaryKey>,
    /// Pending invitations addressed to this user
    pub inbound_invitation_ids: BTreeSet<PrimaryKey>,
}

impl UserData {
    pub fn is_friend_of(&self, other: PrimaryKey) -> bool {
        self.friend_ids.contains(&other)
    }
}

/// A time bounded offer from one user to another to start a session
#[derive(Debug, Clone, PartialEq)]
pub struct InvitationData {
    pub id: PrimaryKey,
    /// The inviter, who becomes the host on acceptance
    pub from_id: PrimaryKey,
    pub to_id: PrimaryKey,
    /// The stored status. Use [InvitationData::effective_status] when reading.
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl InvitationData {
    /// Returns true if the deadline has strictly passed
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The status every reader should observe.
    /// A pending invitation past its deadline is expired, even if the store hasn't caught up yet.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if self.is_past_deadline(now) => InvitationStatus::Expired,
            status => status,
        }
    }

    /// Returns true if the invitation can still be accepted or declined
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == InvitationStatus::Pending
    }
}

/// A shared listening session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The participant with exclusive write access to playback
    pub host_id: PrimaryKey,
    pub participant_ids: BTreeSet<PrimaryKey>,
    pub current_track: Option<Track>,
    pub queue: Vec<Track>,
    pub playback: PlaybackState,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.state.ended_at()
    }

    pub fn is_host(&self, user_id: PrimaryKey) -> bool {
        self.host_id == user_id
    }

    pub fn has_participant(&self, user_id: PrimaryKey) -> bool {
        self.participant_ids.contains(&user_id)
    }
}

/// What a participant sees when polling playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub host_id: PrimaryKey,
    pub current_track: Option<Track>,
    pub playback: PlaybackState,
    pub queue: Vec<Track>,
}

impl From<&SessionData> for PlaybackSnapshot {
    fn from(session: &SessionData) -> Self {
        Self {
            host_id: session.host_id,
            current_track: session.current_track.clone(),
            playback: session.playback.clone(),
            queue: session.queue.clone(),
        }
    }
}
