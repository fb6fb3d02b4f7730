use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;

use crate::{
    Database, DatabaseError, DatabaseResult, InvitationData, InvitationStatus, NewInvitation,
    NewSession, NewUser, PrimaryKey, Result, SessionData, UpdatedSession, UserData,
};

/// An in-memory database implementation for tandem.
///
/// Each record lives behind its own map entry, so updates are atomic per record
/// the same way they are in a document store.
pub struct MemoryDatabase {
    next_id: AtomicCell<PrimaryKey>,

    users: DashMap<PrimaryKey, UserData>,
    invitations: DashMap<PrimaryKey, InvitationData>,
    sessions: DashMap<PrimaryKey, SessionData>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            next_id: AtomicCell::new(1),
            users: Default::default(),
            invitations: Default::default(),
            sessions: Default::default(),
        }
    }

    fn next_id(&self) -> PrimaryKey {
        self.next_id.fetch_add(1)
    }

    fn with_user<T>(
        &self,
        user_id: PrimaryKey,
        f: impl FnOnce(&mut UserData) -> T,
    ) -> Result<T> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        Ok(f(user.value_mut()))
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.with_user(user_id, |user| user.clone())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let existing = self
            .users
            .iter()
            .find(|u| u.username == new_user.username)
            .map(|u| u.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            });

        existing.conflict_or_ok("user", "username", &new_user.username)?;

        let user = UserData {
            id: self.next_id(),
            username: new_user.username,
            display_name: new_user.display_name,
            friend_ids: Default::default(),
            active_session_id: None,
            inbound_invitation_ids: Default::default(),
        };

        self.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn create_friendship(&self, user_id: PrimaryKey, friend_id: PrimaryKey) -> Result<()> {
        // Ensure both exist before touching either
        let _ = self.user_by_id(friend_id).await?;

        self.with_user(user_id, |user| user.friend_ids.insert(friend_id))?;
        self.with_user(friend_id, |friend| friend.friend_ids.insert(user_id))?;

        Ok(())
    }

    async fn set_active_session(
        &self,
        user_id: PrimaryKey,
        session_id: Option<PrimaryKey>,
    ) -> Result<UserData> {
        self.with_user(user_id, |user| {
            user.active_session_id = session_id;
            user.clone()
        })
    }

    async fn add_inbound_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<()> {
        self.with_user(user_id, |user| {
            user.inbound_invitation_ids.insert(invitation_id);
        })
    }

    async fn remove_inbound_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<()> {
        self.with_user(user_id, |user| {
            user.inbound_invitation_ids.remove(&invitation_id);
        })
    }

    async fn invitation_by_id(&self, invitation_id: PrimaryKey) -> Result<InvitationData> {
        self.invitations
            .get(&invitation_id)
            .map(|i| i.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "invitation",
                identifier: "id",
            })
    }

    async fn create_invitation(&self, new_invitation: NewInvitation) -> Result<InvitationData> {
        // Ensure both ends exist
        let _ = self.user_by_id(new_invitation.from_id).await?;
        let _ = self.user_by_id(new_invitation.to_id).await?;

        let invitation = InvitationData {
            id: self.next_id(),
            from_id: new_invitation.from_id,
            to_id: new_invitation.to_id,
            status: InvitationStatus::Pending,
            created_at: new_invitation.created_at,
            expires_at: new_invitation.expires_at,
        };

        self.invitations.insert(invitation.id, invitation.clone());

        Ok(invitation)
    }

    async fn pending_invitation_between(
        &self,
        from_id: PrimaryKey,
        to_id: PrimaryKey,
    ) -> Result<InvitationData> {
        self.invitations
            .iter()
            .filter(|i| {
                i.from_id == from_id && i.to_id == to_id && i.status == InvitationStatus::Pending
            })
            .max_by_key(|i| (i.created_at, i.id))
            .map(|i| i.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "invitation",
                identifier: "from_id:to_id:status",
            })
    }

    async fn pending_invitations_to(&self, to_id: PrimaryKey) -> Result<Vec<InvitationData>> {
        Ok(self
            .invitations
            .iter()
            .filter(|i| i.to_id == to_id && i.status == InvitationStatus::Pending)
            .map(|i| i.clone())
            .collect())
    }

    async fn update_invitation_status(
        &self,
        invitation_id: PrimaryKey,
        status: InvitationStatus,
    ) -> Result<InvitationData> {
        let mut invitation =
            self.invitations
                .get_mut(&invitation_id)
                .ok_or(DatabaseError::NotFound {
                    resource: "invitation",
                    identifier: "id",
                })?;

        invitation.status = status;

        Ok(invitation.clone())
    }

    async fn clear_expired_invitations(&self, before: DateTime<Utc>) -> Result<u64> {
        let expired: Vec<_> = self
            .invitations
            .iter()
            .filter(|i| i.expires_at < before)
            .map(|i| (i.id, i.to_id))
            .collect();

        for (invitation_id, to_id) in &expired {
            self.invitations.remove(invitation_id);

            if let Some(mut user) = self.users.get_mut(to_id) {
                user.inbound_invitation_ids.remove(invitation_id);
            }
        }

        Ok(expired.len() as u64)
    }

    async fn session_by_id(&self, session_id: PrimaryKey) -> Result<SessionData> {
        self.sessions
            .get(&session_id)
            .map(|s| s.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "id",
            })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let session = SessionData {
            id: self.next_id(),
            host_id: new_session.host_id,
            participant_ids: new_session.participant_ids,
            current_track: None,
            queue: vec![],
            playback: new_session.playback,
            state: Default::default(),
            created_at: new_session.created_at,
        };

        self.sessions.insert(session.id, session.clone());

        Ok(session)
    }

    async fn update_session(&self, updated_session: UpdatedSession) -> Result<SessionData> {
        let mut session =
            self.sessions
                .get_mut(&updated_session.id)
                .ok_or(DatabaseError::NotFound {
                    resource: "session",
                    identifier: "id",
                })?;

        updated_session.apply_to(&mut session);

        Ok(session.clone())
    }
}
