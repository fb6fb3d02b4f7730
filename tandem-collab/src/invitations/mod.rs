mod status;

use log::info;

pub use status::*;

use crate::{
    events::CollabEvent, CollabContext, CollabError, CollabResult, Database, DatabaseError,
    InvitationData, NewInvitation, PrimaryKey, SessionData, SessionManager,
};

/// Keeps track of invitations between friends and turns accepted ones into sessions
pub struct InvitationLedger<Db: ?Sized> {
    context: CollabContext<Db>,
    sessions: SessionManager<Db>,
}

/// The result of accepting an invitation
#[derive(Debug, Clone)]
pub struct AcceptedInvitation {
    pub invitation: InvitationData,
    pub session: SessionData,
}

impl<Db> InvitationLedger<Db>
where
    Db: Database + ?Sized,
{
    pub fn new(context: &CollabContext<Db>, sessions: &SessionManager<Db>) -> Self {
        Self {
            context: context.clone(),
            sessions: sessions.clone(),
        }
    }

    /// Invites a friend to start a session
    pub async fn create(
        &self,
        from_id: PrimaryKey,
        to_id: PrimaryKey,
    ) -> CollabResult<InvitationData> {
        if from_id == to_id {
            return Err(CollabError::SelfInvite);
        }

        let db = &self.context.database;
        let recipient = db.user_by_id(to_id).await?;

        if !db.is_friend(from_id, to_id).await? {
            return Err(CollabError::FriendshipRequired);
        }

        let now = self.context.now();

        match db.pending_invitation_between(from_id, to_id).await {
            Ok(existing) if existing.is_open(now) => return Err(CollabError::DuplicatePending),
            // Stored as pending but past its deadline, so it no longer counts
            Ok(existing) => self.expire(&existing).await?,
            Err(DatabaseError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let invitation = db
            .create_invitation(NewInvitation {
                from_id,
                to_id,
                created_at: now,
                expires_at: now + self.context.config.invitation_ttl,
            })
            .await?;

        db.add_inbound_invitation(to_id, invitation.id).await?;

        info!(
            "User {} invited {} (invitation {})",
            from_id, recipient.display_name, invitation.id
        );

        self.context.emit(CollabEvent::InvitationCreated {
            invitation_id: invitation.id,
            from_id,
            to_id,
        });

        Ok(invitation)
    }

    /// Returns the invitations a user can still answer, newest first
    pub async fn list_pending(&self, user_id: PrimaryKey) -> CollabResult<Vec<InvitationData>> {
        let db = &self.context.database;

        // Ensure the user exists
        let _ = db.user_by_id(user_id).await?;

        let now = self.context.now();
        let mut invitations: Vec<_> = db
            .pending_invitations_to(user_id)
            .await?
            .into_iter()
            .filter(|i| i.is_open(now))
            .collect();

        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(invitations)
    }

    /// Accepts an invitation on behalf of its recipient, starting a session with the inviter as host
    pub async fn accept(
        &self,
        invitation_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<AcceptedInvitation> {
        let db = &self.context.database;
        let invitation = self.answerable_by(invitation_id, user_id).await?;

        if invitation.status.is_terminal() {
            return Err(CollabError::InvalidState(format!(
                "invitation is already {}",
                invitation.status
            )));
        }

        if invitation.is_past_deadline(self.context.now()) {
            self.expire(&invitation).await?;
            return Err(CollabError::Expired);
        }

        let session = self
            .sessions
            .start(invitation.from_id, invitation.to_id)
            .await?;

        let status = invitation.status.accept(session.id)?;
        let invitation = db.update_invitation_status(invitation.id, status).await?;

        db.remove_inbound_invitation(invitation.to_id, invitation.id)
            .await?;

        info!("Invitation {} accepted", invitation.id);

        self.context.emit(CollabEvent::InvitationAccepted {
            invitation_id: invitation.id,
            session_id: session.id,
        });

        Ok(AcceptedInvitation {
            invitation,
            session,
        })
    }

    /// Declines an invitation on behalf of its recipient.
    /// Declining one that just went past its deadline is fine.
    pub async fn decline(
        &self,
        invitation_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<InvitationData> {
        let db = &self.context.database;
        let invitation = self.answerable_by(invitation_id, user_id).await?;

        // Already out of time, nothing left to decline
        if invitation.status == InvitationStatus::Expired {
            db.remove_inbound_invitation(invitation.to_id, invitation.id)
                .await?;

            return Ok(invitation);
        }

        let status = invitation.status.decline()?;
        let invitation = db.update_invitation_status(invitation.id, status).await?;

        db.remove_inbound_invitation(invitation.to_id, invitation.id)
            .await?;

        info!("Invitation {} declined", invitation.id);

        self.context.emit(CollabEvent::InvitationDeclined {
            invitation_id: invitation.id,
        });

        Ok(invitation)
    }

    /// Loads an invitation, ensuring the user is the one it was sent to
    async fn answerable_by(
        &self,
        invitation_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<InvitationData> {
        let invitation = self.context.database.invitation_by_id(invitation_id).await?;

        if invitation.to_id != user_id {
            return Err(CollabError::Forbidden(
                "only the recipient can answer an invitation".to_string(),
            ));
        }

        Ok(invitation)
    }

    /// Persists that an invitation ran out of time
    async fn expire(&self, invitation: &InvitationData) -> CollabResult<()> {
        let db = &self.context.database;
        let status = invitation.status.expire()?;

        db.update_invitation_status(invitation.id, status).await?;
        db.remove_inbound_invitation(invitation.to_id, invitation.id)
            .await?;

        info!("Invitation {} expired", invitation.id);

        self.context.emit(CollabEvent::InvitationExpired {
            invitation_id: invitation.id,
        });

        Ok(())
    }
}
