mod state;

use std::collections::BTreeSet;

use log::{error, info, warn};

pub use state::*;

use crate::{
    events::{CollabEvent, EndReason},
    CollabContext, CollabError, CollabResult, Database, DatabaseError, NewSession,
    PlaybackState, PrimaryKey, SessionData, UpdatedSession,
};

/// The smallest number of participants an active session can have
const MIN_PARTICIPANTS: usize = 2;

/// Owns the session lifecycle and every user's active session pointer.
/// Nothing else in the system writes the pointer.
pub struct SessionManager<Db: ?Sized> {
    context: CollabContext<Db>,
}

impl<Db> SessionManager<Db>
where
    Db: Database + ?Sized,
{
    pub fn new(context: &CollabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Starts a session between two users, ending whatever sessions they were in before.
    /// The caller is expected to have validated that the users may start a session.
    pub async fn start(
        &self,
        host_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> CollabResult<SessionData> {
        let db = &self.context.database;

        let host = db.user_by_id(host_id).await?;
        let participant = db.user_by_id(participant_id).await?;

        // A user is only ever bound to one active session
        let previous: BTreeSet<_> = [host.active_session_id, participant.active_session_id]
            .into_iter()
            .flatten()
            .collect();

        for session_id in previous {
            self.supersede(session_id).await?;
        }

        let now = self.context.now();
        let session = db
            .create_session(NewSession {
                host_id,
                participant_ids: [host_id, participant_id].into(),
                playback: PlaybackState::initial(now),
                created_at: now,
            })
            .await?;

        // Host first, then participant. Stopping in between leaves a session nobody can rely on.
        for user_id in [host_id, participant_id] {
            if let Err(e) = db.set_active_session(user_id, Some(session.id)).await {
                let error = CollabError::MembershipIncomplete {
                    session_id: session.id,
                    reason: format!("pointer of user {user_id} was not set: {e}"),
                };

                error!("{}", error);
                return Err(error);
            }
        }

        info!(
            "Session {} started by {} with {}",
            session.id, host.display_name, participant.display_name
        );

        self.context.emit(CollabEvent::SessionStarted {
            session_id: session.id,
            host_id,
            participant_id,
        });

        Ok(session)
    }

    /// Removes a user from a session.
    /// If the host leaves or fewer than two participants would remain, the session ends.
    ///
    /// Returns the session only if the user was part of it. Leaving a session
    /// the user is not part of just releases their pointer.
    pub async fn leave(
        &self,
        session_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<Option<SessionData>> {
        let session = self.context.database.session_by_id(session_id).await?;
        let was_member = session.has_participant(user_id);

        let mut remaining = session.participant_ids.clone();
        remaining.remove(&user_id);

        // A host alone has nobody to listen with
        let ends_session = session.is_active()
            && (session.is_host(user_id)
                || session.has_participant(user_id) && remaining.len() < MIN_PARTICIPANTS);

        let session = if ends_session {
            let reason = if session.is_host(user_id) {
                EndReason::HostLeft
            } else {
                EndReason::Deserted
            };

            let ended = self.end_session(&session, remaining.clone(), reason).await?;
            self.release_pointers(remaining, session_id).await;

            ended
        } else if session.is_active() && session.has_participant(user_id) {
            let updated = self
                .context
                .database
                .update_session(UpdatedSession {
                    participant_ids: Some(remaining),
                    ..UpdatedSession::new(session_id)
                })
                .await?;

            info!("User {} left session {}", user_id, session_id);

            self.context.emit(CollabEvent::UserLeft {
                session_id,
                user_id,
            });

            updated
        } else {
            session
        };

        self.release_pointer(user_id, session_id).await?;

        Ok(was_member.then_some(session))
    }

    /// Ends a session on behalf of its host
    pub async fn end(
        &self,
        session_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<SessionData> {
        let session = self.context.database.session_by_id(session_id).await?;

        if !session.is_host(user_id) {
            return Err(CollabError::Forbidden(
                "only the host can end the session".to_string(),
            ));
        }

        if !session.is_active() {
            return Ok(session);
        }

        let participants = session.participant_ids.clone();
        let ended = self
            .end_session(&session, participants.clone(), EndReason::Ended)
            .await?;

        self.release_pointers(participants, session_id).await;

        Ok(ended)
    }

    /// Returns the session the user is currently in, if any.
    /// A pointer to a session that is no longer active is cleared on the way.
    pub async fn active(&self, user_id: PrimaryKey) -> CollabResult<Option<SessionData>> {
        let db = &self.context.database;
        let user = db.user_by_id(user_id).await?;

        let Some(session_id) = user.active_session_id else {
            return Ok(None);
        };

        let session = match db.session_by_id(session_id).await {
            Ok(session) => Some(session),
            Err(DatabaseError::NotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        match session {
            Some(session) if session.is_active() && session.has_participant(user_id) => {
                Ok(Some(session))
            }
            _ => {
                info!(
                    "Clearing stale session {} from user {}",
                    session_id, user_id
                );
                db.set_active_session(user_id, None).await?;

                Ok(None)
            }
        }
    }

    /// Returns a session to one of its participants
    pub async fn get(
        &self,
        session_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<SessionData> {
        let session = self.context.database.session_by_id(session_id).await?;

        if !session.has_participant(user_id) {
            return Err(CollabError::Forbidden(
                "user is not a participant of this session".to_string(),
            ));
        }

        Ok(session)
    }

    /// Ends a session because one of its members moved on to a new one
    async fn supersede(&self, session_id: PrimaryKey) -> CollabResult<()> {
        let session = match self.context.database.session_by_id(session_id).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if session.is_active() {
            let participants = session.participant_ids.clone();
            self.end_session(&session, participants, EndReason::Superseded)
                .await?;
        }

        Ok(())
    }

    async fn end_session(
        &self,
        session: &SessionData,
        participant_ids: BTreeSet<PrimaryKey>,
        reason: EndReason,
    ) -> CollabResult<SessionData> {
        let state = session.state.end(self.context.now())?;

        let ended = self
            .context
            .database
            .update_session(UpdatedSession {
                participant_ids: Some(participant_ids),
                state: Some(state),
                ..UpdatedSession::new(session.id)
            })
            .await?;

        info!("Session {} ended ({:?})", session.id, reason);

        self.context.emit(CollabEvent::SessionEnded {
            session_id: session.id,
            reason,
        });

        Ok(ended)
    }

    /// Clears the user's pointer if it still points at the given session.
    /// A pointer to a newer session is left alone.
    async fn release_pointer(&self, user_id: PrimaryKey, session_id: PrimaryKey) -> CollabResult<()> {
        let db = &self.context.database;
        let user = db.user_by_id(user_id).await?;

        if user.active_session_id == Some(session_id) {
            db.set_active_session(user_id, None).await?;
        }

        Ok(())
    }

    async fn release_pointers(&self, user_ids: BTreeSet<PrimaryKey>, session_id: PrimaryKey) {
        for user_id in user_ids {
            // Whatever is missed here gets repaired on the next read
            if let Err(e) = self.release_pointer(user_id, session_id).await {
                warn!(
                    "Could not clear session {} from user {}: {}",
                    session_id, user_id, e
                );
            }
        }
    }
}

impl<Db: ?Sized> Clone for SessionManager<Db> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}
