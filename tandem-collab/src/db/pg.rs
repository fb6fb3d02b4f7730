use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, types::Json, Error as SqlxError,
    FromRow, PgPool,
};

use crate::{
    Database, DatabaseError, DatabaseResult, IntoDatabaseError, InvitationData, InvitationStatus,
    NewInvitation, NewSession, NewUser, PlaybackState, PrimaryKey, Result, SessionData,
    SessionState, Track, UpdatedSession, UserData,
};

/// A postgres database implementation for tandem
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    display_name: String,
    active_session_id: Option<PrimaryKey>,
}

#[derive(FromRow)]
struct InvitationRow {
    id: PrimaryKey,
    from_id: PrimaryKey,
    to_id: PrimaryKey,
    status: String,
    session_id: Option<PrimaryKey>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    host_id: PrimaryKey,
    participant_ids: Vec<PrimaryKey>,
    current_track: Option<Json<Track>>,
    queue: Json<Vec<Track>>,
    position: f64,
    is_playing: bool,
    playback_updated_at: DateTime<Utc>,
    is_active: bool,
    ended_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PgDatabase {
    /// Connects to the database and brings the schema up to date
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn ensure_user(&self, user_id: PrimaryKey) -> Result<()> {
        query_scalar::<_, PrimaryKey>("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))
            .map(|_| ())
    }

    async fn user_by_username(&self, username: &str) -> Result<PrimaryKey> {
        query_scalar("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let row: UserRow = query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        let friend_ids: Vec<PrimaryKey> =
            query_scalar("SELECT friend_id FROM friendships WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        let inbound_invitation_ids: Vec<PrimaryKey> =
            query_scalar("SELECT invitation_id FROM inbound_invitations WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        Ok(UserData {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            friend_ids: friend_ids.into_iter().collect(),
            active_session_id: row.active_session_id,
            inbound_invitation_ids: inbound_invitation_ids.into_iter().collect(),
        })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        let id: PrimaryKey = query_scalar(
            "INSERT INTO users (username, display_name) VALUES ($1, $2) RETURNING id",
        )
        .bind(&new_user.username)
        .bind(&new_user.display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(id).await
    }

    async fn create_friendship(&self, user_id: PrimaryKey, friend_id: PrimaryKey) -> Result<()> {
        self.ensure_user(user_id).await?;
        self.ensure_user(friend_id).await?;

        query(
            "INSERT INTO friendships (user_id, friend_id) VALUES ($1, $2), ($2, $1)
            ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn set_active_session(
        &self,
        user_id: PrimaryKey,
        session_id: Option<PrimaryKey>,
    ) -> Result<UserData> {
        query_scalar::<_, PrimaryKey>(
            "UPDATE users SET active_session_id = $1 WHERE id = $2 RETURNING id",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("user", "id"))?;

        self.user_by_id(user_id).await
    }

    async fn add_inbound_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<()> {
        self.ensure_user(user_id).await?;

        query(
            "INSERT INTO inbound_invitations (user_id, invitation_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(invitation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn remove_inbound_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<()> {
        self.ensure_user(user_id).await?;

        query("DELETE FROM inbound_invitations WHERE user_id = $1 AND invitation_id = $2")
            .bind(user_id)
            .bind(invitation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn invitation_by_id(&self, invitation_id: PrimaryKey) -> Result<InvitationData> {
        query_as::<_, InvitationRow>("SELECT * FROM invitations WHERE id = $1")
            .bind(invitation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("invitation", "id"))?
            .try_into()
    }

    async fn create_invitation(&self, new_invitation: NewInvitation) -> Result<InvitationData> {
        query_as::<_, InvitationRow>(
            "INSERT INTO invitations (from_id, to_id, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new_invitation.from_id)
        .bind(new_invitation.to_id)
        .bind(InvitationStatus::Pending.as_str())
        .bind(new_invitation.created_at)
        .bind(new_invitation.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn pending_invitation_between(
        &self,
        from_id: PrimaryKey,
        to_id: PrimaryKey,
    ) -> Result<InvitationData> {
        query_as::<_, InvitationRow>(
            "SELECT * FROM invitations
            WHERE from_id = $1 AND to_id = $2 AND status = 'pending'
            ORDER BY created_at DESC, id DESC
            LIMIT 1",
        )
        .bind(from_id)
        .bind(to_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("invitation", "from_id:to_id"))?
        .try_into()
    }

    async fn pending_invitations_to(&self, to_id: PrimaryKey) -> Result<Vec<InvitationData>> {
        let rows: Vec<InvitationRow> =
            query_as("SELECT * FROM invitations WHERE to_id = $1 AND status = 'pending'")
                .bind(to_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_invitation_status(
        &self,
        invitation_id: PrimaryKey,
        status: InvitationStatus,
    ) -> Result<InvitationData> {
        query_as::<_, InvitationRow>(
            "UPDATE invitations SET status = $1, session_id = $2 WHERE id = $3 RETURNING *",
        )
        .bind(status.as_str())
        .bind(status.session_id())
        .bind(invitation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("invitation", "id"))?
        .try_into()
    }

    async fn clear_expired_invitations(&self, before: DateTime<Utc>) -> Result<u64> {
        // Inbound references go with them through the foreign key
        query("DELETE FROM invitations WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|r| r.rows_affected())
    }

    async fn session_by_id(&self, session_id: PrimaryKey) -> Result<SessionData> {
        query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "id"))?
            .try_into()
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let participant_ids: Vec<_> = new_session.participant_ids.into_iter().collect();
        let playback = new_session.playback;

        query_as::<_, SessionRow>(
            "INSERT INTO sessions
                (host_id, participant_ids, position, is_playing, playback_updated_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(new_session.host_id)
        .bind(participant_ids)
        .bind(playback.position)
        .bind(playback.is_playing)
        .bind(playback.updated_at)
        .bind(new_session.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn update_session(&self, updated_session: UpdatedSession) -> Result<SessionData> {
        let UpdatedSession {
            id,
            participant_ids,
            current_track,
            queue,
            playback,
            state,
        } = updated_session;

        let participant_ids = participant_ids.map(|ids| ids.into_iter().collect::<Vec<_>>());
        let (is_active, ended_at) = match state {
            Some(state) => (Some(state.is_active()), state.ended_at()),
            None => (None, None),
        };

        // Everything happens in one statement, so the row is never half written
        query_as::<_, SessionRow>(
            "UPDATE sessions SET
                participant_ids = COALESCE($1, participant_ids),
                current_track = COALESCE($2, current_track),
                queue = COALESCE($3, queue),
                position = COALESCE($4, position),
                is_playing = COALESCE($5, is_playing),
                playback_updated_at = COALESCE($6, playback_updated_at),
                is_active = COALESCE($7, is_active),
                ended_at = COALESCE($8, ended_at)
            WHERE id = $9 RETURNING *",
        )
        .bind(participant_ids)
        .bind(current_track.map(Json))
        .bind(queue.map(Json))
        .bind(playback.as_ref().map(|p| p.position))
        .bind(playback.as_ref().map(|p| p.is_playing))
        .bind(playback.as_ref().map(|p| p.updated_at))
        .bind(is_active)
        .bind(ended_at)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "id"))?
        .try_into()
    }
}

impl TryFrom<InvitationRow> for InvitationData {
    type Error = DatabaseError;

    fn try_from(row: InvitationRow) -> Result<Self> {
        let status = InvitationStatus::from_columns(&row.status, row.session_id)
            .ok_or_else(|| corrupt("invitation", row.id))?;

        Ok(Self {
            id: row.id,
            from_id: row.from_id,
            to_id: row.to_id,
            status,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

impl TryFrom<SessionRow> for SessionData {
    type Error = DatabaseError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let state = SessionState::from_columns(row.is_active, row.ended_at)
            .ok_or_else(|| corrupt("session", row.id))?;

        Ok(Self {
            id: row.id,
            host_id: row.host_id,
            participant_ids: row.participant_ids.into_iter().collect::<BTreeSet<_>>(),
            current_track: row.current_track.map(|t| t.0),
            queue: row.queue.0,
            playback: PlaybackState {
                position: row.position,
                is_playing: row.is_playing,
                updated_at: row.playback_updated_at,
            },
            state,
            created_at: row.created_at,
        })
    }
}

fn corrupt(resource: &str, id: PrimaryKey) -> DatabaseError {
    DatabaseError::Internal(format!("{resource} {id} has an inconsistent state").into())
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
