use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    events::CollabEvent, CollabContext, CollabError, CollabResult, Database, PlaybackSnapshot,
    PrimaryKey, Track, UpdatedSession,
};

/// The transport state of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// The position in the current track, in seconds
    pub position: f64,
    pub is_playing: bool,
    /// When the host last synced, regardless of what changed
    pub updated_at: DateTime<Utc>,
}

impl PlaybackState {
    /// Paused at the start
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            position: 0.,
            is_playing: false,
            updated_at: now,
        }
    }
}

/// A partial playback update sent by the host. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackPatch {
    pub position: Option<f64>,
    pub is_playing: Option<bool>,
    pub current_track: Option<Track>,
    pub queue: Option<Vec<Track>>,
}

impl PlaybackPatch {
    fn validate(&self) -> CollabResult<()> {
        if let Some(position) = self.position {
            if !is_seconds(position) {
                return Err(CollabError::Validation(format!(
                    "position must be a non-negative number of seconds, got {position}"
                )));
            }
        }

        let tracks = self.current_track.iter().chain(self.queue.iter().flatten());

        for track in tracks {
            match track.duration_seconds {
                Some(duration) if !is_seconds(duration) => {
                    return Err(CollabError::Validation(format!(
                        "track {} has an invalid duration of {duration}",
                        track.id
                    )))
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Builds the record update, stamping the playback state with the given time
    fn into_update(
        self,
        session_id: PrimaryKey,
        previous: &PlaybackState,
        now: DateTime<Utc>,
    ) -> UpdatedSession {
        let playback = PlaybackState {
            position: self.position.unwrap_or(previous.position),
            is_playing: self.is_playing.unwrap_or(previous.is_playing),
            updated_at: now,
        };

        UpdatedSession {
            current_track: self.current_track,
            queue: self.queue,
            playback: Some(playback),
            ..UpdatedSession::new(session_id)
        }
    }
}

fn is_seconds(value: f64) -> bool {
    value.is_finite() && value >= 0.
}

/// The single writer gateway to a session's playback.
/// Only the host may write, every participant may read.
pub struct PlaybackGateway<Db: ?Sized> {
    context: CollabContext<Db>,
}

impl<Db> PlaybackGateway<Db>
where
    Db: Database + ?Sized,
{
    pub fn new(context: &CollabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Applies a playback patch from the host, returning the new state
    pub async fn update(
        &self,
        session_id: PrimaryKey,
        user_id: PrimaryKey,
        patch: PlaybackPatch,
    ) -> CollabResult<PlaybackSnapshot> {
        let session = self.context.database.session_by_id(session_id).await?;

        if !session.is_active() {
            return Err(CollabError::InvalidState(format!(
                "session {session_id} has ended"
            )));
        }

        if !session.is_host(user_id) {
            return Err(CollabError::Forbidden(
                "only the host can change playback".to_string(),
            ));
        }

        patch.validate()?;

        let now = self.context.now();
        let update = patch.into_update(session_id, &session.playback, now);
        let session = self.context.database.update_session(update).await?;

        info!(
            "Playback of session {} synced, playing: {} at {:.1}s",
            session.id, session.playback.is_playing, session.playback.position
        );

        let snapshot = PlaybackSnapshot::from(&session);

        self.context.emit(CollabEvent::PlaybackUpdated {
            session_id,
            snapshot: snapshot.clone(),
        });

        Ok(snapshot)
    }

    /// Returns the playback state of a session to one of its participants
    pub async fn read(
        &self,
        session_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> CollabResult<PlaybackSnapshot> {
        let session = self.context.database.session_by_id(session_id).await?;

        if !session.has_participant(user_id) {
            return Err(CollabError::Forbidden(
                "user is not a participant of this session".to_string(),
            ));
        }

        Ok(PlaybackSnapshot::from(&session))
    }
}
