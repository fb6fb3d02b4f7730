//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use serde::Serialize;
use tandem_collab::{
    AcceptedInvitation as CollabAcceptedInvitation, InvitationData, PlaybackSnapshot,
    PlaybackState, SessionData, Track as CollabTrack, UserData,
};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    username: String,
    display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    id: i32,
    from_user_id: i32,
    to_user_id: i32,
    /// One of pending, accepted, declined, or expired
    #[schema(example = "pending")]
    status: String,
    /// The session this invitation turned into, once accepted
    session_id: Option<i32>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    id: String,
    title: String,
    artist: String,
    uri: String,
    artwork: Option<String>,
    duration_seconds: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    position: f64,
    is_playing: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: i32,
    host_id: i32,
    participant_ids: Vec<i32>,
    current_track: Option<Track>,
    queue: Vec<Track>,
    playback: Playback,
    is_active: bool,
    ended_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// What participants poll to follow the host
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackView {
    host_id: i32,
    current_track: Option<Track>,
    playback: Playback,
    queue: Vec<Track>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedInvitation {
    invitation: Invitation,
    session: Session,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl ToSerialized<Invitation> for InvitationData {
    fn to_serialized(&self) -> Invitation {
        Invitation {
            id: self.id,
            from_user_id: self.from_id,
            to_user_id: self.to_id,
            status: self.status.as_str().to_string(),
            session_id: self.status.session_id(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl ToSerialized<Track> for CollabTrack {
    fn to_serialized(&self) -> Track {
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            uri: self.uri.clone(),
            artwork: self.artwork.clone(),
            duration_seconds: self.duration_seconds,
        }
    }
}

impl ToSerialized<Playback> for PlaybackState {
    fn to_serialized(&self) -> Playback {
        Playback {
            position: self.position,
            is_playing: self.is_playing,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Session> for SessionData {
    fn to_serialized(&self) -> Session {
        Session {
            id: self.id,
            host_id: self.host_id,
            participant_ids: self.participant_ids.iter().copied().collect(),
            current_track: self.current_track.to_serialized(),
            queue: self.queue.to_serialized(),
            playback: self.playback.to_serialized(),
            is_active: self.is_active(),
            ended_at: self.ended_at(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<PlaybackView> for PlaybackSnapshot {
    fn to_serialized(&self) -> PlaybackView {
        PlaybackView {
            host_id: self.host_id,
            current_track: self.current_track.to_serialized(),
            playback: self.playback.to_serialized(),
            queue: self.queue.to_serialized(),
        }
    }
}

impl ToSerialized<AcceptedInvitation> for CollabAcceptedInvitation {
    fn to_serialized(&self) -> AcceptedInvitation {
        AcceptedInvitation {
            invitation: self.invitation.to_serialized(),
            session: self.session.to_serialized(),
        }
    }
}
