use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tandem_collab::{PlaybackPatch, PrimaryKey, Track};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewInvitationSchema {
    /// The friend to invite
    pub to_user_id: PrimaryKey,
}

#[derive(Debug, ToSchema, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackSchema {
    #[validate(length(min = 1, max = 256))]
    pub id: String,
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    #[validate(length(max = 512))]
    pub artist: String,
    #[validate(length(min = 1, max = 2048))]
    pub uri: String,
    #[validate(length(max = 2048))]
    pub artwork: Option<String>,
    pub duration_seconds: Option<f64>,
}

/// Any subset of the playback fields. Omitted fields are left alone.
/// Only the shape is checked here, values are checked once the caller is known to be the host.
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlaybackPatchSchema {
    /// Seconds into the current track
    pub position: Option<f64>,
    pub is_playing: Option<bool>,
    #[validate(nested)]
    pub current_track: Option<TrackSchema>,
    #[validate(length(max = 500), nested)]
    pub queue: Option<Vec<TrackSchema>>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUserSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewFriendSchema {
    pub friend_id: PrimaryKey,
}

impl From<TrackSchema> for Track {
    fn from(value: TrackSchema) -> Self {
        Self {
            id: value.id,
            title: value.title,
            artist: value.artist,
            uri: value.uri,
            artwork: value.artwork,
            duration_seconds: value.duration_seconds,
        }
    }
}

impl From<PlaybackPatchSchema> for PlaybackPatch {
    fn from(value: PlaybackPatchSchema) -> Self {
        Self {
            position: value.position,
            is_playing: value.is_playing,
            current_track: value.current_track.map(Into::into),
            queue: value
                .queue
                .map(|tracks| tracks.into_iter().map(Into::into).collect()),
        }
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::InvalidBody(e.body_text()))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::InvalidBody(e.to_string()))?;

        Ok(Self(extracted_json.0))
    }
}
