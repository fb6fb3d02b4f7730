use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::{caller::CALLER_HEADER, errors, invitations, schemas, serialized, sessions, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        invitations::create_invitation,
        invitations::list_invitations,
        invitations::accept_invitation,
        invitations::decline_invitation,
        sessions::active_session,
        sessions::session,
        sessions::playback,
        sessions::sync_playback,
        sessions::leave_session,
        sessions::end_session,
        users::create_user,
        users::add_friend,
    ),
    components(schemas(
        errors::ErrorBody,
        schemas::NewInvitationSchema,
        schemas::PlaybackPatchSchema,
        schemas::TrackSchema,
        schemas::NewUserSchema,
        schemas::NewFriendSchema,
        serialized::User,
        serialized::Invitation,
        serialized::AcceptedInvitation,
        serialized::Session,
        serialized::Playback,
        serialized::PlaybackView,
        serialized::Track,
    )),
    modifiers(&Security),
    tags(
        (name = "invitations", description = "Inviting friends to listen together"),
        (name = "sessions", description = "Shared sessions and their playback"),
        (name = "users", description = "Seeding the user directory during development")
    ),
    info(
        description = "tandem-server exposes endpoints to invite friends and listen together"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = ApiKey::Header(ApiKeyValue::with_description(
                CALLER_HEADER,
                "The id of the user making the request, set by the authenticating proxy",
            ));

            components.add_security_scheme("CallerId", SecurityScheme::ApiKey(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn documents_every_route() {
        let api = ApiDoc::openapi();
        let paths: Vec<_> = api.paths.paths.keys().cloned().collect();

        for path in [
            "/v1/invitations",
            "/v1/invitations/{id}/accept",
            "/v1/invitations/{id}/decline",
            "/v1/sessions/active",
            "/v1/sessions/{id}",
            "/v1/sessions/{id}/playback",
            "/v1/sessions/{id}/leave",
            "/v1/sessions/{id}/end",
            "/v1/users",
            "/v1/users/{id}/friends",
        ] {
            assert!(paths.iter().any(|p| p == path), "{path} is not documented");
        }
    }
}
