use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use tandem_collab::PrimaryKey;

use crate::{
    caller::Caller,
    context::ServerContext,
    errors::ServerResult,
    schemas::{PlaybackPatchSchema, ValidatedJson},
    serialized::{PlaybackView, Session, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/sessions/active",
    tag = "sessions",
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Option<Session>, description = "The caller's current session, or null")
    )
)]
pub async fn active_session(
    caller: Caller,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Option<Session>>> {
    let collab = &context.collab;
    let session = collab.within(collab.sessions.active(caller.id)).await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = i32, Path, description = "Session id")),
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Session),
        (status = 403, body = ErrorBody, description = "The caller is not a participant"),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn session(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
) -> ServerResult<Json<Session>> {
    let collab = &context.collab;
    let session = collab
        .within(collab.sessions.get(session_id, caller.id))
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/playback",
    tag = "sessions",
    params(("id" = i32, Path, description = "Session id")),
    security(("CallerId" = [])),
    responses(
        (status = 200, body = PlaybackView),
        (status = 403, body = ErrorBody, description = "The caller is not a participant")
    )
)]
pub async fn playback(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
) -> ServerResult<Json<PlaybackView>> {
    let collab = &context.collab;
    let snapshot = collab
        .within(collab.playback.read(session_id, caller.id))
        .await?;

    Ok(Json(snapshot.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/sessions/{id}/playback",
    tag = "sessions",
    params(("id" = i32, Path, description = "Session id")),
    request_body = PlaybackPatchSchema,
    security(("CallerId" = [])),
    responses(
        (status = 200, body = PlaybackView),
        (status = 400, body = ErrorBody, description = "The patch is invalid"),
        (status = 403, body = ErrorBody, description = "Only the host can sync playback"),
        (status = 409, body = ErrorBody, description = "The session has ended")
    )
)]
pub async fn sync_playback(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<PlaybackPatchSchema>,
) -> ServerResult<Json<PlaybackView>> {
    let collab = &context.collab;
    let snapshot = collab
        .within(collab.playback.update(session_id, caller.id, body.into()))
        .await?;

    Ok(Json(snapshot.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/leave",
    tag = "sessions",
    params(("id" = i32, Path, description = "Session id")),
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Option<Session>, description = "The session after the caller left, or null if they were not part of it")
    )
)]
pub async fn leave_session(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
) -> ServerResult<Json<Option<Session>>> {
    let collab = &context.collab;
    let session = collab
        .within(collab.sessions.leave(session_id, caller.id))
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/end",
    tag = "sessions",
    params(("id" = i32, Path, description = "Session id")),
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Session),
        (status = 403, body = ErrorBody, description = "Only the host can end the session")
    )
)]
pub async fn end_session(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
) -> ServerResult<Json<Session>> {
    let collab = &context.collab;
    let session = collab
        .within(collab.sessions.end(session_id, caller.id))
        .await?;

    Ok(Json(session.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/active", get(active_session))
        .route("/:id", get(session))
        .route("/:id/playback", get(playback).patch(sync_playback))
        .route("/:id/leave", post(leave_session))
        .route("/:id/end", post(end_session))
}
