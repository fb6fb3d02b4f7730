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
    schemas::{NewInvitationSchema, ValidatedJson},
    serialized::{AcceptedInvitation, Invitation, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/invitations",
    tag = "invitations",
    request_body = NewInvitationSchema,
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Invitation),
        (status = 400, body = ErrorBody, description = "Inviting yourself"),
        (status = 403, body = ErrorBody, description = "Not friends"),
        (status = 409, body = ErrorBody, description = "An invitation is already pending")
    )
)]
pub async fn create_invitation(
    caller: Caller,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewInvitationSchema>,
) -> ServerResult<Json<Invitation>> {
    let collab = &context.collab;
    let invitation = collab
        .within(collab.invitations.create(caller.id, body.to_user_id))
        .await?;

    Ok(Json(invitation.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/invitations",
    tag = "invitations",
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Vec<Invitation>, description = "Pending invitations to the caller, newest first")
    )
)]
pub async fn list_invitations(
    caller: Caller,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Invitation>>> {
    let collab = &context.collab;
    let invitations = collab
        .within(collab.invitations.list_pending(caller.id))
        .await?;

    Ok(Json(invitations.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/invitations/{id}/accept",
    tag = "invitations",
    params(("id" = i32, Path, description = "Invitation id")),
    security(("CallerId" = [])),
    responses(
        (status = 200, body = AcceptedInvitation),
        (status = 403, body = ErrorBody, description = "The caller is not the recipient"),
        (status = 409, body = ErrorBody, description = "The invitation was already answered"),
        (status = 410, body = ErrorBody, description = "The invitation expired")
    )
)]
pub async fn accept_invitation(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(invitation_id): Path<PrimaryKey>,
) -> ServerResult<Json<AcceptedInvitation>> {
    let collab = &context.collab;
    let accepted = collab
        .within(collab.invitations.accept(invitation_id, caller.id))
        .await?;

    Ok(Json(accepted.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/invitations/{id}/decline",
    tag = "invitations",
    params(("id" = i32, Path, description = "Invitation id")),
    security(("CallerId" = [])),
    responses(
        (status = 200, body = Invitation),
        (status = 403, body = ErrorBody, description = "The caller is not the recipient"),
        (status = 409, body = ErrorBody, description = "The invitation was already answered")
    )
)]
pub async fn decline_invitation(
    caller: Caller,
    State(context): State<ServerContext>,
    Path(invitation_id): Path<PrimaryKey>,
) -> ServerResult<Json<Invitation>> {
    let collab = &context.collab;
    let invitation = collab
        .within(collab.invitations.decline(invitation_id, caller.id))
        .await?;

    Ok(Json(invitation.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invitations).post(create_invitation))
        .route("/:id/accept", post(accept_invitation))
        .route("/:id/decline", post(decline_invitation))
}
