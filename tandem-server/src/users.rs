//! Helpers to seed the user directory when running without an external one

use axum::{
    extract::{Path, State},
    routing::post,
    Json,
};
use tandem_collab::{CollabError, NewUser, PrimaryKey};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewFriendSchema, NewUserSchema, ValidatedJson},
    serialized::{ToSerialized, User},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "users",
    request_body = NewUserSchema,
    responses(
        (status = 200, body = User),
        (status = 409, body = ErrorBody, description = "The username is taken")
    )
)]
pub async fn create_user(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewUserSchema>,
) -> ServerResult<Json<User>> {
    let collab = &context.collab;
    let user = collab
        .within(async {
            let new_user = NewUser {
                username: body.username,
                display_name: body.display_name,
            };

            collab
                .database()
                .create_user(new_user)
                .await
                .map_err(CollabError::from)
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/users/{id}/friends",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    request_body = NewFriendSchema,
    responses(
        (status = 200, description = "The users are now friends with each other"),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn add_friend(
    State(context): State<ServerContext>,
    Path(user_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<NewFriendSchema>,
) -> ServerResult<()> {
    let collab = &context.collab;

    collab
        .within(async {
            collab
                .database()
                .create_friendship(user_id, body.friend_id)
                .await
                .map_err(CollabError::from)
        })
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/:id/friends", post(add_friend))
}
