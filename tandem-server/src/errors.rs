use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use tandem_collab::{CollabError, DatabaseError, ErrorKind};
use thiserror::Error;
use utoipa::ToSchema;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Collab(#[from] CollabError),
    /// The request body could not be parsed or did not pass validation
    #[error("Request body is invalid: {0}")]
    InvalidBody(String),
}

/// The body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// A stable, machine readable error kind
    #[schema(example = "not_found")]
    kind: String,
    message: String,
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Collab(e) => e.kind(),
            Self::InvalidBody(_) => ErrorKind::Validation,
        }
    }

    fn as_status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden | ErrorKind::FriendshipRequired => StatusCode::FORBIDDEN,
            ErrorKind::InvalidState | ErrorKind::DuplicatePending => StatusCode::CONFLICT,
            ErrorKind::Expired => StatusCode::GONE,
            ErrorKind::SelfInvite | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::MembershipIncomplete => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            kind: self.kind().as_str().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        Self::Collab(value.into())
    }
}
