use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tandem_collab::{CollabError, PrimaryKey};

use crate::errors::ServerError;

/// The header an upstream authenticating proxy sets to the id of the user making the request
pub const CALLER_HEADER: &str = "x-user-id";

/// The user making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: PrimaryKey,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|x| x.to_str().ok())
            .and_then(|x| x.trim().parse::<PrimaryKey>().ok())
            .ok_or(CollabError::Unauthorized)?;

        Ok(Self { id })
    }
}
