use std::{
    io,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use log::{info, warn};
use tandem_collab::Collab;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod caller;
mod context;
mod docs;
mod errors;
mod invitations;
mod schemas;
mod serialized;
mod sessions;
mod users;

pub use caller::{Caller, CALLER_HEADER};
pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Which routes the server exposes besides the public api
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSeeding {
    /// Anyone can create users and friendships, only meant for the in-memory store
    Enabled,
    #[default]
    Disabled,
}

/// Builds every route the server exposes
pub fn router(collab: Arc<Collab>, seeding: UserSeeding) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut version_one_router = Router::new()
        .nest("/invitations", invitations::router())
        .nest("/sessions", sessions::router());

    if seeding == UserSeeding::Enabled {
        version_one_router = version_one_router.nest("/users", users::router());
    }

    Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(ServerContext { collab })
}

/// Starts the tandem server
pub async fn run_server(collab: Arc<Collab>, port: u16, seeding: UserSeeding) -> io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(&addr).await?;

    if seeding == UserSeeding::Enabled {
        warn!("User seeding routes are exposed, anyone can create users and friendships");
    }

    info!("Listening on {}", addr);

    axum::serve(listener, router(collab, seeding).into_make_service()).await
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tandem_collab::{Config, Database, MemoryDatabase, NewUser};
    use tower::ServiceExt;

    use super::*;

    struct TestApp {
        router: axum::Router,
        database: Arc<MemoryDatabase>,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_seeding(UserSeeding::Enabled)
        }

        fn with_seeding(seeding: UserSeeding) -> Self {
            let database = Arc::new(MemoryDatabase::new());
            let shared: Arc<dyn Database> = database.clone();
            let collab = Collab::new(Config::default(), shared);

            Self {
                router: router(Arc::new(collab), seeding),
                database,
            }
        }

        async fn user(&self, name: &str) -> i32 {
            self.database
                .create_user(NewUser {
                    username: name.to_string(),
                    display_name: name.to_string(),
                })
                .await
                .unwrap()
                .id
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            caller: Option<i32>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);

            if let Some(caller) = caller {
                request = request.header(CALLER_HEADER, caller.to_string());
            }

            let request = match body {
                Some(body) => request
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            (status, value)
        }
    }

    #[tokio::test]
    async fn requests_without_a_caller_are_unauthorized() {
        let app = TestApp::new();

        let (status, body) = app.send("GET", "/v1/invitations", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn friends_can_listen_together() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let bob = app.user("bob").await;

        let (status, _) = app
            .send(
                "POST",
                &format!("/v1/users/{alice}/friends"),
                None,
                Some(json!({ "friendId": bob })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, invitation) = app
            .send(
                "POST",
                "/v1/invitations",
                Some(alice),
                Some(json!({ "toUserId": bob })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(invitation["status"], "pending");

        let (_, pending) = app.send("GET", "/v1/invitations", Some(bob), None).await;
        assert_eq!(pending.as_array().map(Vec::len), Some(1));

        let (status, accepted) = app
            .send(
                "POST",
                &format!("/v1/invitations/{}/accept", invitation["id"]),
                Some(bob),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let session_id = &accepted["session"]["id"];
        assert_eq!(accepted["session"]["hostId"], alice);

        let (status, body) = app
            .send(
                "PATCH",
                &format!("/v1/sessions/{session_id}/playback"),
                Some(bob),
                Some(json!({ "isPlaying": true })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "forbidden");

        let (status, _) = app
            .send(
                "PATCH",
                &format!("/v1/sessions/{session_id}/playback"),
                Some(alice),
                Some(json!({ "isPlaying": true, "position": 12.5 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, playback) = app
            .send(
                "GET",
                &format!("/v1/sessions/{session_id}/playback"),
                Some(bob),
                None,
            )
            .await;
        assert_eq!(playback["playback"]["isPlaying"], true);
        assert_eq!(playback["playback"]["position"], 12.5);

        let (_, active) = app
            .send("GET", "/v1/sessions/active", Some(bob), None)
            .await;
        assert_eq!(&active["id"], session_id);

        let (status, ended) = app
            .send(
                "POST",
                &format!("/v1/sessions/{session_id}/end"),
                Some(alice),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ended["isActive"], false);

        let (_, active) = app
            .send("GET", "/v1/sessions/active", Some(bob), None)
            .await;
        assert_eq!(active, Value::Null);
    }

    #[tokio::test]
    async fn seeding_routes_are_hidden_by_default() {
        let app = TestApp::with_seeding(UserSeeding::Disabled);
        let mallory = app.user("mallory").await;
        let victim = app.user("victim").await;

        let (status, _) = app
            .send(
                "POST",
                &format!("/v1/users/{mallory}/friends"),
                None,
                Some(json!({ "friendId": victim })),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!app.database.is_friend(victim, mallory).await.unwrap());

        let (status, _) = app
            .send("POST", "/v1/users", None, Some(json!({ "username": "eve", "displayName": "Eve" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_patches_are_checked_after_the_host() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let bob = app.user("bob").await;
        app.database.create_friendship(alice, bob).await.unwrap();

        let (_, invitation) = app
            .send(
                "POST",
                "/v1/invitations",
                Some(alice),
                Some(json!({ "toUserId": bob })),
            )
            .await;
        let (_, accepted) = app
            .send(
                "POST",
                &format!("/v1/invitations/{}/accept", invitation["id"]),
                Some(bob),
                None,
            )
            .await;
        let uri = format!("/v1/sessions/{}/playback", accepted["session"]["id"]);

        let (status, body) = app
            .send("PATCH", &uri, Some(bob), Some(json!({ "position": -1 })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "forbidden");

        let (status, body) = app
            .send("PATCH", &uri, Some(alice), Some(json!({ "position": -1 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");

        let (status, body) = app
            .send("PATCH", &uri, Some(alice), Some(json!({ "volume": 11 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn serves_the_api_document() {
        let app = TestApp::new();

        let (status, body) = app.send("GET", "/api.json", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/v1/sessions/{id}/playback"].is_object());
    }
}
