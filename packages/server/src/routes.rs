//! HTTP routes over the identity backend and the directory.
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `POST /api/auth/register` | `NewAccount` | `201` + identity |
//! | `POST /api/auth/login` | `Credentials` | session |
//! | `POST /api/auth/logout` | | `204` |
//! | `GET /api/auth/identity` | | identity behind the token |
//! | `GET /api/auth/me` | | user with resolved role |
//! | `PUT /api/profile` | `Profile` | user with resolved role |

use axum::{
    extract::{FromRequestParts, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        Method, StatusCode,
    },
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use api::auth::{bearer_token, IdentityAdmin, IdentityProvider};
use api::directory::Directory;
use api::models::{Credentials, IdentityUser, NewAccount, Profile, Session, User};
use api::reconcile::AccountService;
use api::AuthError;

use crate::error::ApiError;
use crate::state::AppState;

/// Access token taken from `Authorization: Bearer <token>`.
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| BearerToken(token.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

pub fn router<P, D>(state: AppState<P, D>) -> Router
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/api/auth/register", post(register::<P, D>))
        .route("/api/auth/login", post(login::<P, D>))
        .route("/api/auth/logout", post(logout::<P, D>))
        .route("/api/auth/identity", get(identity::<P, D>))
        .route("/api/auth/me", get(me::<P, D>))
        .route("/api/profile", put(update_profile::<P, D>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The session behind a token, or `SessionExpired` if the token is unknown.
async fn authenticate<P, D>(state: &AppState<P, D>, token: String) -> Result<Session, ApiError>
where
    P: IdentityProvider,
{
    match state.provider().get_user(&token).await? {
        Some(user) => Ok(Session {
            access_token: token,
            user,
        }),
        None => Err(AuthError::SessionExpired.into()),
    }
}

async fn register<P, D>(
    State(state): State<AppState<P, D>>,
    Json(account): Json<NewAccount>,
) -> Result<(StatusCode, Json<IdentityUser>), ApiError>
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    let identity = state.accounts.register(&account).await?;
    Ok((StatusCode::CREATED, Json(identity)))
}

async fn login<P, D>(
    State(state): State<AppState<P, D>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Session>, ApiError>
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    let session = state
        .provider()
        .sign_in_with_password(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(session))
}

async fn logout<P, D>(
    State(state): State<AppState<P, D>>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, ApiError>
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    state.provider().sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn identity<P, D>(
    State(state): State<AppState<P, D>>,
    BearerToken(token): BearerToken,
) -> Result<Json<IdentityUser>, ApiError>
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    let session = authenticate(&state, token).await?;
    Ok(Json(session.user))
}

async fn me<P, D>(
    State(state): State<AppState<P, D>>,
    BearerToken(token): BearerToken,
) -> Result<Json<User>, ApiError>
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    let session = authenticate(&state, token).await?;
    let user = state.accounts.resolve_user(&session).await?;
    Ok(Json(user))
}

async fn update_profile<P, D>(
    State(state): State<AppState<P, D>>,
    BearerToken(token): BearerToken,
    Json(profile): Json<Profile>,
) -> Result<Json<User>, ApiError>
where
    P: IdentityProvider + IdentityAdmin,
    D: Directory,
{
    let session = authenticate(&state, token).await?;
    state.directory().upsert_profile(&session.user.id, &profile).await?;
    let user = state.accounts.resolve_user(&session).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use api::auth::AuthConfig;
    use api::memory::{MemoryDirectory, MemoryIdentity};
    use api::models::{Club, UserMetadata};

    use super::*;

    struct TestApp {
        router: Router,
        provider: MemoryIdentity,
        directory: MemoryDirectory,
    }

    impl TestApp {
        fn new() -> Self {
            let provider = MemoryIdentity::new();
            let directory = MemoryDirectory::new();
            let state = AppState::new(
                Arc::new(provider.clone()),
                Arc::new(directory.clone()),
                AuthConfig::default(),
            );
            Self {
                router: router(state),
                provider,
                directory,
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => request
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => request.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn login(&self, email: &str, password: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({ "email": email, "password": password })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body["access_token"].as_str().unwrap().to_string()
        }

        fn seed(&self, id: &str, email: &str) {
            self.provider
                .insert_identity(
                    IdentityUser {
                        id: id.into(),
                        email: email.into(),
                        metadata: UserMetadata::default(),
                    },
                    "password123",
                )
                .unwrap();
        }
    }

    fn account(email: &str, password: &str) -> Value {
        json!({ "name": "Asha", "email": email, "password": password, "role": "student" })
    }

    #[tokio::test]
    async fn test_register_then_me() {
        let app = TestApp::new();
        let (status, identity) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(account("asha@uni.edu", "password123")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = identity["id"].as_str().unwrap().to_string();
        assert!(app.directory.user_record(&id).is_some());

        let token = app.login("asha@uni.edu", "password123").await;
        let (status, user) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["id"], id);
        assert_eq!(user["role"], "student");
        assert_eq!(user["profile"], Value::Null);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input_and_duplicates() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(account("asha@uni.edu", "short")),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(account("asha@uni.edu", "password123")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(account("asha@uni.edu", "password456")),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_cannot_claim_admin() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Mallory",
                    "email": "mallory@gmail.com",
                    "password": "password123",
                    "role": "admin"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(app.provider.identity_count(), 0);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "mallory@gmail.com", "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_record_failure_removes_identity() {
        let app = TestApp::new();
        app.directory.fail_writes(true);
        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(account("asha@uni.edu", "password123")),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.provider.identity_count(), 0);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let app = TestApp::new();
        app.seed("u1", "asha@uni.edu");
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "asha@uni.edu", "password": "wrong-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_me_requires_valid_token() {
        let app = TestApp::new();
        let (status, _) = app.send(Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(Method::GET, "/api/auth/me", Some("not-a-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_resolves_representative_and_admin() {
        let app = TestApp::new();
        app.seed("u2", "rep@uni.edu");
        app.seed("u3", "boss@cluby.com");
        app.directory.insert_club(Club {
            id: "c9".into(),
            name: "Chess".into(),
            representative_id: Some("u2".into()),
        });

        let token = app.login("rep@uni.edu", "password123").await;
        let (_, user) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(user["role"], "clubRepresentative");
        assert_eq!(user["club_id"], "c9");

        let token = app.login("boss@cluby.com", "password123").await;
        let (_, user) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(user["role"], "admin");
        assert_eq!(user["club_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_me_degrades_when_profile_lookup_fails() {
        let app = TestApp::new();
        app.seed("u1", "asha@uni.edu");
        app.directory.fail_profile_lookups(true);

        let token = app.login("asha@uni.edu", "password123").await;
        let (status, user) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["role"], "student");
        assert_eq!(user["profile"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_profile_returns_resolved_user() {
        let app = TestApp::new();
        app.seed("u1", "asha@uni.edu");
        let token = app.login("asha@uni.edu", "password123").await;

        let (status, user) = app
            .send(
                Method::PUT,
                "/api/profile",
                Some(&token),
                Some(json!({ "full_name": "Asha Rao", "department": "Physics", "year": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["profile"]["full_name"], "Asha Rao");
        assert_eq!(user["profile"]["year"], 2);
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let app = TestApp::new();
        app.seed("u1", "asha@uni.edu");
        let token = app.login("asha@uni.edu", "password123").await;

        let (status, identity) = app
            .send(Method::GET, "/api/auth/identity", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(identity["email"], "asha@uni.edu");

        let (status, _) = app
            .send(Method::POST, "/api/auth/logout", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
