//! # HTTP client backend for the UI
//!
//! [`HttpAuthClient`] lets the session context run in a frontend without any direct
//! datastore access: it is the [`IdentityProvider`] (sign-in/out against the server,
//! session kept in memory) and the [`AccountService`] (`/api/auth/me` returns the user
//! with its role already resolved server-side).
//!
//! | Method | Route |
//! |--------|-------|
//! | `sign_in_with_password` | `POST /api/auth/login` |
//! | `sign_out` | `POST /api/auth/logout` |
//! | `get_user` | `GET /api/auth/identity` |
//! | `resolve_user` | `GET /api/auth/me` |
//! | `register` | `POST /api/auth/register` |
//! | [`update_profile`](HttpAuthClient::update_profile) | `PUT /api/profile` |

use std::sync::{Arc, Mutex};

use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::sync::broadcast;

use crate::auth::{IdentityProvider, AUTH_EVENT_CAPACITY};
use crate::error::{AuthError, RegistrationError};
use crate::models::{AuthEvent, Credentials, ErrorBody, IdentityUser, NewAccount, Profile, Session, User};
use crate::reconcile::AccountService;

fn transport_error(e: reqwest::Error) -> AuthError {
    AuthError::Provider(e.to_string())
}

/// Read the `{"error": ...}` body, falling back to the status text.
async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    base_url: String,
    http: reqwest::Client,
    current: Arc<Mutex<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl HttpAuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            current: Arc::default(),
            events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request.bearer_auth(access_token)
    }

    fn current_token(&self) -> Result<String, AuthError> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(AuthError::SessionExpired)
    }

    /// Replace the caller's profile; returns the re-resolved user.
    pub async fn update_profile(&self, profile: &Profile) -> Result<User, AuthError> {
        let token = self.current_token()?;
        let response = self
            .authorized(self.http.put(self.url("/api/profile")), &token)
            .json(profile)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(transport_error),
            StatusCode::UNAUTHORIZED => Err(AuthError::SessionExpired),
            _ => Err(AuthError::Provider(error_message(response).await)),
        }
    }
}

impl IdentityProvider for HttpAuthClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&Credentials {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => {
                let session: Session = response.json().await.map_err(transport_error)?;
                *self.current.lock().unwrap() = Some(session.clone());
                let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
                Ok(session)
            }
            StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            _ => Err(AuthError::Provider(error_message(response).await)),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .authorized(self.http.post(self.url("/api/auth/logout")), access_token)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
            return Err(AuthError::Provider(error_message(response).await));
        }

        {
            let mut current = self.current.lock().unwrap();
            if current.as_ref().is_some_and(|s| s.access_token == access_token) {
                *current = None;
            }
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<IdentityUser>, AuthError> {
        let response = self
            .authorized(self.http.get(self.url("/api/auth/identity")), access_token)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => response.json().await.map(Some).map_err(transport_error),
            StatusCode::UNAUTHORIZED => Ok(None),
            _ => Err(AuthError::Provider(error_message(response).await)),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

impl AccountService for HttpAuthClient {
    async fn resolve_user(&self, session: &Session) -> Result<User, AuthError> {
        let response = self
            .authorized(self.http.get(self.url("/api/auth/me")), &session.access_token)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(transport_error),
            StatusCode::UNAUTHORIZED => Err(AuthError::SessionExpired),
            _ => Err(AuthError::Provider(error_message(response).await)),
        }
    }

    async fn register(&self, account: &NewAccount) -> Result<IdentityUser, RegistrationError> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(account)
            .send()
            .await
            .map_err(|e| RegistrationError::Identity(transport_error(e)))?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => response
                .json()
                .await
                .map_err(|e| RegistrationError::Identity(transport_error(e))),
            StatusCode::BAD_REQUEST => Err(RegistrationError::Invalid(error_message(response).await)),
            StatusCode::CONFLICT => Err(RegistrationError::EmailTaken),
            _ => Err(RegistrationError::Identity(AuthError::Provider(
                error_message(response).await,
            ))),
        }
    }
}
