use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use api::models::ErrorBody;
use api::{AuthError, RegistrationError, StoreError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing or malformed bearer token")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::InvalidCredentials | AuthError::SessionExpired) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Auth(AuthError::AccountExists) => StatusCode::CONFLICT,
            ApiError::Auth(AuthError::Provider(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Auth(AuthError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Registration(RegistrationError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Registration(RegistrationError::EmailTaken) => StatusCode::CONFLICT,
            ApiError::Registration(RegistrationError::Identity(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Registration(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(RegistrationError::Invalid("bad email".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RegistrationError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(RegistrationError::Orphaned {
                user_id: "u1".into(),
                cause: StoreError::new("users", "down"),
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuthError::Provider("timeout".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
