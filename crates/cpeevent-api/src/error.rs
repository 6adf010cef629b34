use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use cpeevent_types::api::ErrorBody;

use crate::credentials::TokenError;

/// Every failure a handler can report. The display string is what ends up
/// in the `error` field of the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input: missing fields, malformed ids, values outside their domain.
    #[error("{0}")]
    Validation(String),

    #[error("No Authorization header provided")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Wrong credentials or a refresh token that is not the stored one.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A post whose kind tag is outside post/vote/form, or a kind that has
    /// nothing to answer or summarize.
    #[error("Unknown post kind")]
    UnknownKind,

    /// Details are logged, never sent to the client.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingToken | Self::UnknownKind => StatusCode::BAD_REQUEST,
            Self::Token(TokenError::Expired | TokenError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            Self::Token(TokenError::Malformed) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = axum::Json(ErrorBody {
            success: false,
            error: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Internal error: {:#}", err);
        Self::Internal
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", err);
        Self::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_split_between_401_and_500() {
        assert_eq!(ApiError::Token(TokenError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Token(TokenError::InvalidSignature).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Token(TokenError::Malformed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_stay_private() {
        let err = ApiError::from(anyhow::anyhow!("disk I/O error"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }
}
