use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{Error, Result as StoreResult};

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Authentication required".to_string(),
        }
    }

    /// Always the same body, whichever check failed.
    #[must_use]
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "Forbidden".to_string(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Maps a domain error, using `context` as the client message for upstream failures.
    pub fn from_error(err: Error, context: &str) -> Self {
        match err {
            Error::BadRequest(message) => Self::bad_request(message),
            Error::InvalidState { status } => {
                Self::bad_request(format!("Request has already been {status}"))
            }
            Error::Unauthorized | Error::InvalidTokenFormat => {
                Self::unauthorized()
            }
            Error::Forbidden => Self::forbidden(),
            Error::NotFound => Self::not_found("Not found"),
            Error::Conflict(message) => Self::conflict(message),
            Error::AlreadyExists => Self::conflict("Already exists"),
            other => {
                tracing::error!("{}: {}", context, other);
                Self::internal(context)
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from_error(err, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections use the `{success, error}` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Extension trait for converting store results to API errors with a custom message.
pub trait StoreResultExt<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError>;

    /// Like `api_err`, with an entity-specific message for `Error::NotFound`.
    fn api_err_or_not_found(
        self,
        not_found: &'static str,
        message: &'static str,
    ) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_error(e, message))
    }

    fn api_err_or_not_found(
        self,
        not_found: &'static str,
        message: &'static str,
    ) -> Result<T, ApiError> {
        self.map_err(|e| match e {
            Error::NotFound => ApiError::not_found(not_found),
            other => ApiError::from_error(other, message),
        })
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}
