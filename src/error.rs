use axum::{
    Json,
    extract::OriginalUri,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{auth::AuthError, password::PasswordError, repository::RepositoryError};

/// ErrorBody
///
/// The uniform JSON error envelope returned by every failing endpoint.
/// `user_message` is safe to show to end users; `error_message` carries the technical
/// detail when there is one worth sending, and `query` echoes the request query string
/// for parameter errors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, PartialEq)]
#[ts(export)]
pub struct ErrorBody {
    pub status: u16,
    pub user_message: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_message: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// ApiError
///
/// Error type for handlers and middleware. Everything that can fail during a request
/// converts into this, and it renders as `ErrorBody` with the matching status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub user_message: Vec<String>,
    pub error_message: Vec<String>,
    pub query: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            user_message: vec![message.into()],
            error_message: vec![],
            query: None,
        }
    }

    pub fn with_messages(status: StatusCode, messages: Vec<String>) -> Self {
        Self {
            status,
            user_message: messages,
            error_message: vec![],
            query: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_message.push(detail.into());
        self
    }

    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.map(str::to_string);
        self
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status.as_u16(),
            user_message: self.user_message.clone(),
            error_message: self.error_message.clone(),
            query: self.query.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.user_message.join("; "))
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => ApiError::conflict(message),
            other => {
                // The detail stays in the logs; clients only see the generic message.
                tracing::error!("repository failure: {:?}", other);
                ApiError::internal()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            // Both variants collapse into one message so logins cannot be enumerated.
            AuthError::UserNotFound | AuthError::PasswordMismatch => {
                ApiError::unauthorized("Wrong password or username")
            }
            AuthError::Banned => ApiError::forbidden("User is banned"),
            AuthError::Forbidden => ApiError::forbidden("Access denied"),
            AuthError::Repository(inner) => inner.into(),
            AuthError::Signing(detail) => {
                tracing::error!("token signing failed: {}", detail);
                ApiError::internal()
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Policy(message) => ApiError::bad_request(message),
            PasswordError::Hashing(detail) => {
                tracing::error!("password hashing failed: {}", detail);
                ApiError::internal()
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::with_messages(StatusCode::BAD_REQUEST, validation_messages(&errors))
    }
}

/// Flattens field validation failures into user-facing messages, sorted by field name
/// so the response is stable.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, failures)| {
            failures.iter().map(move |failure| match &failure.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect()
}

/// not_found_fallback
///
/// Router fallback for paths no route matches.
pub async fn not_found_fallback(OriginalUri(uri): OriginalUri) -> ApiError {
    tracing::warn!("Invalid url access attempt: {}", uri);
    ApiError::not_found("Requested url is not found on this resource")
}

/// method_not_allowed_fallback
///
/// Router fallback for known paths hit with an unsupported HTTP method.
pub async fn method_not_allowed_fallback(OriginalUri(uri): OriginalUri) -> ApiError {
    tracing::warn!("Unsupported method request for url: {}", uri);
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Unsupported method")
}

/// panic_response
///
/// Used by `CatchPanicLayer`: a panicking handler still answers with the envelope.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Something bad happened: {}", detail);
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Something bad happened").into_response()
}
